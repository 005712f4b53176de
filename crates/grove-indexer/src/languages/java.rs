//! Java language extractor using tree-sitter

use super::syntax::{self, CallSite};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::{ClassLike, Function, RawImport};
use std::path::Path;
use tree_sitter::Node;

const CALL_SITES: &[CallSite] = &[
    ("method_invocation", "name"),
    ("object_creation_expression", "type"),
];

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

pub struct JavaExtractor {
    parser_pool: ParserPool,
}

impl JavaExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    fn extract_type(&self, node: Node, source: &str) -> Option<ClassLike> {
        let name = syntax::field_text(node, "name", source)?.to_string();

        let mut bases = Vec::new();
        for child in syntax::named_children(node) {
            match child.kind() {
                "superclass" => {
                    bases.extend(
                        syntax::named_children(child)
                            .into_iter()
                            .map(|t| syntax::text(t, source).to_string()),
                    );
                }
                "super_interfaces" | "extends_interfaces" => {
                    for list in syntax::named_children(child) {
                        bases.extend(
                            syntax::named_children(list)
                                .into_iter()
                                .map(|t| syntax::text(t, source).to_string()),
                        );
                    }
                }
                _ => {}
            }
        }

        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut members = syntax::named_children(body);
            // enum constants and methods live one level deeper
            if let Some(decls) = members.iter().find(|m| m.kind() == "enum_body_declarations") {
                members.extend(syntax::named_children(*decls));
            }
            for member in members {
                if matches!(member.kind(), "method_declaration" | "constructor_declaration") {
                    methods.push(self.extract_method(member, source, &name));
                }
            }
        }

        Some(ClassLike {
            name,
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            bases,
            decorators: self.annotations(node, source),
            methods,
        })
    }

    fn extract_method(&self, node: Node, source: &str, class_name: &str) -> Function {
        let calls = node
            .child_by_field_name("body")
            .map(|body| syntax::collect_calls(body, source, CALL_SITES))
            .unwrap_or_default();

        Function {
            name: syntax::field_text(node, "name", source).unwrap_or_default().to_string(),
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            parameters: self.extract_parameters(node, source),
            decorators: self.annotations(node, source),
            calls,
            class_name: Some(class_name.to_string()),
            is_static: self.has_modifier(node, "static"),
            ..Default::default()
        }
    }

    fn extract_parameters(&self, node: Node, source: &str) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        syntax::named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "formal_parameter" => syntax::field_text(param, "name", source).map(str::to_string),
                "spread_parameter" => syntax::named_children(param)
                    .into_iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| syntax::field_text(d, "name", source))
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }

    fn modifiers<'tree>(&self, node: Node<'tree>) -> Option<Node<'tree>> {
        syntax::named_children(node)
            .into_iter()
            .find(|c| c.kind() == "modifiers")
    }

    fn has_modifier(&self, node: Node, modifier: &str) -> bool {
        self.modifiers(node)
            .is_some_and(|m| syntax::has_child_kind(m, modifier))
    }

    fn annotations(&self, node: Node, source: &str) -> Vec<String> {
        let Some(modifiers) = self.modifiers(node) else {
            return Vec::new();
        };
        syntax::named_children(modifiers)
            .into_iter()
            .filter(|m| matches!(m.kind(), "marker_annotation" | "annotation"))
            .filter_map(|m| syntax::field_text(m, "name", source).map(str::to_string))
            .collect()
    }

    fn extract_import(&self, node: Node, source: &str) -> Option<RawImport> {
        let path = syntax::named_children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))?;
        let items = if syntax::has_child_kind(node, "asterisk") {
            vec!["*".to_string()]
        } else {
            Vec::new()
        };
        Some(RawImport::new(syntax::text(path, source), syntax::line_start(node)).with_items(items))
    }
}

impl LanguageExtractor for JavaExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        let tree = self.parser_pool.parse(Grammar::Java, source)?;
        let root = tree.root_node();

        let mut out = FileStructure::default();
        for node in syntax::named_children(root) {
            match node.kind() {
                "import_declaration" => {
                    if let Some(import) = self.extract_import(node, source) {
                        out.imports.push(import);
                    }
                }
                kind if TYPE_DECLARATIONS.contains(&kind) => {
                    if let Some(class) = self.extract_type(node, source) {
                        out.classes.push(class);
                    }
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_structure() {
        let source = r#"
package com.example.app;

import java.util.List;
import com.example.app.model.User;
import com.example.app.util.*;

@Service
public class UserService extends BaseService implements Loader, Saver {
    public UserService(Repository repo) {
        super(repo);
    }

    @Override
    public List<User> load(String id, int... flags) {
        User user = new User(id);
        return repo.findAll(user);
    }

    public static UserService create() {
        return new UserService(null);
    }
}
"#;
        let out = JavaExtractor::new(ParserPool::new())
            .extract(Path::new("UserService.java"), source)
            .unwrap();

        assert!(out.functions.is_empty());
        let service = &out.classes[0];
        assert_eq!(service.name, "UserService");
        assert_eq!(service.bases, vec!["BaseService", "Loader", "Saver"]);
        assert_eq!(service.decorators, vec!["Service"]);

        let names: Vec<&str> = service.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["UserService", "load", "create"]);
        let load = &service.methods[1];
        assert_eq!(load.parameters, vec!["id", "flags"]);
        assert_eq!(load.decorators, vec!["Override"]);
        assert!(load.calls.contains("findAll"));
        assert!(load.calls.contains("User"));
        assert!(service.methods[2].is_static);

        let modules: Vec<&str> = out.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["java.util.List", "com.example.app.model.User", "com.example.app.util"]
        );
        assert_eq!(out.imports[2].items, vec!["*"]);
    }
}
