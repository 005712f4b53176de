//! C and C++ extractor using tree-sitter

use super::syntax::{self, CallSite};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::{ClassLike, Function, RawImport};
use std::path::Path;
use tree_sitter::Node;

const CALL_SITES: &[CallSite] = &[("call_expression", "function")];

/// Containers whose items still count as file scope.
const TRANSPARENT: &[&str] = &[
    "preproc_ifdef",
    "preproc_if",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
    "namespace_definition",
    "linkage_specification",
    "declaration_list",
    "template_declaration",
];

const RECORD_KINDS: &[&str] = &["struct_specifier", "class_specifier", "union_specifier"];

pub struct CExtractor {
    parser_pool: ParserPool,
    grammar: Grammar,
}

impl CExtractor {
    pub fn new(parser_pool: ParserPool, grammar: Grammar) -> Self {
        Self {
            parser_pool,
            grammar,
        }
    }

    fn visit_scope(&self, node: Node, source: &str, out: &mut FileStructure) {
        for child in syntax::named_children(node) {
            match child.kind() {
                "function_definition" => self.add_function(child, source, out),
                kind if RECORD_KINDS.contains(&kind) => {
                    if let Some(class) = self.extract_record(child, source) {
                        out.classes.push(class);
                    }
                }
                "type_definition" | "declaration" => {
                    if let Some(class) = child
                        .child_by_field_name("type")
                        .filter(|t| RECORD_KINDS.contains(&t.kind()))
                        .and_then(|t| self.extract_record(t, source))
                    {
                        out.classes.push(class);
                    }
                }
                "linkage_specification" => {
                    if let Some(body) = child.child_by_field_name("body") {
                        if body.kind() == "function_definition" {
                            self.add_function(body, source, out);
                        } else {
                            self.visit_scope(body, source, out);
                        }
                    }
                }
                kind if TRANSPARENT.contains(&kind) => self.visit_scope(child, source, out),
                _ => {}
            }
        }
    }

    /// Free function, or an out-of-line `Class::method` definition.
    fn add_function(&self, node: Node, source: &str, out: &mut FileStructure) {
        let Some(declarator) = function_declarator(node) else {
            return;
        };
        let Some(name_node) = declarator.child_by_field_name("declarator") else {
            return;
        };

        if name_node.kind() == "qualified_identifier" {
            let owner = name_node
                .child_by_field_name("scope")
                .map(|s| syntax::text(s, source))
                .unwrap_or_default();
            let name = name_node
                .child_by_field_name("name")
                .map(|n| syntax::text(n, source))
                .unwrap_or_default();
            let method = self.extract_function(node, declarator, name, source, Some(owner));
            match out.classes.iter_mut().find(|c| c.name == owner) {
                Some(class) => class.methods.push(method),
                None => out.classes.push(ClassLike {
                    name: owner.to_string(),
                    line_start: method.line_start,
                    line_end: method.line_end,
                    methods: vec![method],
                    ..Default::default()
                }),
            }
            return;
        }

        let name = syntax::text(name_node, source);
        out.functions
            .push(self.extract_function(node, declarator, name, source, None));
    }

    fn extract_record(&self, node: Node, source: &str) -> Option<ClassLike> {
        let name = syntax::field_text(node, "name", source)?.to_string();
        // forward declarations have no body
        let body = node.child_by_field_name("body")?;

        let bases = syntax::named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "base_class_clause")
            .flat_map(syntax::named_children)
            .filter(|b| b.kind() != "access_specifier")
            .map(|b| syntax::text(b, source).to_string())
            .collect();

        let methods = syntax::named_children(body)
            .into_iter()
            .filter(|m| m.kind() == "function_definition")
            .filter_map(|m| {
                let declarator = function_declarator(m)?;
                let method_name = declarator.child_by_field_name("declarator")?;
                let mut method = self.extract_function(
                    m,
                    declarator,
                    syntax::text(method_name, source),
                    source,
                    Some(&name),
                );
                method.is_static = syntax::named_children(m).iter().any(|c| {
                    c.kind() == "storage_class_specifier" && syntax::text(*c, source) == "static"
                });
                Some(method)
            })
            .collect();

        Some(ClassLike {
            name,
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            bases,
            decorators: Vec::new(),
            methods,
        })
    }

    fn extract_function(
        &self,
        node: Node,
        declarator: Node,
        name: &str,
        source: &str,
        class_name: Option<&str>,
    ) -> Function {
        let calls = node
            .child_by_field_name("body")
            .map(|body| syntax::collect_calls(body, source, CALL_SITES))
            .unwrap_or_default();

        let parameters = declarator
            .child_by_field_name("parameters")
            .map(|params| {
                syntax::named_children(params)
                    .into_iter()
                    .filter_map(|p| p.child_by_field_name("declarator"))
                    .filter_map(|d| declared_name(d, source))
                    .collect()
            })
            .unwrap_or_default();

        Function {
            name: name.to_string(),
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            parameters,
            calls,
            class_name: class_name.map(str::to_string),
            ..Default::default()
        }
    }

    fn extract_includes(&self, root: Node, source: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        syntax::walk(root, |node| {
            if node.kind() != "preproc_include" {
                return;
            }
            let Some(path) = node.child_by_field_name("path") else {
                return;
            };
            let module = match path.kind() {
                "system_lib_string" => syntax::text(path, source),
                _ => syntax::unquote(syntax::text(path, source)),
            };
            imports.push(RawImport::new(module, syntax::line_start(node)));
        });
        imports
    }
}

/// The `function_declarator` under a definition, through pointer and
/// reference wrappers.
fn function_declarator(definition: Node) -> Option<Node> {
    let mut current = definition.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "function_declarator" {
            return Some(current);
        }
        current = current
            .child_by_field_name("declarator")
            .or_else(|| syntax::named_children(current).into_iter().last())?;
    }
}

/// Innermost identifier of a (possibly pointer/array/reference) declarator.
fn declared_name(declarator: Node, source: &str) -> Option<String> {
    let mut current = declarator;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" => return Some(syntax::text(current, source).to_string()),
            _ => {
                current = current
                    .child_by_field_name("declarator")
                    .or_else(|| {
                        syntax::named_children(current)
                            .into_iter()
                            .find(|c| c.kind().ends_with("declarator") || c.kind() == "identifier")
                    })?;
            }
        }
    }
}

impl LanguageExtractor for CExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        let tree = self.parser_pool.parse(self.grammar, source)?;
        let root = tree.root_node();

        let mut out = FileStructure::default();
        self.visit_scope(root, source, &mut out);
        out.imports = self.extract_includes(root, source);
        Ok(out)
    }
}
