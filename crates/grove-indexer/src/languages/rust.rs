//! Rust language extractor using tree-sitter

use super::syntax::{self, CallSite};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::{ClassLike, Function, RawImport};
use std::path::Path;
use tree_sitter::Node;

const CALL_SITES: &[CallSite] = &[("call_expression", "function")];

const TYPE_ITEMS: &[&str] = &["struct_item", "enum_item", "union_item", "trait_item"];

pub struct RustExtractor {
    parser_pool: ParserPool,
}

impl RustExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    fn visit_items(&self, root: Node, source: &str, out: &mut FileStructure) {
        for item in syntax::named_children(root) {
            match item.kind() {
                "function_item" => {
                    out.functions.push(self.extract_function(item, source, None));
                }
                kind if TYPE_ITEMS.contains(&kind) => {
                    let Some(name) = syntax::field_text(item, "name", source) else {
                        continue;
                    };
                    let mut class = ClassLike {
                        name: name.to_string(),
                        line_start: syntax::line_start(item),
                        line_end: syntax::line_end(item),
                        decorators: self.extract_attributes(item, source),
                        ..Default::default()
                    };
                    if kind == "trait_item" {
                        if let Some(bounds) = item.child_by_field_name("bounds") {
                            class.bases = syntax::named_children(bounds)
                                .into_iter()
                                .map(|b| syntax::text(b, source).to_string())
                                .collect();
                        }
                        class.methods = self.extract_body_functions(item, source, name);
                    }
                    merge_class(&mut out.classes, class);
                }
                "impl_item" => {
                    let Some(type_node) = item.child_by_field_name("type") else {
                        continue;
                    };
                    let name = type_name(type_node, source);
                    let methods = self.extract_body_functions(item, source, name);
                    let class = ClassLike {
                        name: name.to_string(),
                        line_start: syntax::line_start(item),
                        line_end: syntax::line_end(item),
                        bases: item
                            .child_by_field_name("trait")
                            .map(|t| vec![type_name(t, source).to_string()])
                            .unwrap_or_default(),
                        decorators: Vec::new(),
                        methods,
                    };
                    merge_class(&mut out.classes, class);
                }
                _ => {}
            }
        }
    }

    fn extract_body_functions(&self, item: Node, source: &str, class_name: &str) -> Vec<Function> {
        let Some(body) = item.child_by_field_name("body") else {
            return Vec::new();
        };
        syntax::named_children(body)
            .into_iter()
            .filter(|child| child.kind() == "function_item")
            .map(|child| {
                let mut method = self.extract_function(child, source, Some(class_name));
                method.is_static = !self.has_self_parameter(child);
                method
            })
            .collect()
    }

    fn extract_function(&self, node: Node, source: &str, class_name: Option<&str>) -> Function {
        let calls = node
            .child_by_field_name("body")
            .map(|body| syntax::collect_calls(body, source, CALL_SITES))
            .unwrap_or_default();
        let is_async = syntax::children(node)
            .into_iter()
            .any(|c| c.kind() == "function_modifiers" && syntax::has_child_kind(c, "async"));

        Function {
            name: syntax::field_text(node, "name", source).unwrap_or_default().to_string(),
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            parameters: self.extract_parameters(node, source),
            decorators: self.extract_attributes(node, source),
            is_async,
            calls,
            class_name: class_name.map(str::to_string),
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
                "self_parameter" => Some("self".to_string()),
                "parameter" => syntax::field_text(param, "pattern", source).map(str::to_string),
                _ => None,
            })
            .collect()
    }

    fn has_self_parameter(&self, node: Node) -> bool {
        node.child_by_field_name("parameters")
            .map(|params| {
                syntax::named_children(params)
                    .iter()
                    .any(|p| p.kind() == "self_parameter")
            })
            .unwrap_or(false)
    }

    /// Outer attributes written directly above an item, such as `#[test]`.
    fn extract_attributes(&self, node: Node, source: &str) -> Vec<String> {
        let mut attributes = Vec::new();
        let mut current = node.prev_named_sibling();
        while let Some(sibling) = current {
            match sibling.kind() {
                "attribute_item" => {
                    if let Some(attr) = syntax::named_children(sibling).first() {
                        attributes.push(syntax::text(*attr, source).to_string());
                    }
                }
                "line_comment" | "block_comment" => {}
                _ => break,
            }
            current = sibling.prev_named_sibling();
        }
        attributes.reverse();
        attributes
    }

    fn extract_imports(&self, root: Node, source: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        syntax::walk(root, |node| {
            let line = syntax::line_start(node);
            match node.kind() {
                "use_declaration" => {
                    if let Some(argument) = node.child_by_field_name("argument") {
                        imports.push(use_import(argument, source, line));
                    }
                }
                "mod_item" if node.child_by_field_name("body").is_none() => {
                    if let Some(name) = syntax::field_text(node, "name", source) {
                        imports.push(RawImport::new(format!("self::{}", name), line));
                    }
                }
                "extern_crate_declaration" => {
                    if let Some(name) = syntax::field_text(node, "name", source) {
                        imports.push(RawImport::new(name, line));
                    }
                }
                _ => {}
            }
        });
        imports
    }
}

/// Flatten one `use` argument into a module path plus imported names.
fn use_import(argument: Node, source: &str, line: u32) -> RawImport {
    match argument.kind() {
        "use_as_clause" => {
            let path = syntax::field_text(argument, "path", source).unwrap_or_default();
            RawImport::new(path, line)
                .with_alias(syntax::field_text(argument, "alias", source).map(str::to_string))
        }
        "scoped_use_list" => {
            let path = syntax::field_text(argument, "path", source).unwrap_or_default();
            let items = argument
                .child_by_field_name("list")
                .map(|list| {
                    syntax::named_children(list)
                        .into_iter()
                        .map(|item| match item.kind() {
                            "use_as_clause" => syntax::field_text(item, "path", source)
                                .unwrap_or_default()
                                .to_string(),
                            _ => syntax::text(item, source).to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            RawImport::new(path, line).with_items(items)
        }
        "use_wildcard" => {
            let text = syntax::text(argument, source);
            let path = text.trim_end_matches('*').trim_end_matches("::");
            RawImport::new(path, line).with_items(vec!["*".to_string()])
        }
        _ => RawImport::new(syntax::text(argument, source), line),
    }
}

/// Base type name without generics or references: `Graph<T>` becomes `Graph`.
fn type_name<'a>(node: Node, source: &'a str) -> &'a str {
    match node.kind() {
        "generic_type" => node
            .child_by_field_name("type")
            .map(|inner| type_name(inner, source))
            .unwrap_or_else(|| syntax::text(node, source)),
        "scoped_type_identifier" => syntax::field_text(node, "name", source)
            .unwrap_or_else(|| syntax::text(node, source)),
        "reference_type" => node
            .child_by_field_name("type")
            .map(|inner| type_name(inner, source))
            .unwrap_or_else(|| syntax::text(node, source)),
        _ => syntax::text(node, source),
    }
}

/// Fold an `impl` block into an existing declaration of the same type.
fn merge_class(classes: &mut Vec<ClassLike>, class: ClassLike) {
    match classes.iter_mut().find(|c| c.name == class.name) {
        Some(existing) => {
            existing.line_start = existing.line_start.min(class.line_start);
            existing.line_end = existing.line_end.max(class.line_end);
            for base in class.bases {
                if !existing.bases.contains(&base) {
                    existing.bases.push(base);
                }
            }
            existing.methods.extend(class.methods);
            if existing.decorators.is_empty() {
                existing.decorators = class.decorators;
            }
        }
        None => classes.push(class),
    }
}

impl LanguageExtractor for RustExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        let tree = self.parser_pool.parse(Grammar::Rust, source)?;
        let root = tree.root_node();

        let mut out = FileStructure::default();
        self.visit_items(root, source, &mut out);
        out.imports = self.extract_imports(root, source);
        Ok(out)
    }
}
