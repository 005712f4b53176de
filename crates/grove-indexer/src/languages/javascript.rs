//! JavaScript and TypeScript extractor using tree-sitter
//!
//! Both languages share one walk; TypeScript adds abstract classes, interfaces
//! and typed parameters on top of the JavaScript node kinds.

use super::syntax::{self, CallSite};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::{ClassLike, Function, Language, RawImport};
use std::path::Path;
use tree_sitter::Node;

const CALL_SITES: &[CallSite] = &[("call_expression", "function"), ("new_expression", "constructor")];

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

pub struct JavaScriptExtractor {
    parser_pool: ParserPool,
    language: Language,
}

impl JavaScriptExtractor {
    pub fn new(parser_pool: ParserPool, language: Language) -> Self {
        Self {
            parser_pool,
            language,
        }
    }

    fn grammar_for(&self, path: &Path) -> Grammar {
        match self.language {
            Language::TypeScript => {
                let is_tsx = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("tsx"));
                if is_tsx { Grammar::Tsx } else { Grammar::TypeScript }
            }
            _ => Grammar::JavaScript,
        }
    }

    fn visit_top_level(&self, node: Node, source: &str, out: &mut FileStructure) {
        for child in syntax::named_children(node) {
            self.visit_declaration(child, source, out);
        }
    }

    fn visit_declaration(&self, node: Node, source: &str, out: &mut FileStructure) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = syntax::field_text(node, "name", source) {
                    out.functions.push(self.extract_function(name, node, source, None));
                }
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                if let Some(class) = self.extract_class(node, source, None) {
                    out.classes.push(class);
                }
            }
            "interface_declaration" => {
                if let Some(name) = syntax::field_text(node, "name", source) {
                    out.classes.push(ClassLike {
                        name: name.to_string(),
                        line_start: syntax::line_start(node),
                        line_end: syntax::line_end(node),
                        bases: self.extract_bases(node, source),
                        ..Default::default()
                    });
                }
            }
            "lexical_declaration" | "variable_declaration" => {
                for declarator in syntax::named_children(node) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let (Some(name), Some(value)) = (
                        declarator.child_by_field_name("name"),
                        declarator.child_by_field_name("value"),
                    ) else {
                        continue;
                    };
                    if name.kind() != "identifier" {
                        continue;
                    }
                    let name = syntax::text(name, source);
                    if FUNCTION_VALUES.contains(&value.kind()) {
                        out.functions.push(self.extract_function(name, value, source, None));
                    } else if value.kind() == "class" {
                        if let Some(class) = self.extract_class(value, source, Some(name)) {
                            out.classes.push(class);
                        }
                    }
                }
            }
            "export_statement" => {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    self.visit_declaration(declaration, source, out);
                }
            }
            _ => {}
        }
    }

    fn extract_class(&self, node: Node, source: &str, binding: Option<&str>) -> Option<ClassLike> {
        let name = syntax::field_text(node, "name", source)
            .or(binding)?
            .to_string();
        let mut methods = Vec::new();

        if let Some(body) = node.child_by_field_name("body") {
            for member in syntax::named_children(body) {
                match member.kind() {
                    "method_definition" => {
                        let Some(method_name) = syntax::field_text(member, "name", source) else {
                            continue;
                        };
                        let mut method =
                            self.extract_function(method_name, member, source, Some(&name));
                        method.is_static = syntax::has_child_kind(member, "static");
                        methods.push(method);
                    }
                    "field_definition" | "public_field_definition" => {
                        let Some(value) = member
                            .child_by_field_name("value")
                            .filter(|v| FUNCTION_VALUES.contains(&v.kind()))
                        else {
                            continue;
                        };
                        let Some(field_name) = member
                            .child_by_field_name("property")
                            .or_else(|| member.child_by_field_name("name"))
                        else {
                            continue;
                        };
                        let mut method = self.extract_function(
                            syntax::text(field_name, source),
                            value,
                            source,
                            Some(&name),
                        );
                        method.line_start = syntax::line_start(member);
                        method.is_static = syntax::has_child_kind(member, "static");
                        methods.push(method);
                    }
                    _ => {}
                }
            }
        }

        Some(ClassLike {
            name,
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            bases: self.extract_bases(node, source),
            decorators: self.extract_decorators(node, source),
            methods,
        })
    }

    fn extract_bases(&self, node: Node, source: &str) -> Vec<String> {
        let mut bases = Vec::new();
        for child in syntax::named_children(node) {
            match child.kind() {
                "class_heritage" => {
                    for clause in syntax::named_children(child) {
                        match clause.kind() {
                            "extends_clause" | "implements_clause" => {
                                for base in syntax::named_children(clause) {
                                    if base.kind() != "type_arguments" {
                                        bases.push(syntax::text(base, source).to_string());
                                    }
                                }
                            }
                            _ => bases.push(syntax::text(clause, source).to_string()),
                        }
                    }
                }
                "extends_type_clause" => {
                    for base in syntax::named_children(child) {
                        bases.push(syntax::text(base, source).to_string());
                    }
                }
                _ => {}
            }
        }
        bases
    }

    fn extract_decorators(&self, node: Node, source: &str) -> Vec<String> {
        syntax::named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| {
                let expr = *syntax::named_children(decorator).first()?;
                let target = if expr.kind() == "call_expression" {
                    expr.child_by_field_name("function")?
                } else {
                    expr
                };
                Some(syntax::text(target, source).to_string())
            })
            .collect()
    }

    fn extract_function(
        &self,
        name: &str,
        node: Node,
        source: &str,
        class_name: Option<&str>,
    ) -> Function {
        let calls = node
            .child_by_field_name("body")
            .map(|body| syntax::collect_calls(body, source, CALL_SITES))
            .unwrap_or_default();

        Function {
            name: name.to_string(),
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            parameters: self.extract_parameters(node, source),
            decorators: self.extract_decorators(node, source),
            is_async: syntax::has_child_kind(node, "async"),
            calls,
            class_name: class_name.map(str::to_string),
            ..Default::default()
        }
    }

    fn extract_parameters(&self, node: Node, source: &str) -> Vec<String> {
        if let Some(single) = node.child_by_field_name("parameter") {
            return vec![syntax::text(single, source).to_string()];
        }
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        syntax::named_children(params)
            .into_iter()
            .filter_map(|param| {
                let pattern = match param.kind() {
                    "required_parameter" | "optional_parameter" => {
                        param.child_by_field_name("pattern")?
                    }
                    "assignment_pattern" => param.child_by_field_name("left")?,
                    "comment" => return None,
                    _ => param,
                };
                Some(syntax::text(pattern, source).to_string())
            })
            .collect()
    }

    fn extract_imports(&self, root: Node, source: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        syntax::walk(root, |node| match node.kind() {
            "import_statement" => {
                if let Some(import) = self.static_import(node, source) {
                    imports.push(import);
                }
            }
            "export_statement" => {
                let Some(module) = syntax::field_text(node, "source", source) else {
                    return;
                };
                let mut items = Vec::new();
                for child in syntax::named_children(node) {
                    if child.kind() == "export_clause" {
                        for spec in syntax::named_children(child) {
                            if let Some(name) = syntax::field_text(spec, "name", source) {
                                items.push(name.to_string());
                            }
                        }
                    }
                }
                if items.is_empty() {
                    items.push("*".to_string());
                }
                imports.push(
                    RawImport::new(syntax::unquote(module), syntax::line_start(node))
                        .with_items(items),
                );
            }
            "call_expression" => {
                if let Some(import) = self.call_import(node, source) {
                    imports.push(import);
                }
            }
            _ => {}
        });
        imports
    }

    /// `import ... from 'm'`, `import 'm'` and TypeScript `import x = require('m')`.
    fn static_import(&self, node: Node, source: &str) -> Option<RawImport> {
        let line = syntax::line_start(node);
        let mut items = Vec::new();
        let mut alias = None;

        let module = match syntax::field_text(node, "source", source) {
            Some(module) => module,
            None => {
                let clause = syntax::named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "import_require_clause")?;
                if let Some(name) = syntax::named_children(clause)
                    .into_iter()
                    .find(|c| c.kind() == "identifier")
                {
                    items.push(syntax::text(name, source).to_string());
                }
                syntax::field_text(clause, "source", source)?
            }
        };

        for clause in syntax::named_children(node) {
            if clause.kind() != "import_clause" {
                continue;
            }
            for part in syntax::named_children(clause) {
                match part.kind() {
                    "identifier" => items.push(syntax::text(part, source).to_string()),
                    "namespace_import" => {
                        items.push("*".to_string());
                        alias = syntax::named_children(part)
                            .first()
                            .map(|id| syntax::text(*id, source).to_string());
                    }
                    "named_imports" => {
                        for spec in syntax::named_children(part) {
                            if let Some(name) = syntax::field_text(spec, "name", source) {
                                items.push(name.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(
            RawImport::new(syntax::unquote(module), line)
                .with_items(items)
                .with_alias(alias),
        )
    }

    /// `require('m')` with its bound names, and dynamic `import('m')`.
    fn call_import(&self, node: Node, source: &str) -> Option<RawImport> {
        let callee = node.child_by_field_name("function")?;
        let is_require = callee.kind() == "identifier" && syntax::text(callee, source) == "require";
        let is_dynamic = callee.kind() == "import";
        if !is_require && !is_dynamic {
            return None;
        }

        let arguments = node.child_by_field_name("arguments")?;
        let first = *syntax::named_children(arguments).first()?;
        if first.kind() != "string" {
            return None;
        }
        let module = syntax::unquote(syntax::text(first, source));

        let mut items = Vec::new();
        if is_require {
            if let Some(binding) = node
                .parent()
                .filter(|p| p.kind() == "variable_declarator")
                .and_then(|p| p.child_by_field_name("name"))
            {
                items = self.bound_names(binding, source);
            }
        }

        Some(RawImport::new(module, syntax::line_start(node)).with_items(items))
    }

    fn bound_names(&self, pattern: Node, source: &str) -> Vec<String> {
        match pattern.kind() {
            "identifier" => vec![syntax::text(pattern, source).to_string()],
            "object_pattern" => syntax::named_children(pattern)
                .into_iter()
                .filter_map(|prop| match prop.kind() {
                    "shorthand_property_identifier_pattern" => {
                        Some(syntax::text(prop, source).to_string())
                    }
                    "pair_pattern" => {
                        syntax::field_text(prop, "value", source).map(str::to_string)
                    }
                    _ => None,
                })
                .collect(),
            "array_pattern" => syntax::named_children(pattern)
                .into_iter()
                .filter(|el| el.kind() == "identifier")
                .map(|el| syntax::text(el, source).to_string())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl LanguageExtractor for JavaScriptExtractor {
    fn extract(&self, path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        let tree = self.parser_pool.parse(self.grammar_for(path), source)?;
        let root = tree.root_node();

        let mut out = FileStructure::default();
        self.visit_top_level(root, source, &mut out);
        out.imports = self.extract_imports(root, source);
        Ok(out)
    }
}
