//! Go language extractor using tree-sitter

use super::syntax::{self, CallSite};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::{ClassLike, Function, RawImport};
use std::path::Path;
use tree_sitter::Node;

const CALL_SITES: &[CallSite] = &[("call_expression", "function")];

pub struct GoExtractor {
    parser_pool: ParserPool,
}

impl GoExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    fn visit_declarations(&self, root: Node, source: &str, out: &mut FileStructure) {
        // Methods may precede their receiver type in the file.
        let mut methods: Vec<Function> = Vec::new();

        for decl in syntax::named_children(root) {
            match decl.kind() {
                "function_declaration" => {
                    out.functions.push(self.extract_function(decl, source, None));
                }
                "method_declaration" => {
                    let receiver = decl
                        .child_by_field_name("receiver")
                        .and_then(|r| receiver_type(r, source));
                    match receiver {
                        Some(receiver) => {
                            methods.push(self.extract_function(decl, source, Some(receiver)));
                        }
                        None => out.functions.push(self.extract_function(decl, source, None)),
                    }
                }
                "type_declaration" => {
                    for spec in syntax::named_children(decl) {
                        if spec.kind() != "type_spec" {
                            continue;
                        }
                        if let Some(class) = self.extract_type(spec, source) {
                            out.classes.push(class);
                        }
                    }
                }
                _ => {}
            }
        }

        for method in methods {
            let owner = method.class_name.clone().unwrap_or_default();
            match out.classes.iter_mut().find(|c| c.name == owner) {
                Some(class) => class.methods.push(method),
                None => out.classes.push(ClassLike {
                    name: owner,
                    line_start: method.line_start,
                    line_end: method.line_end,
                    methods: vec![method],
                    ..Default::default()
                }),
            }
        }
    }

    fn extract_type(&self, spec: Node, source: &str) -> Option<ClassLike> {
        let name = syntax::field_text(spec, "name", source)?;
        let body = spec.child_by_field_name("type")?;
        if body.kind() != "struct_type" && body.kind() != "interface_type" {
            return None;
        }

        let mut bases = Vec::new();
        syntax::walk(body, |node| match node.kind() {
            // embedded struct field: a field declaration with a type but no name
            "field_declaration" if node.child_by_field_name("name").is_none() => {
                if let Some(ty) = node.child_by_field_name("type") {
                    bases.push(syntax::text(ty, source).trim_start_matches('*').to_string());
                }
            }
            "type_elem" => bases.push(syntax::text(node, source).to_string()),
            _ => {}
        });

        Some(ClassLike {
            name: name.to_string(),
            line_start: syntax::line_start(spec),
            line_end: syntax::line_end(spec),
            bases,
            ..Default::default()
        })
    }

    fn extract_function(&self, node: Node, source: &str, receiver: Option<&str>) -> Function {
        let calls = node
            .child_by_field_name("body")
            .map(|body| syntax::collect_calls(body, source, CALL_SITES))
            .unwrap_or_default();

        Function {
            name: syntax::field_text(node, "name", source).unwrap_or_default().to_string(),
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            parameters: self.extract_parameters(node, source),
            calls,
            class_name: receiver.map(str::to_string),
            ..Default::default()
        }
    }

    fn extract_parameters(&self, node: Node, source: &str) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut names = Vec::new();
        for param in syntax::named_children(params) {
            let mut cursor = param.walk();
            for name in param.children_by_field_name("name", &mut cursor) {
                names.push(syntax::text(name, source).to_string());
            }
        }
        names
    }

    fn extract_imports(&self, root: Node, source: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        syntax::walk(root, |node| {
            if node.kind() != "import_spec" {
                return;
            }
            let Some(path) = syntax::field_text(node, "path", source) else {
                return;
            };
            imports.push(
                RawImport::new(syntax::unquote(path), syntax::line_start(node))
                    .with_alias(syntax::field_text(node, "name", source).map(str::to_string)),
            );
        });
        imports
    }
}

/// Receiver type name of a method: `(s *Server)` gives `Server`.
fn receiver_type<'a>(receiver: Node, source: &'a str) -> Option<&'a str> {
    let param = syntax::named_children(receiver)
        .into_iter()
        .find(|p| p.kind() == "parameter_declaration")?;
    let mut ty = param.child_by_field_name("type")?;
    loop {
        match ty.kind() {
            "pointer_type" => ty = *syntax::named_children(ty).first()?,
            "generic_type" => ty = ty.child_by_field_name("type")?,
            _ => return Some(syntax::text(ty, source)),
        }
    }
}

impl LanguageExtractor for GoExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        let tree = self.parser_pool.parse(Grammar::Go, source)?;
        let root = tree.root_node();

        let mut out = FileStructure::default();
        self.visit_declarations(root, source, &mut out);
        out.imports = self.extract_imports(root, source);
        Ok(out)
    }
}
