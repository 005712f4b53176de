//! Python language extractor using tree-sitter

use super::syntax::{self, CallSite};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use crate::parser_pool::{Grammar, ParserPool};
use grove_core::{ClassLike, Function, RawImport};
use std::path::Path;
use tree_sitter::Node;

const CALL_SITES: &[CallSite] = &[("call", "function")];

/// Statements whose nested blocks still belong to module scope.
const COMPOUND_STATEMENTS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "finally_clause",
    "with_statement",
    "block",
];

pub struct PythonExtractor {
    parser_pool: ParserPool,
}

impl PythonExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    fn visit_module_level(&self, node: Node, source: &str, out: &mut FileStructure) {
        for child in syntax::named_children(node) {
            match child.kind() {
                "function_definition" => {
                    out.functions.push(self.extract_function(child, source, Vec::new(), None));
                }
                "class_definition" => {
                    out.classes.push(self.extract_class(child, source, Vec::new()));
                }
                "decorated_definition" => {
                    let decorators = self.extract_decorators(child, source);
                    let Some(definition) = child.child_by_field_name("definition") else {
                        continue;
                    };
                    match definition.kind() {
                        "function_definition" => out
                            .functions
                            .push(self.extract_function(definition, source, decorators, None)),
                        "class_definition" => {
                            out.classes.push(self.extract_class(definition, source, decorators))
                        }
                        _ => {}
                    }
                }
                kind if COMPOUND_STATEMENTS.contains(&kind) => {
                    self.visit_module_level(child, source, out);
                }
                _ => {}
            }
        }
    }

    fn extract_class(&self, node: Node, source: &str, decorators: Vec<String>) -> ClassLike {
        let name = syntax::field_text(node, "name", source).unwrap_or_default().to_string();

        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| {
                syntax::named_children(args)
                    .into_iter()
                    .filter(|arg| arg.kind() != "keyword_argument" && arg.kind() != "comment")
                    .map(|arg| syntax::text(arg, source).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let mut methods = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for child in syntax::named_children(body) {
                match child.kind() {
                    "function_definition" => methods.push(self.extract_function(
                        child,
                        source,
                        Vec::new(),
                        Some(&name),
                    )),
                    "decorated_definition" => {
                        let decorators = self.extract_decorators(child, source);
                        if let Some(definition) = child
                            .child_by_field_name("definition")
                            .filter(|d| d.kind() == "function_definition")
                        {
                            methods.push(self.extract_function(
                                definition,
                                source,
                                decorators,
                                Some(&name),
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }

        ClassLike {
            name,
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            bases,
            decorators,
            methods,
        }
    }

    fn extract_function(
        &self,
        node: Node,
        source: &str,
        decorators: Vec<String>,
        class_name: Option<&str>,
    ) -> Function {
        let calls = node
            .child_by_field_name("body")
            .map(|body| syntax::collect_calls(body, source, CALL_SITES))
            .unwrap_or_default();

        Function {
            name: syntax::field_text(node, "name", source).unwrap_or_default().to_string(),
            line_start: syntax::line_start(node),
            line_end: syntax::line_end(node),
            parameters: self.extract_parameters(node, source),
            is_async: syntax::has_child_kind(node, "async"),
            calls,
            class_name: class_name.map(str::to_string),
            is_static: decorators.iter().any(|d| d == "staticmethod"),
            is_class_method: decorators.iter().any(|d| d == "classmethod"),
            decorators,
        }
    }

    fn extract_parameters(&self, node: Node, source: &str) -> Vec<String> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        syntax::named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => {
                    Some(syntax::text(param, source).to_string())
                }
                "default_parameter" | "typed_default_parameter" => {
                    syntax::field_text(param, "name", source).map(str::to_string)
                }
                "typed_parameter" => syntax::named_children(param)
                    .first()
                    .map(|inner| syntax::text(*inner, source).to_string()),
                _ => None,
            })
            .collect()
    }

    fn extract_decorators(&self, node: Node, source: &str) -> Vec<String> {
        syntax::named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .filter_map(|decorator| {
                let expr = *syntax::named_children(decorator).first()?;
                let target = if expr.kind() == "call" {
                    expr.child_by_field_name("function")?
                } else {
                    expr
                };
                Some(syntax::text(target, source).to_string())
            })
            .collect()
    }

    fn extract_imports(&self, root: Node, source: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        syntax::walk(root, |node| match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let import = if name.kind() == "aliased_import" {
                        RawImport::new(
                            syntax::field_text(name, "name", source).unwrap_or_default(),
                            syntax::line_start(node),
                        )
                        .with_alias(syntax::field_text(name, "alias", source).map(str::to_string))
                    } else {
                        RawImport::new(syntax::text(name, source), syntax::line_start(node))
                    };
                    imports.push(import);
                }
            }
            "import_from_statement" => {
                let module = syntax::field_text(node, "module_name", source).unwrap_or_default();
                let mut items = Vec::new();
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    let item = if name.kind() == "aliased_import" {
                        syntax::field_text(name, "name", source).unwrap_or_default()
                    } else {
                        syntax::text(name, source)
                    };
                    items.push(item.to_string());
                }
                if syntax::has_child_kind(node, "wildcard_import") {
                    items.push("*".to_string());
                }
                imports.push(RawImport::new(module, syntax::line_start(node)).with_items(items));
            }
            _ => {}
        });
        imports
    }
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        let tree = self.parser_pool.parse(Grammar::Python, source)?;
        let root = tree.root_node();

        let mut out = FileStructure::default();
        self.visit_module_level(root, source, &mut out);
        out.imports = self.extract_imports(root, source);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> FileStructure {
        PythonExtractor::new(ParserPool::new())
            .extract(Path::new("mod.py"), source)
            .unwrap()
    }

    #[test]
    fn test_functions_and_methods() {
        let source = r#"
import os
from .util import f, g as h

@app.route("/")
async def handler(request, *args, limit: int = 5, **kwargs):
    data = f(request)
    return os.path.join(data)

class Service(Base, metaclass=Meta):
    @staticmethod
    def make():
        return Service()

    @classmethod
    def build(cls):
        return cls.make()

    def run(self, x):
        self.helper(x)
"#;
        let out = extract(source);

        assert_eq!(out.functions.len(), 1);
        let handler = &out.functions[0];
        assert_eq!(handler.name, "handler");
        assert!(handler.is_async);
        assert_eq!(handler.decorators, vec!["app.route"]);
        assert_eq!(handler.parameters, vec!["request", "*args", "limit", "**kwargs"]);
        assert!(handler.calls.contains("f"));
        assert!(handler.calls.contains("join"));

        assert_eq!(out.classes.len(), 1);
        let class = &out.classes[0];
        assert_eq!(class.name, "Service");
        assert_eq!(class.bases, vec!["Base"]);
        let names: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["make", "build", "run"]);
        assert!(class.methods[0].is_static);
        assert!(class.methods[1].is_class_method);
        assert_eq!(class.methods[2].class_name.as_deref(), Some("Service"));
        assert!(class.methods[2].calls.contains("helper"));

        assert_eq!(out.imports.len(), 2);
        assert_eq!(out.imports[0].module, "os");
        assert_eq!(out.imports[1].module, ".util");
        assert_eq!(out.imports[1].items, vec!["f", "g"]);
    }

    #[test]
    fn test_nested_functions_are_not_top_level() {
        let out = extract("def outer():\n    def inner():\n        pass\n    inner()\n");
        assert_eq!(out.functions.len(), 1);
        assert!(out.functions[0].calls.contains("inner"));
    }

    #[test]
    fn test_conditional_definitions_and_aliases() {
        let source = "try:\n    import numpy as np\nexcept ImportError:\n    np = None\n\nif True:\n    def fallback():\n        pass\n";
        let out = extract(source);
        assert_eq!(out.functions[0].name, "fallback");
        assert_eq!(out.imports[0].module, "numpy");
        assert_eq!(out.imports[0].alias.as_deref(), Some("np"));
    }

    #[test]
    fn test_function_spans_are_one_based() {
        let out = extract("def a():\n    pass\n\ndef b():\n    pass\n");
        assert_eq!((out.functions[0].line_start, out.functions[0].line_end), (1, 2));
        assert_eq!((out.functions[1].line_start, out.functions[1].line_end), (4, 5));
    }
}
