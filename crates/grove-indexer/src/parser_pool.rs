//! Thread-safe pool of tree-sitter parsers
//!
//! Tree-sitter parsers are `Send` but not `Sync`, so worker threads check a
//! parser out of the pool, use it exclusively, and hand it back. A parser is
//! bound to one grammar for its whole life, so idle parsers are kept per
//! grammar.

use crate::extractor::Unparsable;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tree_sitter::{Language, Parser, Tree};

/// Upper bound on idle parsers kept for one grammar.
const MAX_IDLE_PER_GRAMMAR: usize = 32;

/// Grammars bundled with the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Rust,
    Go,
    Java,
    C,
    Cpp,
}

impl Grammar {
    /// Get the tree-sitter language for this grammar
    pub fn language(&self) -> Language {
        match self {
            Grammar::Python => tree_sitter_python::LANGUAGE.into(),
            Grammar::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Grammar::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Grammar::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Grammar::Rust => tree_sitter_rust::LANGUAGE.into(),
            Grammar::Go => tree_sitter_go::LANGUAGE.into(),
            Grammar::Java => tree_sitter_java::LANGUAGE.into(),
            Grammar::C => tree_sitter_c::LANGUAGE.into(),
            Grammar::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }
}

/// Shared pool of reusable parsers. Cloning shares the same pool.
#[derive(Clone, Default)]
pub struct ParserPool {
    idle: Arc<Mutex<HashMap<Grammar, Vec<Parser>>>>,
}

impl std::fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ParserPool")
            .field("idle", &idle.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl ParserPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` with `grammar`.
    ///
    /// A tree whose root contains an error or missing node is rejected as a
    /// syntax error so that half-understood files never reach the graph.
    pub fn parse(&self, grammar: Grammar, source: &str) -> Result<Tree, Unparsable> {
        let mut parser = self.checkout(grammar)?;
        let tree = parser.parse(source, None);
        self.checkin(grammar, parser);

        let tree = tree.ok_or_else(|| Unparsable::Parser("parser returned no tree".to_string()))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(Unparsable::Syntax {
                line: first_error_line(root),
            });
        }
        Ok(tree)
    }

    fn checkout(&self, grammar: Grammar) -> Result<Parser, Unparsable> {
        let reused = {
            let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
            idle.get_mut(&grammar).and_then(Vec::pop)
        };
        if let Some(parser) = reused {
            return Ok(parser);
        }

        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|e| Unparsable::Parser(format!("failed to set language: {}", e)))?;
        tracing::trace!("Created {:?} parser", grammar);
        Ok(parser)
    }

    fn checkin(&self, grammar: Grammar, mut parser: Parser) {
        parser.reset();
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = idle.entry(grammar).or_default();
        if slot.len() < MAX_IDLE_PER_GRAMMAR {
            slot.push(parser);
        }
    }
}

/// 1-based line of the first error or missing node under `node`.
fn first_error_line(node: tree_sitter::Node) -> u32 {
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.is_error() || current.is_missing() {
            return current.start_position().row as u32 + 1;
        }
        if !current.has_error() {
            continue;
        }
        let mut cursor = current.walk();
        let children: Vec<_> = current.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    node.start_position().row as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python() {
        let pool = ParserPool::new();
        let tree = pool.parse(Grammar::Python, "def main():\n    pass\n").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_typescript() {
        let pool = ParserPool::new();
        let content = r#"
class MyClass {
    method() {
        console.log("Hello");
    }
}
"#;
        let tree = pool.parse(Grammar::TypeScript, content).unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn test_syntax_error_is_reported_with_line() {
        let pool = ParserPool::new();
        let err = pool
            .parse(Grammar::Python, "x = 1\ndef broken(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(err, Unparsable::Syntax { .. }));
    }

    #[test]
    fn test_parsers_are_reused() {
        let pool = ParserPool::new();
        pool.parse(Grammar::Rust, "fn a() {}").unwrap();
        pool.parse(Grammar::Rust, "fn b() {}").unwrap();
        let idle = pool.idle.lock().unwrap();
        assert_eq!(idle.get(&Grammar::Rust).map(Vec::len), Some(1));
    }
}
