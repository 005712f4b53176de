//! Core data structures for parsed files and dependency graphs

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Languages the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    // ── Grammar-backed ──────────────────────────────────────
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Java,
    C,
    Cpp,

    // ── Pattern-backed ──────────────────────────────────────
    CSharp,
    Php,
    Ruby,
    Kotlin,
    Swift,
    Scala,
    Lua,
}

impl Language {
    /// Detect language from file extension. Unregistered extensions yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        let language = match ext.as_str() {
            "py" | "pyi" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "php" => Language::Php,
            "rb" => Language::Ruby,
            "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            "scala" => Language::Scala,
            "lua" => Language::Lua,
            _ => return None,
        };
        Some(language)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Scala => "scala",
            Language::Lua => "lua",
        }
    }

    /// Extensions tried, in order, when an import names a file without one.
    pub fn resolution_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::JavaScript | Language::TypeScript => {
                &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"]
            }
            Language::Rust => &["rs"],
            Language::Go => &["go"],
            Language::Java => &["java"],
            Language::C | Language::Cpp => &["h", "hpp", "hh", "hxx", "c", "cpp", "cc", "cxx"],
            Language::CSharp => &["cs"],
            Language::Php => &["php"],
            Language::Ruby => &["rb"],
            Language::Kotlin => &["kt", "kts"],
            Language::Swift => &["swift"],
            Language::Scala => &["scala"],
            Language::Lua => &["lua"],
        }
    }

    /// Directory-index file names that make a directory importable.
    pub fn index_files(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["__init__.py"],
            Language::JavaScript | Language::TypeScript => {
                &["index.ts", "index.tsx", "index.js", "index.jsx", "index.mjs"]
            }
            Language::Rust => &["mod.rs"],
            Language::Php => &["index.php"],
            Language::Lua => &["init.lua"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized structural summary of one source file.
///
/// Created once per scan and never patched: a re-scan replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    /// Root-relative path with `/` separators.
    pub path: String,
    pub language: Language,
    pub size: u64,
    pub lines: u32,
    pub functions: Vec<Function>,
    pub classes: Vec<ClassLike>,
    pub imports: Vec<RawImport>,
}

impl ParsedFile {
    /// Number of methods across all classes.
    pub fn method_count(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum()
    }

    /// Top-level functions followed by methods, in declaration order.
    pub fn all_functions(&self) -> impl Iterator<Item = &Function> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }
}

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub line_start: u32,
    pub line_end: u32,
    pub parameters: Vec<String>,
    pub decorators: Vec<String>,
    pub is_async: bool,
    /// Simple names of everything this body textually invokes.
    pub calls: BTreeSet<String>,
    /// Owning class, set for methods only.
    pub class_name: Option<String>,
    pub is_static: bool,
    pub is_class_method: bool,
}

impl Function {
    /// `Class.method` for methods, the bare name otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.class_name {
            Some(class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }
}

/// A class, struct, trait, interface or similar type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassLike {
    pub name: String,
    pub line_start: u32,
    pub line_end: u32,
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub methods: Vec<Function>,
}

/// An import, include, use or require statement exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawImport {
    pub module: String,
    /// Imported names, or the bound variable names of a `require`-style call.
    pub items: Vec<String>,
    pub alias: Option<String>,
    pub line: u32,
}

impl RawImport {
    pub fn new(module: impl Into<String>, line: u32) -> Self {
        RawImport {
            module: module.into(),
            items: Vec::new(),
            alias: None,
            line,
        }
    }

    pub fn with_items(mut self, items: Vec<String>) -> Self {
        self.items = items;
        self
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Call,
}

/// A directed edge between two nodes of the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    /// Module text of the originating import (file graph only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

impl ResolvedEdge {
    pub fn import(source: &str, target: &str, import: &RawImport) -> Self {
        ResolvedEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind: EdgeKind::Import,
            module: Some(import.module.clone()),
            items: import.items.clone(),
        }
    }

    pub fn call(source: &str, target: &str) -> Self {
        ResolvedEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind: EdgeKind::Call,
            module: None,
            items: Vec::new(),
        }
    }
}

/// Discriminates what a graph node projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Function,
    Method,
}

/// Degree-derived importance shared by every node type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub in_degree: u32,
    pub out_degree: u32,
    pub centrality: f64,
}

/// File-level graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    /// Root-relative path.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub language: Language,
    pub size: u64,
    pub lines: u32,
    pub functions_count: u32,
    pub classes_count: u32,
    #[serde(flatten)]
    pub metrics: NodeMetrics,
}

/// Function-level graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionNode {
    /// `relative-path::qualified-name`.
    pub id: String,
    /// Qualified name (`Class.method` for methods).
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub class: Option<String>,
    pub file: String,
    pub line_start: u32,
    pub line_end: u32,
    pub parameters: Vec<String>,
    pub is_async: bool,
    #[serde(flatten)]
    pub metrics: NodeMetrics,
}

/// File dependency graph, directly renderable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileGraph {
    pub nodes: Vec<FileNode>,
    pub edges: Vec<ResolvedEdge>,
}

/// Function call graph, directly renderable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionGraph {
    pub nodes: Vec<FunctionNode>,
    pub edges: Vec<ResolvedEdge>,
}

/// Both graphs of one scan, persisted together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectGraph {
    pub files: FileGraph,
    pub functions: FunctionGraph,
}

/// Resolved neighbours of one file in the file graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileDependencies {
    /// Files this file imports.
    pub imports: Vec<String>,
    /// Files that import this file.
    pub imported_by: Vec<String>,
}

/// A parsed file plus its resolved neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetail {
    #[serde(flatten)]
    pub file: ParsedFile,
    pub dependencies: FileDependencies,
}
