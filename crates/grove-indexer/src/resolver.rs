//! Maps raw import statements onto files of the scanned set
//!
//! Resolution is purely lexical: the resolver only knows the candidate file
//! list and the configured path aliases. An import resolves to at most one
//! file; anything it cannot place (standard library, third-party packages,
//! generated code) resolves to nothing.

use grove_core::{Language, ParsedFile, RawImport, ResolvedEdge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const PYTHON_STDLIB: &[&str] = &[
    "__future__", "abc", "argparse", "array", "ast", "asyncio", "base64", "bisect", "builtins",
    "calendar", "codecs", "collections", "concurrent", "configparser", "contextlib", "copy",
    "csv", "ctypes", "dataclasses", "datetime", "decimal", "difflib", "email", "enum",
    "fnmatch", "fractions", "functools", "getpass", "gettext", "glob", "gzip", "hashlib",
    "heapq", "hmac", "html", "http", "importlib", "inspect", "io", "itertools", "json",
    "locale", "logging", "math", "multiprocessing", "numbers", "operator", "os", "pathlib",
    "pickle", "pkgutil", "platform", "pprint", "queue", "random", "re", "secrets", "select",
    "selectors", "shlex", "shutil", "signal", "site", "socket", "sqlite3", "ssl",
    "statistics", "string", "struct", "subprocess", "sys", "tarfile", "tempfile", "textwrap",
    "threading", "time", "timeit", "traceback", "types", "typing", "unittest", "urllib",
    "uuid", "warnings", "weakref", "xml", "zipfile", "zlib",
];

const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "events", "fs",
    "http", "http2", "https", "module", "net", "os", "path", "perf_hooks", "process",
    "querystring", "readline", "stream", "string_decoder", "timers", "tls", "tty", "url",
    "util", "v8", "vm", "worker_threads", "zlib",
];

const RUST_BUILTIN_CRATES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

const GO_STDLIB: &[&str] = &[
    "archive", "bufio", "bytes", "cmp", "compress", "container", "context", "crypto",
    "database", "debug", "embed", "encoding", "errors", "expvar", "flag", "fmt", "go", "hash",
    "html", "image", "index", "io", "iter", "log", "maps", "math", "mime", "net", "os", "path",
    "plugin", "reflect", "regexp", "runtime", "slices", "sort", "strconv", "strings", "sync",
    "syscall", "testing", "text", "time", "unicode", "unique", "unsafe",
];

const JVM_PLATFORM_PREFIXES: &[&str] = &[
    "java.", "javax.", "jakarta.", "kotlin.", "kotlinx.", "android.", "androidx.", "scala.",
    "sun.", "com.sun.", "dalvik.",
];

const DOTNET_ROOTS: &[&str] = &["System", "Microsoft"];

const SWIFT_PLATFORM: &[&str] = &[
    "AppKit", "Combine", "CoreData", "CoreGraphics", "Darwin", "Dispatch", "Foundation",
    "SwiftUI", "UIKit", "XCTest", "os",
];

/// Extensions whose compiled output is imported in place of the source.
const EMITTED_JS: &[&str] = &[".js", ".jsx", ".mjs", ".cjs"];

/// One `paths`-style alias: a pattern and the root-relative templates it maps to.
///
/// A `*` in the pattern captures any text, substituted for the `*` of each
/// target. Without a wildcard the pattern matches the module exactly or as a
/// leading path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathAlias {
    pub pattern: String,
    pub targets: Vec<String>,
}

impl PathAlias {
    pub fn new(pattern: impl Into<String>, targets: Vec<String>) -> Self {
        PathAlias {
            pattern: pattern.into(),
            targets,
        }
    }

    /// Candidate paths for `module`, or `None` when the alias does not apply.
    fn expand(&self, module: &str) -> Option<Vec<String>> {
        if let Some((prefix, suffix)) = self.pattern.split_once('*') {
            if module.len() < prefix.len() + suffix.len()
                || !module.starts_with(prefix)
                || !module.ends_with(suffix)
            {
                return None;
            }
            let captured = &module[prefix.len()..module.len() - suffix.len()];
            return Some(
                self.targets
                    .iter()
                    .map(|t| t.replacen('*', captured, 1))
                    .collect(),
            );
        }

        let pattern = self.pattern.trim_end_matches('/');
        if module == pattern {
            return Some(self.targets.clone());
        }
        let rest = module.strip_prefix(pattern)?.strip_prefix('/')?;
        Some(
            self.targets
                .iter()
                .map(|t| join(t.trim_end_matches('/'), rest))
                .collect(),
        )
    }

    /// Length of the literal part of the pattern; longer is more specific.
    fn specificity(&self) -> usize {
        self.pattern.split('*').next().map_or(0, str::len)
    }
}

/// Resolves imports against a fixed set of root-relative file paths.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    files: HashSet<String>,
    /// (language family, dotted module name) → file.
    modules: HashMap<(Language, String), String>,
    /// Every trailing segment run of every extension-less path → files.
    stem_index: HashMap<String, Vec<String>>,
    /// Every trailing segment run of every full path → files.
    path_index: HashMap<String, Vec<String>>,
    /// Directory → files directly inside it, sorted.
    dirs: BTreeMap<String, Vec<String>>,
    /// Every trailing segment run of every directory → directories.
    dir_index: HashMap<String, Vec<String>>,
    aliases: Vec<PathAlias>,
}

impl ImportResolver {
    pub fn new<I, S>(files: I, aliases: Vec<PathAlias>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = files.into_iter().map(Into::into).collect();
        sorted.sort();
        sorted.dedup();

        let mut modules = HashMap::new();
        let mut stem_index: HashMap<String, Vec<String>> = HashMap::new();
        let mut path_index: HashMap<String, Vec<String>> = HashMap::new();
        let mut dirs: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for path in &sorted {
            let (dir, name) = split_parent(path);
            dirs.entry(dir.to_string()).or_default().push(path.clone());

            let Some(language) = Language::from_path(std::path::Path::new(path)) else {
                continue;
            };
            let family = family(language);
            let stem = strip_extension(path);
            modules
                .entry((family, stem.replace('/', ".")))
                .or_insert_with(|| path.clone());
            if !dir.is_empty() && language.index_files().contains(&name) {
                modules
                    .entry((family, dir.replace('/', ".")))
                    .or_insert_with(|| path.clone());
            }

            for suffix in suffixes(stem) {
                stem_index.entry(suffix.to_string()).or_default().push(path.clone());
            }
            for suffix in suffixes(path) {
                path_index.entry(suffix.to_string()).or_default().push(path.clone());
            }
        }

        let mut dir_index: HashMap<String, Vec<String>> = HashMap::new();
        for dir in dirs.keys().filter(|d| !d.is_empty()) {
            for suffix in suffixes(dir) {
                dir_index.entry(suffix.to_string()).or_default().push(dir.clone());
            }
        }

        let mut aliases = aliases;
        aliases.sort_by_key(|a| std::cmp::Reverse(a.specificity()));

        ImportResolver {
            files: sorted.into_iter().collect(),
            modules,
            stem_index,
            path_index,
            dirs,
            dir_index,
            aliases,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Target file of one import written in `from`, if it names a scanned file.
    pub fn resolve(&self, import: &RawImport, from: &str, language: Language) -> Option<String> {
        let module = import.module.trim();
        if module.is_empty() || is_external(module, language) {
            return None;
        }

        if !module.starts_with('.') {
            if let Some(target) = self.resolve_alias(module, language) {
                return Some(target);
            }
        }

        if language == Language::Python && module.starts_with('.') {
            return self.resolve_python_relative(module, &import.items, from);
        }
        if module.starts_with("./") || module.starts_with("../") {
            let (dir, _) = split_parent(from);
            return self.try_path(&join(dir, module), language);
        }

        let target = match language {
            Language::Python => self.resolve_python(module, &import.items, from),
            Language::Rust => self.resolve_rust(module, &import.items, from),
            Language::Go => self.resolve_go(module),
            Language::Java
            | Language::Kotlin
            | Language::Scala
            | Language::CSharp
            | Language::Php => self.resolve_qualified(module, language),
            Language::C | Language::Cpp => self.resolve_include(module, from, language),
            Language::Ruby => self.try_path(&join("lib", module), language),
            Language::Lua => self.lookup_module(module, language),
            Language::Swift => self.resolve_directory(module, language),
            Language::JavaScript | Language::TypeScript => None,
        };

        target.or_else(|| self.try_path(module, language))
    }

    /// Resolve every import of every file into file edges, one per resolved
    /// import. Two imports of the same file yield two edges.
    pub fn resolve_all(&self, parsed: &[ParsedFile]) -> Vec<ResolvedEdge> {
        let mut edges = Vec::new();
        let mut unresolved = 0usize;

        for file in parsed {
            for import in &file.imports {
                match self.resolve(import, &file.path, file.language) {
                    Some(target) => edges.push(ResolvedEdge::import(&file.path, &target, import)),
                    None => {
                        unresolved += 1;
                        tracing::trace!("Unresolved import {} in {}", import.module, file.path);
                    }
                }
            }
        }

        tracing::debug!(
            "Resolved {} import edges ({} imports left unresolved)",
            edges.len(),
            unresolved
        );
        edges
    }

    fn resolve_alias(&self, module: &str, language: Language) -> Option<String> {
        self.aliases
            .iter()
            .filter_map(|alias| alias.expand(module))
            .flatten()
            .find_map(|candidate| self.try_path(&candidate, language))
    }

    /// `from .x import y`, `from .. import z`: each dot past the first climbs
    /// one package.
    fn resolve_python_relative(&self, module: &str, items: &[String], from: &str) -> Option<String> {
        let dots = module.chars().take_while(|c| *c == '.').count();
        let rest = &module[dots..];

        let (mut package, _) = split_parent(from);
        for _ in 1..dots {
            if package.is_empty() {
                return None;
            }
            package = split_parent(package).0;
        }

        if !rest.is_empty() {
            return self.try_path(&join(package, &rest.replace('.', "/")), Language::Python);
        }

        let init = join(package, "__init__.py");
        if self.files.contains(&init) {
            return Some(init);
        }
        items
            .iter()
            .filter(|item| item.as_str() != "*")
            .find_map(|item| self.try_path(&join(package, item), Language::Python))
    }

    fn resolve_python(&self, module: &str, items: &[String], from: &str) -> Option<String> {
        if let Some(target) = self.lookup_module(module, Language::Python) {
            return Some(target);
        }

        let (package, _) = split_parent(from);
        if let Some(target) = self.try_path(&join(package, &module.replace('.', "/")), Language::Python) {
            return Some(target);
        }

        items
            .iter()
            .filter(|item| item.as_str() != "*")
            .find_map(|item| self.lookup_module(&format!("{}.{}", module, item), Language::Python))
    }

    /// `crate::`, `self::` and `super::` paths. Trailing segments may name
    /// items rather than modules, so shorter prefixes are tried in turn.
    fn resolve_rust(&self, module: &str, items: &[String], from: &str) -> Option<String> {
        let segments: Vec<&str> = module.split("::").filter(|s| !s.is_empty()).collect();
        let (base, rest) = match segments.first() {
            Some(&"crate") => (self.rust_crate_root(from), &segments[1..]),
            Some(&"self") => (rust_module_dir(from), &segments[1..]),
            Some(&"super") => {
                let mut dir = rust_module_dir(from);
                let mut consumed = 0;
                while segments.get(consumed) == Some(&"super") {
                    dir = split_parent(&dir).0.to_string();
                    consumed += 1;
                }
                (dir, &segments[consumed..])
            }
            _ => return None,
        };

        for len in (1..=rest.len()).rev() {
            if let Some(target) = self.try_path(&join(&base, &rest[..len].join("/")), Language::Rust) {
                return Some(target);
            }
        }

        if rest.is_empty() {
            let found = items
                .iter()
                .filter_map(|item| item.split("::").next())
                .filter(|item| !matches!(*item, "*" | "self"))
                .find_map(|item| self.try_path(&join(&base, item), Language::Rust));
            if found.is_some() {
                return found;
            }
        }

        self.rust_module_file(&base)
    }

    /// Nearest ancestor directory of `from` holding `lib.rs` or `main.rs`.
    fn rust_crate_root(&self, from: &str) -> String {
        let (mut dir, _) = split_parent(from);
        loop {
            if self.rust_module_file(dir).is_some() {
                return dir.to_string();
            }
            if dir.is_empty() {
                return split_parent(from).0.to_string();
            }
            dir = split_parent(dir).0;
        }
    }

    fn rust_module_file(&self, dir: &str) -> Option<String> {
        ["lib.rs", "main.rs", "mod.rs"]
            .iter()
            .map(|name| join(dir, name))
            .find(|path| self.files.contains(path))
            .or_else(|| {
                (!dir.is_empty())
                    .then(|| format!("{}.rs", dir))
                    .filter(|path| self.files.contains(path))
            })
    }

    /// Longest trailing run of the import path that names a scanned package.
    fn resolve_go(&self, module: &str) -> Option<String> {
        let segments: Vec<&str> = module.split('/').filter(|s| !s.is_empty()).collect();
        (0..segments.len()).find_map(|start| {
            let suffix = segments[start..].join("/");
            self.dir_index
                .get(&suffix)?
                .iter()
                .find_map(|dir| self.representative(dir, Language::Go))
        })
    }

    /// Package-qualified names: `com.example.User`, `App\Models\User`.
    fn resolve_qualified(&self, module: &str, language: Language) -> Option<String> {
        if let Some(target) = self.lookup_module(module, language) {
            return Some(target);
        }

        let segments: Vec<&str> = module
            .split(['.', '\\'])
            .filter(|s| !s.is_empty())
            .collect();
        let min_len = segments.len().min(2);

        for end in (min_len..=segments.len()).rev() {
            let head = &segments[..end];
            for start in 0..=head.len().saturating_sub(min_len) {
                let query = head[start..].join("/");
                if let Some(target) = self.lookup_stem(&query, language) {
                    return Some(target);
                }
                if let Some(target) = self.lookup_directory(&query, language) {
                    return Some(target);
                }
            }
        }
        None
    }

    /// Quoted includes: the including file's directory first, then the
    /// root, then any file whose path ends with the include.
    fn resolve_include(&self, module: &str, from: &str, language: Language) -> Option<String> {
        let (dir, _) = split_parent(from);
        self.try_path(&join(dir, module), language)
            .or_else(|| self.try_path(module, language))
            .or_else(|| {
                self.path_index
                    .get(module)?
                    .iter()
                    .find(|p| same_family(p, language))
                    .cloned()
            })
    }

    fn resolve_directory(&self, module: &str, language: Language) -> Option<String> {
        self.lookup_directory(&module.replace('.', "/"), language)
    }

    fn lookup_module(&self, module: &str, language: Language) -> Option<String> {
        self.modules
            .get(&(family(language), module.to_string()))
            .cloned()
    }

    fn lookup_stem(&self, query: &str, language: Language) -> Option<String> {
        self.stem_index
            .get(query)?
            .iter()
            .find(|p| same_family(p, language))
            .cloned()
    }

    fn lookup_directory(&self, query: &str, language: Language) -> Option<String> {
        self.dir_index
            .get(query)?
            .iter()
            .find_map(|dir| self.representative(dir, language))
    }

    /// First file of the language family directly inside `dir`, preferring
    /// non-test files.
    fn representative(&self, dir: &str, language: Language) -> Option<String> {
        let candidates: Vec<&String> = self
            .dirs
            .get(dir)?
            .iter()
            .filter(|p| same_family(p, language))
            .collect();
        candidates
            .iter()
            .find(|p| !p.ends_with("_test.go"))
            .or(candidates.first())
            .map(|p| p.to_string())
    }

    /// Literal path, then with each extension, then as a directory index.
    fn try_path(&self, candidate: &str, language: Language) -> Option<String> {
        let path = normalize(candidate)?;

        if !path.is_empty() && self.files.contains(&path) {
            return Some(path);
        }
        if !path.is_empty() {
            for ext in language.resolution_extensions() {
                let with_ext = format!("{}.{}", path, ext);
                if self.files.contains(&with_ext) {
                    return Some(with_ext);
                }
            }
        }
        for index in language.index_files() {
            let index_path = join(&path, index);
            if self.files.contains(&index_path) {
                return Some(index_path);
            }
        }

        if matches!(language, Language::JavaScript | Language::TypeScript) {
            let stem = EMITTED_JS.iter().find_map(|ext| path.strip_suffix(ext))?;
            return Language::TypeScript
                .resolution_extensions()
                .iter()
                .map(|ext| format!("{}.{}", stem, ext))
                .find(|p| self.files.contains(p));
        }
        None
    }
}

/// Standard-library and platform modules that can never be project files.
fn is_external(module: &str, language: Language) -> bool {
    let first = |separators: &[char]| module.split(separators).next().unwrap_or(module);
    match language {
        Language::Python => !module.starts_with('.') && PYTHON_STDLIB.contains(&first(&['.'])),
        Language::JavaScript | Language::TypeScript => {
            module.starts_with("node:") || NODE_BUILTINS.contains(&first(&['/']))
        }
        Language::Rust => RUST_BUILTIN_CRATES.contains(&first(&[':'])),
        Language::Go => GO_STDLIB.contains(&first(&['/'])),
        Language::Java | Language::Kotlin | Language::Scala => {
            JVM_PLATFORM_PREFIXES.iter().any(|p| module.starts_with(p))
        }
        Language::CSharp => DOTNET_ROOTS.contains(&first(&['.'])),
        Language::Swift => SWIFT_PLATFORM.contains(&first(&['.'])),
        Language::C | Language::Cpp => module.starts_with('<'),
        Language::Php | Language::Ruby | Language::Lua => false,
    }
}

/// Languages whose files may import one another.
fn family(language: Language) -> Language {
    match language {
        Language::TypeScript => Language::JavaScript,
        Language::Cpp => Language::C,
        other => other,
    }
}

fn same_family(path: &str, language: Language) -> bool {
    Language::from_path(std::path::Path::new(path)).is_some_and(|l| family(l) == family(language))
}

/// Directory whose files are the submodules of a Rust source file.
fn rust_module_dir(from: &str) -> String {
    let (dir, name) = split_parent(from);
    match name {
        "mod.rs" | "lib.rs" | "main.rs" => dir.to_string(),
        _ => join(dir, strip_extension(name)),
    }
}

/// (`a/b`, `c.rs`) for `a/b/c.rs`; the directory is empty at the root.
fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

fn strip_extension(path: &str) -> &str {
    let (_, name) = split_parent(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &path[..path.len() - (name.len() - dot)],
        _ => path,
    }
}

fn join(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        rel.to_string()
    } else if rel.is_empty() {
        dir.to_string()
    } else {
        format!("{}/{}", dir, rel)
    }
}

/// Lexically collapse `.` and `..`; `None` when the path climbs above the root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// `a/b/c` yields `a/b/c`, `b/c`, `c`.
fn suffixes(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.match_indices('/').map(move |(i, _)| &path[i + 1..]))
}
