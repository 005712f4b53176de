//! Regex-driven extractor for languages without a bundled grammar
//!
//! Definitions are found line by line from a [`PatternTable`]; their bodies
//! are bounded by brace counting or by `end` indentation matching, which is
//! what scopes methods to their class. Results are approximate: a signature
//! spread across lines is missed, braces inside multi-line strings confuse the
//! counter, and callee sets are left empty.

use super::patterns::{BlockStyle, ParamStyle, PatternTable, is_keyword};
use crate::extractor::{FileStructure, LanguageExtractor, Unparsable};
use grove_core::{ClassLike, Function, RawImport};
use regex::{Captures, Regex};
use std::path::Path;

/// Outcome of looking for the body that follows a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    /// Body found; 0-based index of its last line.
    Until(usize),
    /// Nothing opens a body on this or the next line.
    Missing,
    /// A `;` terminates the declaration before any `{`.
    Terminated,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Class { index: usize, end: usize },
    Function { end: usize },
}

impl Scope {
    fn end(&self) -> usize {
        match self {
            Scope::Class { end, .. } | Scope::Function { end } => *end,
        }
    }
}

struct CompiledTable {
    table: &'static PatternTable,
    annotation: Option<Regex>,
    imports: Vec<Regex>,
    types: Vec<Regex>,
    functions: Vec<Regex>,
}

pub struct PatternExtractor {
    compiled: CompiledTable,
}

impl PatternExtractor {
    pub fn new(table: &'static PatternTable) -> Result<Self, regex::Error> {
        let compile = |patterns: &[&str]| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        };
        Ok(Self {
            compiled: CompiledTable {
                table,
                annotation: table.annotation.map(Regex::new).transpose()?,
                imports: compile(table.imports)?,
                types: compile(table.types)?,
                functions: compile(table.functions)?,
            },
        })
    }

    fn is_comment(&self, line: &str) -> bool {
        let trimmed = line.trim_start();
        self.compiled
            .table
            .line_comments
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
    }

    fn scan(&self, source: &str) -> FileStructure {
        let lines: Vec<&str> = source.lines().collect();
        let mut out = FileStructure::default();
        let mut scopes: Vec<Scope> = Vec::new();
        let mut annotations: Vec<String> = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            while scopes.last().is_some_and(|s| s.end() < i) {
                scopes.pop();
            }

            if let Some(caps) = self.compiled.annotation.as_ref().and_then(|re| re.captures(line)) {
                annotations.push(caps["name"].to_string());
                continue;
            }
            if line.trim().is_empty() || self.is_comment(line) {
                continue;
            }

            if let Some(import) = self.match_import(line, i) {
                out.imports.push(import);
                annotations.clear();
                continue;
            }

            let inside_function = scopes.iter().any(|s| matches!(s, Scope::Function { .. }));
            let enclosing_class = scopes.iter().rev().find_map(|s| match s {
                Scope::Class { index, .. } => Some(*index),
                Scope::Function { .. } => None,
            });

            if let Some((caps, column)) = self.match_definition(&self.compiled.types, line) {
                let decorators = std::mem::take(&mut annotations);
                if inside_function {
                    continue;
                }
                let end = match self.body(&lines, i, column) {
                    Body::Until(end) => Some(end),
                    Body::Missing => None,
                    Body::Terminated => continue,
                };
                let class = ClassLike {
                    name: caps["name"].to_string(),
                    line_start: i as u32 + 1,
                    line_end: end.unwrap_or(i) as u32 + 1,
                    bases: self.bases(&caps),
                    decorators,
                    methods: Vec::new(),
                };
                let index = merge_class(&mut out.classes, class);
                if let Some(end) = end {
                    scopes.push(Scope::Class { index, end });
                }
                continue;
            }

            if let Some((caps, column)) = self.match_definition(&self.compiled.functions, line) {
                let decorators = std::mem::take(&mut annotations);
                let Body::Until(end) = self.body(&lines, i, column) else {
                    continue;
                };
                scopes.push(Scope::Function { end });
                if inside_function {
                    continue;
                }

                let signature = signature_text(line, column);
                let mut function = Function {
                    name: caps["name"].to_string(),
                    line_start: i as u32 + 1,
                    line_end: end as u32 + 1,
                    parameters: caps
                        .name("params")
                        .map(|p| self.parameters(p.as_str()))
                        .unwrap_or_default(),
                    decorators,
                    is_async: contains_word(signature, "async") || contains_word(signature, "suspend"),
                    is_static: contains_word(signature, "static"),
                    is_class_method: caps.name("classmethod").is_some()
                        || signature.contains("class func"),
                    ..Default::default()
                };

                let owner = caps.name("owner").map(|o| o.as_str().to_string());
                match (owner, enclosing_class) {
                    (Some(owner), _) => {
                        function.class_name = Some(owner.clone());
                        let index = merge_class(
                            &mut out.classes,
                            ClassLike {
                                name: owner,
                                line_start: function.line_start,
                                line_end: function.line_end,
                                ..Default::default()
                            },
                        );
                        out.classes[index].methods.push(function);
                    }
                    (None, Some(index)) => {
                        function.class_name = Some(out.classes[index].name.clone());
                        out.classes[index].methods.push(function);
                    }
                    (None, None) => out.functions.push(function),
                }
                continue;
            }

            annotations.clear();
        }

        out
    }

    /// First pattern whose `name` is not a keyword, with the column right
    /// after the name, where the search for a body starts.
    fn match_definition<'l>(&self, patterns: &[Regex], line: &'l str) -> Option<(Captures<'l>, usize)> {
        patterns.iter().find_map(|re| {
            let caps = re.captures(line)?;
            let name = caps.name("name")?;
            if is_keyword(name.as_str()) {
                return None;
            }
            if caps.name("ret").is_some_and(|r| is_keyword(r.as_str().trim())) {
                return None;
            }
            let column = name.end();
            Some((caps, column))
        })
    }

    fn match_import(&self, line: &str, index: usize) -> Option<RawImport> {
        let caps = self.compiled.imports.iter().find_map(|re| re.captures(line))?;
        let mut module = caps.name("module")?.as_str().to_string();
        if caps.name("relative").is_some() && !module.starts_with('.') {
            module = format!("./{}", module);
        }

        let mut items: Vec<String> = caps
            .name("items")
            .map(|m| split_items(m.as_str()))
            .unwrap_or_default();
        if caps.name("wildcard").is_some() {
            items.push("*".to_string());
        }

        Some(
            RawImport::new(module, index as u32 + 1)
                .with_items(items)
                .with_alias(caps.name("alias").map(|a| a.as_str().to_string())),
        )
    }

    fn bases(&self, caps: &Captures) -> Vec<String> {
        ["bases", "implements"]
            .iter()
            .filter_map(|group| caps.name(group))
            .flat_map(|m| split_top_level(m.as_str()))
            .flat_map(|base| {
                base.split(" with ")
                    .map(|part| part.split('(').next().unwrap_or_default().trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|base| !base.is_empty())
            .collect()
    }

    fn parameters(&self, raw: &str) -> Vec<String> {
        split_top_level(raw)
            .into_iter()
            .filter_map(|param| {
                let param = param.split('=').next().unwrap_or_default();
                let declared = match self.compiled.table.params {
                    ParamStyle::NameFirst => param.split(':').next().unwrap_or_default(),
                    ParamStyle::TypeFirst => param,
                };
                let name = declared
                    .split_whitespace()
                    .last()?
                    .trim_start_matches(['$', '&', '*', '.'])
                    .trim_end_matches(['?', ',']);
                (!name.is_empty() && name != "self").then(|| name.to_string())
            })
            .collect()
    }

    fn body(&self, lines: &[&str], start: usize, column: usize) -> Body {
        match self.compiled.table.blocks {
            BlockStyle::Braces => brace_body(lines, start, column),
            BlockStyle::EndKeyword => end_keyword_body(lines, start, column),
        }
    }
}

impl LanguageExtractor for PatternExtractor {
    fn extract(&self, _path: &Path, source: &str) -> Result<FileStructure, Unparsable> {
        Ok(self.scan(source))
    }
}

/// Merge a class into one of the same name (partial classes, extensions,
/// reopened Ruby classes). Returns the index of the surviving entry.
fn merge_class(classes: &mut Vec<ClassLike>, class: ClassLike) -> usize {
    if let Some(index) = classes.iter().position(|c| c.name == class.name) {
        let existing = &mut classes[index];
        existing.line_start = existing.line_start.min(class.line_start);
        existing.line_end = existing.line_end.max(class.line_end);
        for base in class.bases {
            if !existing.bases.contains(&base) {
                existing.bases.push(base);
            }
        }
        existing.decorators.extend(class.decorators);
        return index;
    }
    classes.push(class);
    classes.len() - 1
}

/// Signature text from the line start to the body's opening brace.
fn signature_text(line: &str, column: usize) -> &str {
    let tail = &line[column..];
    match tail.find('{') {
        Some(offset) => &line[..column + offset],
        None => line,
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|w| w == word)
}

/// Split on commas that are not nested in brackets.
fn split_top_level(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in raw.chars() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            ',' if depth <= 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts.retain(|p| !p.is_empty());
    parts
}

/// `{A, B => C}`, `_`, `*` and `a, b` item lists.
fn split_items(raw: &str) -> Vec<String> {
    let inner = raw.trim().trim_start_matches('{').trim_end_matches('}');
    split_top_level(inner)
        .into_iter()
        .map(|item| {
            let item = item.split("=>").next().unwrap_or_default().trim();
            if item == "_" { "*".to_string() } else { item.to_string() }
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Character scanner that skips strings and comments while counting braces.
struct BraceScanner {
    in_block_comment: bool,
}

enum Token {
    Open,
    Close,
    Semicolon,
}

impl BraceScanner {
    /// Structural tokens of `text`, in order.
    fn tokens(&mut self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut chars = text.chars().peekable();
        let mut quote: Option<char> = None;

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' | '`' => quote = Some(c),
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '{' => tokens.push(Token::Open),
                '}' => tokens.push(Token::Close),
                ';' => tokens.push(Token::Semicolon),
                _ => {}
            }
        }
        tokens
    }
}

fn brace_body(lines: &[&str], start: usize, column: usize) -> Body {
    let mut scanner = BraceScanner {
        in_block_comment: false,
    };
    let mut depth = 0usize;
    let mut opened = false;

    for (i, line) in lines.iter().enumerate().skip(start) {
        let text = if i == start { line.get(column..).unwrap_or("") } else { line };

        if !opened && i > start && !line.trim_start().starts_with('{') {
            return Body::Missing;
        }

        for token in scanner.tokens(text) {
            match token {
                Token::Semicolon if !opened => return Body::Terminated,
                Token::Semicolon => {}
                Token::Open => {
                    opened = true;
                    depth += 1;
                }
                Token::Close if opened => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Body::Until(i);
                    }
                }
                Token::Close => return Body::Missing,
            }
        }
    }

    if opened {
        Body::Until(lines.len().saturating_sub(1))
    } else {
        Body::Missing
    }
}

fn end_keyword_body(lines: &[&str], start: usize, column: usize) -> Body {
    let rest = lines[start].get(column..).unwrap_or("");
    // one-liners and endless definitions
    if contains_word(rest, "end") || rest.trim_start().starts_with('=') {
        return Body::Until(start);
    }

    let indent = indentation(lines[start]);
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || indentation(line) > indent {
            continue;
        }
        let rest = trimmed.strip_prefix("end").unwrap_or("x");
        let is_end = rest.chars().next().is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
        if trimmed.starts_with("end") && is_end {
            return Body::Until(i);
        }
    }
    Body::Until(lines.len().saturating_sub(1))
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::patterns::TABLES;
    use grove_core::Language;

    fn extract(language: Language, source: &str) -> FileStructure {
        let table = TABLES.iter().find(|t| t.language == language).unwrap();
        PatternExtractor::new(table)
            .unwrap()
            .extract(Path::new("file"), source)
            .unwrap()
    }

    #[test]
    fn test_every_table_compiles() {
        for table in TABLES {
            assert!(PatternExtractor::new(table).is_ok(), "{:?}", table.language);
        }
    }

    #[test]
    fn test_csharp() {
        let source = r#"using System;
using Models = App.Models;

namespace App.Services
{
    [Serializable]
    public class UserService : BaseService, IUserService
    {
        public UserService(IRepo repo) { }

        [HttpGet]
        public async Task<User> GetUser(int id, string name = "x")
        {
            if (id > 0)
            {
                return Find(id);
            }
            return null;
        }

        public abstract void Declared(int x);

        private static int Count() => 0;
    }

    public static void Helper() { }
}
"#;
        let out = extract(Language::CSharp, source);
        assert_eq!(out.imports[0].module, "System");
        assert_eq!(out.imports[1].module, "App.Models");
        assert_eq!(out.imports[1].alias.as_deref(), Some("Models"));

        let service = &out.classes[0];
        assert_eq!(service.name, "UserService");
        assert_eq!(service.bases, vec!["BaseService", "IUserService"]);
        assert_eq!(service.decorators, vec!["Serializable"]);
        let names: Vec<&str> = service.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["UserService", "GetUser"]);
        let get_user = &service.methods[1];
        assert!(get_user.is_async);
        assert_eq!(get_user.parameters, vec!["id", "name"]);
        assert_eq!(get_user.decorators, vec!["HttpGet"]);
        assert_eq!((get_user.line_start, get_user.line_end), (12, 19));
        assert!(get_user.calls.is_empty());

        assert_eq!(out.functions.len(), 1);
        assert_eq!(out.functions[0].name, "Helper");
        assert!(out.functions[0].is_static);
    }

    #[test]
    fn test_ruby_end_matching() {
        let source = r#"require 'json'
require_relative 'lib/helper'

class Greeter < Base
  def initialize(name, greeting: "hi")
    @name = name
    if name
      puts name
    end
  end

  def self.build
    new("x")
  end
end

def standalone(a, *rest)
  a
end
"#;
        let out = extract(Language::Ruby, source);
        assert_eq!(out.imports[0].module, "json");
        assert_eq!(out.imports[1].module, "./lib/helper");

        let greeter = &out.classes[0];
        assert_eq!(greeter.name, "Greeter");
        assert_eq!(greeter.bases, vec!["Base"]);
        assert_eq!((greeter.line_start, greeter.line_end), (4, 15));
        assert_eq!(greeter.methods.len(), 2);
        assert_eq!(greeter.methods[0].parameters, vec!["name", "greeting"]);
        assert_eq!(greeter.methods[0].line_end, 10);
        assert!(greeter.methods[1].is_class_method);

        assert_eq!(out.functions[0].name, "standalone");
        assert_eq!(out.functions[0].parameters, vec!["a", "rest"]);
    }

    #[test]
    fn test_kotlin_and_scala() {
        let kotlin = r#"import kotlinx.coroutines.*
import com.app.data.Repo as R

data class Point(val x: Int, val y: Int)

class Service(private val repo: Repo) : Base(), Closeable {
    suspend fun load(id: String, limit: Int = 10): Item {
        return repo.find(id)
    }

    fun shortForm() = 42
}
"#;
        let out = extract(Language::Kotlin, kotlin);
        assert_eq!(out.imports[0].module, "kotlinx.coroutines");
        assert_eq!(out.imports[0].items, vec!["*"]);
        assert_eq!(out.imports[1].alias.as_deref(), Some("R"));
        assert_eq!(out.classes[0].name, "Point");
        let service = &out.classes[1];
        assert_eq!(service.bases, vec!["Base", "Closeable"]);
        assert_eq!(service.methods.len(), 1);
        assert!(service.methods[0].is_async);
        assert_eq!(service.methods[0].parameters, vec!["id", "limit"]);

        let scala = "import scala.collection.{Map, Seq => S}\n\nobject Main extends App with Logging {\n  def run(args: Array[String]): Unit = {\n    println(args)\n  }\n}\n";
        let out = extract(Language::Scala, scala);
        assert_eq!(out.imports[0].module, "scala.collection");
        assert_eq!(out.imports[0].items, vec!["Map", "Seq"]);
        assert_eq!(out.classes[0].bases, vec!["App", "Logging"]);
        assert_eq!(out.classes[0].methods[0].name, "run");
    }

    #[test]
    fn test_swift_php_lua() {
        let swift = "import UIKit\n\nclass ViewController: UIViewController {\n    init(title: String) {\n    }\n    override func viewDidLoad() {\n        super.viewDidLoad()\n    }\n    class func make(with name: String) -> ViewController {\n        return ViewController(title: name)\n    }\n}\n";
        let out = extract(Language::Swift, swift);
        let vc = &out.classes[0];
        let names: Vec<&str> = vc.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["init", "viewDidLoad", "make"]);
        assert!(vc.methods[2].is_class_method);
        assert_eq!(vc.methods[2].parameters, vec!["name"]);

        let php = "<?php\nuse App\\Models\\User;\nrequire_once 'config.php';\n\nclass UserController extends Controller implements Auth {\n    public function show($id, User $user = null) {\n        return view('x');\n    }\n}\n\nfunction helper() {\n}\n";
        let out = extract(Language::Php, php);
        assert_eq!(out.imports[0].module, "App\\Models\\User");
        assert_eq!(out.imports[1].module, "config.php");
        assert_eq!(out.classes[0].bases, vec!["Controller", "Auth"]);
        assert_eq!(out.classes[0].methods[0].parameters, vec!["id", "user"]);
        assert_eq!(out.functions[0].name, "helper");

        let lua = "local json = require(\"lib.json\")\n\nlocal M = {}\n\nfunction M.encode(value)\n  return json.encode(value)\nend\n\nfunction Account:deposit(v)\n  self.balance = self.balance + v\nend\n\nreturn M\n";
        let out = extract(Language::Lua, lua);
        assert_eq!(out.imports[0].module, "lib.json");
        assert_eq!(out.imports[0].items, vec!["json"]);
        assert_eq!(out.functions[0].name, "encode");
        assert_eq!(out.functions[0].line_end, 7);
        assert_eq!(out.classes[0].name, "Account");
        assert_eq!(out.classes[0].methods[0].name, "deposit");
    }

    #[test]
    fn test_control_flow_is_never_a_definition() {
        let source = "class A {\n    void Run() {\n        while (true) {\n        }\n        foreach (var x in xs) {\n        }\n    }\n}\n";
        let out = extract(Language::CSharp, source);
        assert_eq!(out.classes[0].methods.len(), 1);
        assert!(out.functions.is_empty());
    }
}
