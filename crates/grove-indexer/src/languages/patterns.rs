//! Per-language pattern tables for the regex-driven extractor
//!
//! Every pattern is matched against a single line. Named groups carry the
//! pieces the engine reads:
//!
//! - imports: `module` (required), `items`, `alias`, `wildcard`, `relative`
//! - types: `name` (required), `bases`, `implements`
//! - functions: `name` (required), `params`, `owner`, `ret`, `classmethod`
//!
//! Within one table, patterns are tried in order and the first match with a
//! usable name wins.

use grove_core::Language;

/// How the end of a definition's body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// `{ ... }` with brace counting.
    Braces,
    /// A matching `end` at the same or lower indentation.
    EndKeyword,
}

/// Where the parameter name sits inside one parameter declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `Type name = default`
    TypeFirst,
    /// `name: Type = default`
    NameFirst,
}

pub struct PatternTable {
    pub language: Language,
    pub blocks: BlockStyle,
    pub params: ParamStyle,
    pub line_comments: &'static [&'static str],
    /// A line holding nothing but an attribute or annotation; group `name`.
    pub annotation: Option<&'static str>,
    pub imports: &'static [&'static str],
    pub types: &'static [&'static str],
    pub functions: &'static [&'static str],
}

pub static TABLES: &[PatternTable] = &[CSHARP, PHP, RUBY, KOTLIN, SWIFT, SCALA, LUA];

const CSHARP: PatternTable = PatternTable {
    language: Language::CSharp,
    blocks: BlockStyle::Braces,
    params: ParamStyle::TypeFirst,
    line_comments: &["//"],
    annotation: Some(r"^\s*\[(?P<name>[A-Za-z_][\w.]*)[^\]]*\]\s*$"),
    imports: &[
        r"^\s*(?:global\s+)?using\s+(?:static\s+)?(?:(?P<alias>\w+)\s*=\s*)?(?P<module>[A-Za-z_][\w.]*)\s*;",
    ],
    types: &[
        r"^\s*(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|unsafe|new|ref|file)\s+)*(?:class|struct|interface|record(?:\s+(?:class|struct))?|enum)\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>]*>)?(?:\s*\([^)]*\))?(?:\s*:\s*(?P<bases>[^{;]+?))?\s*(?:\bwhere\b[^{]*)?(?:[{;].*)?$",
    ],
    functions: &[
        r"^\s*(?:(?:public|private|protected|internal|static|virtual|override|abstract|sealed|async|extern|unsafe|new|partial|readonly)\s+)*(?:(?P<ret>[\w.?\[\]]+(?:<[^()]*>)?[?\[\]]*)\s+)?(?P<name>[A-Za-z_]\w*)\s*(?:<[^()]*>)?\s*\((?P<params>[^)]*)\)",
    ],
};

const PHP: PatternTable = PatternTable {
    language: Language::Php,
    blocks: BlockStyle::Braces,
    params: ParamStyle::TypeFirst,
    line_comments: &["//", "#", "*", "/*"],
    annotation: Some(r"^\s*#\[(?P<name>[A-Za-z_\\][\w\\]*)[^\]]*\]\s*$"),
    imports: &[
        r"^\s*use\s+(?:function\s+|const\s+)?\\?(?P<module>[A-Za-z_][\w\\]*)(?:\s+as\s+(?P<alias>\w+))?\s*;",
        r#"^\s*(?:require|require_once|include|include_once)\s*\(?\s*(?:__DIR__\s*\.\s*)?['"](?P<module>[^'"]+)['"]"#,
    ],
    types: &[
        r"^\s*(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait|enum)\s+(?P<name>[A-Za-z_]\w*)(?:\s*:\s*\w+)?(?:\s+extends\s+(?P<bases>[\w\\,\s]+?))?(?:\s+implements\s+(?P<implements>[\w\\,\s]+?))?\s*(?:\{.*)?$",
    ],
    functions: &[
        r"^\s*(?:(?:public|private|protected|static|abstract|final)\s+)*function\s+&?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)",
    ],
};

const RUBY: PatternTable = PatternTable {
    language: Language::Ruby,
    blocks: BlockStyle::EndKeyword,
    params: ParamStyle::NameFirst,
    line_comments: &["#"],
    annotation: None,
    imports: &[
        r#"^\s*(?:(?P<relative>require_relative)|require|load)\s*\(?\s*['"](?P<module>[^'"]+)['"]"#,
    ],
    types: &[r"^\s*(?:class|module)\s+(?P<name>[A-Z][\w:]*)(?:\s*<\s*(?P<bases>[A-Z][\w:]*))?"],
    functions: &[
        r"^\s*(?:(?:private|protected|public)\s+)?def\s+(?P<classmethod>self\.)?(?P<name>[A-Za-z_]\w*[?!=]?)\s*(?:\((?P<params>[^)]*)\))?",
    ],
};

const KOTLIN: PatternTable = PatternTable {
    language: Language::Kotlin,
    blocks: BlockStyle::Braces,
    params: ParamStyle::NameFirst,
    line_comments: &["//", "*", "/*"],
    annotation: Some(r"^\s*@(?P<name>[A-Za-z_][\w.]*)(?:\([^)]*\))?\s*$"),
    imports: &[
        r"^\s*import\s+(?P<module>[A-Za-z_][\w.]*?)(?P<wildcard>\.\*)?(?:\s+as\s+(?P<alias>\w+))?\s*;?\s*$",
    ],
    types: &[
        r"^\s*(?:(?:public|private|protected|internal|abstract|open|sealed|data|enum|annotation|inner|value|final|expect|actual)\s+)*(?:class|interface|object)\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>]*>)?(?:\s*(?:(?:public|private|protected|internal)\s+)?(?:constructor\s*)?\([^)]*\))?(?:\s*:\s*(?P<bases>[^{]+?))?\s*(?:\{.*)?$",
    ],
    functions: &[
        r"^\s*(?:(?:public|private|protected|internal|override|open|abstract|final|suspend|inline|operator|infix|tailrec|external|actual|expect)\s+)*fun\s+(?:<[^>]*>\s*)?(?:[\w.]+\.)?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)",
    ],
};

const SWIFT: PatternTable = PatternTable {
    language: Language::Swift,
    blocks: BlockStyle::Braces,
    params: ParamStyle::NameFirst,
    line_comments: &["//", "*", "/*"],
    annotation: Some(r"^\s*@(?P<name>[A-Za-z_]\w*)(?:\([^)]*\))?\s*$"),
    imports: &[
        r"^\s*(?:@\w+\s+)?import\s+(?:(?:typealias|struct|class|enum|protocol|let|var|func)\s+)?(?P<module>[A-Za-z_][\w.]*)",
    ],
    types: &[
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|fileprivate|internal|open|final|indirect)\s+)*(?:class|struct|enum|protocol|actor|extension)\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>]*>)?(?:\s*:\s*(?P<bases>[^{]+?))?\s*(?:\bwhere\b[^{]*)?(?:\{.*)?$",
    ],
    functions: &[
        r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|fileprivate|internal|open|final|override|static|class|mutating|nonmutating|convenience|required|dynamic|optional)\s+)*func\s+(?P<name>[A-Za-z_]\w*)\s*(?:<[^>]*>)?\s*\((?P<params>[^)]*)\)",
        r"^\s*(?:@\w+\s+)*(?:(?:public|private|fileprivate|internal|open|override|convenience|required)\s+)*(?P<name>init)[?!]?\s*(?:<[^>]*>)?\s*\((?P<params>[^)]*)\)",
    ],
};

const SCALA: PatternTable = PatternTable {
    language: Language::Scala,
    blocks: BlockStyle::Braces,
    params: ParamStyle::NameFirst,
    line_comments: &["//", "*", "/*"],
    annotation: Some(r"^\s*@(?P<name>[A-Za-z_][\w.]*)(?:\([^)]*\))?\s*$"),
    imports: &[
        r"^\s*import\s+(?P<module>[A-Za-z_][\w.]*?)(?:\.(?P<items>\{[^}]*\}|_|\*))?\s*;?\s*$",
    ],
    types: &[
        r"^\s*(?:(?:abstract|final|sealed|case|implicit|private|protected|lazy|open)\s+)*(?:class|trait|object)\s+(?P<name>[A-Za-z_]\w*)(?:\s*\[[^\]]*\])?(?:\s*(?:private\s*)?\([^)]*\))*(?:\s+extends\s+(?P<bases>[^{]+?))?\s*(?:\{.*)?$",
    ],
    functions: &[
        r"^\s*(?:(?:override|private|protected|final|implicit|inline|abstract)(?:\[[^\]]*\])?\s+)*def\s+(?P<name>[A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*(?:\((?P<params>[^)]*)\))?",
    ],
};

const LUA: PatternTable = PatternTable {
    language: Language::Lua,
    blocks: BlockStyle::EndKeyword,
    params: ParamStyle::NameFirst,
    line_comments: &["--"],
    annotation: None,
    imports: &[
        r#"^\s*(?:(?:local\s+)?(?P<items>[A-Za-z_][\w,\s]*?)\s*=\s*)?require\s*\(?\s*['"](?P<module>[^'"]+)['"]"#,
    ],
    types: &[],
    functions: &[
        r"^\s*(?:local\s+)?function\s+(?P<owner>[A-Za-z_][\w.]*):(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)",
        r"^\s*(?:local\s+)?function\s+(?:[A-Za-z_][\w.]*\.)?(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^)]*)\)",
        r"^\s*(?:local\s+)?(?:[A-Za-z_][\w.]*\.)?(?P<name>[A-Za-z_]\w*)\s*=\s*function\s*\((?P<params>[^)]*)\)",
    ],
};

/// Words that can never name a type or function.
pub const KEYWORDS: &[&str] = &[
    "if", "else", "elif", "elseif", "for", "foreach", "while", "do", "switch", "case", "catch",
    "try", "finally", "return", "new", "throw", "using", "lock", "fixed", "when", "match",
    "guard", "defer", "repeat", "until", "then", "func", "var", "let", "val", "fun", "def",
    "class", "struct", "enum", "sizeof", "typeof", "nameof", "default", "checked",
    "unchecked", "await", "yield", "in", "is", "as", "not", "and", "or", "end", "function",
    "local", "super", "this", "self", "echo", "print", "unless", "begin", "rescue", "ensure",
    "where", "select", "from", "goto", "with", "delete", "import",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}
