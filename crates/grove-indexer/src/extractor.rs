//! Structural extraction: bytes in, `ParsedFile` out

use crate::languages::LanguageRegistry;
use crate::parser_pool::ParserPool;
use grove_core::{ClassLike, Function, Language, ParsedFile, RawImport};
use std::path::Path;

/// Default ceiling on the size of a file the extractor will read.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// How much of a file is sampled when sniffing for binary content.
const BINARY_SAMPLE_BYTES: usize = 8 * 1024;
/// Share of non-text bytes in the sample above which a file is binary.
const BINARY_NON_TEXT_RATIO: f64 = 0.30;

/// Why a file was left out of the parsed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unparsable {
    #[error("unsupported file type")]
    Unsupported,
    #[error("binary content")]
    Binary,
    #[error("content is not valid UTF-8")]
    Decode,
    #[error("syntax error near line {line}")]
    Syntax { line: u32 },
    #[error("file is {size} bytes, above the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("failed to read file: {0}")]
    Io(String),
    #[error("parser unavailable: {0}")]
    Parser(String),
}

/// What a language strategy recovers from one source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStructure {
    pub functions: Vec<Function>,
    pub classes: Vec<ClassLike>,
    pub imports: Vec<RawImport>,
}

/// One extraction strategy per language family.
pub trait LanguageExtractor: Send + Sync {
    /// Recover functions, classes and imports from `source`.
    ///
    /// `path` only selects a dialect (`.tsx` against `.ts`, for instance); the
    /// result depends on nothing but the text.
    fn extract(&self, path: &Path, source: &str) -> Result<FileStructure, Unparsable>;
}

/// Entry point of the structural extractor.
pub struct Extractor {
    registry: LanguageRegistry,
    max_file_bytes: u64,
}

impl Extractor {
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_pool(ParserPool::new())
    }

    pub fn with_pool(parser_pool: ParserPool) -> Result<Self, regex::Error> {
        Ok(Self {
            registry: LanguageRegistry::new(parser_pool)?,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        })
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Read `root/rel_path` and extract it.
    pub fn parse_file(&self, root: &Path, rel_path: &str) -> Result<ParsedFile, Unparsable> {
        let abs = root.join(rel_path);
        if Language::from_path(&abs).is_none() {
            return Err(Unparsable::Unsupported);
        }
        let size = std::fs::metadata(&abs)
            .map_err(|e| Unparsable::Io(e.to_string()))?
            .len();
        if size > self.max_file_bytes {
            return Err(Unparsable::TooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }
        let bytes = std::fs::read(&abs).map_err(|e| Unparsable::Io(e.to_string()))?;
        self.parse_source(rel_path, &bytes)
    }

    /// Extract already-read bytes. Identical bytes always give an identical result.
    pub fn parse_source(&self, rel_path: &str, bytes: &[u8]) -> Result<ParsedFile, Unparsable> {
        let path = Path::new(rel_path);
        let language = Language::from_path(path).ok_or(Unparsable::Unsupported)?;
        let size = bytes.len() as u64;
        if size > self.max_file_bytes {
            return Err(Unparsable::TooLarge {
                size,
                limit: self.max_file_bytes,
            });
        }
        if looks_binary(bytes) {
            return Err(Unparsable::Binary);
        }
        let source = std::str::from_utf8(bytes).map_err(|_| Unparsable::Decode)?;

        let strategy = self.registry.get(language).ok_or(Unparsable::Unsupported)?;
        let structure = strategy.extract(path, source)?;

        Ok(ParsedFile {
            path: rel_path.replace('\\', "/"),
            language,
            size,
            lines: count_lines(source),
            functions: structure.functions,
            classes: structure.classes,
            imports: structure.imports,
        })
    }
}

/// True when the first 8 KiB contain a NUL byte or are mostly non-text.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(BINARY_SAMPLE_BYTES)];
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let non_text = sample
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t' | 0x0c | 0x08 | 0x1b)) || b == 0x7f)
        .count();
    non_text as f64 / sample.len() as f64 > BINARY_NON_TEXT_RATIO
}

fn count_lines(source: &str) -> u32 {
    if source.is_empty() {
        return 0;
    }
    let newlines = source.bytes().filter(|&b| b == b'\n').count();
    let trailing = usize::from(!source.ends_with('\n'));
    (newlines + trailing) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_detection() {
        assert!(looks_binary(b"abc\0def"));
        assert!(looks_binary(&[1u8, 2, 3, 4, b'a']));
        assert!(!looks_binary(b"plain text\nwith lines\n"));
        assert!(!looks_binary("caf\u{e9} na\u{ef}ve".as_bytes()));
        assert!(!looks_binary(b""));
    }

    #[test]
    fn test_line_count() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("a"), 1);
        assert_eq!(count_lines("a\nb\n"), 2);
        assert_eq!(count_lines("a\nb"), 2);
    }

    #[test]
    fn test_unparsable_reasons() {
        let extractor = Extractor::new().unwrap();
        assert_eq!(
            extractor.parse_source("notes.txt", b"hello"),
            Err(Unparsable::Unsupported)
        );
        assert_eq!(
            extractor.parse_source("blob.py", b"x = 1\0\0"),
            Err(Unparsable::Binary)
        );
        assert_eq!(
            extractor.parse_source("latin.py", &[b'x', b'=', b'"', 0xe9, b'"']),
            Err(Unparsable::Decode)
        );
        assert!(matches!(
            extractor.parse_source("broken.py", b"def f(:\n  pass\n"),
            Err(Unparsable::Syntax { .. })
        ));

        let small = Extractor::new().unwrap().with_max_file_bytes(4);
        assert_eq!(
            small.parse_source("big.py", b"x = 12345"),
            Err(Unparsable::TooLarge { size: 9, limit: 4 })
        );
    }

    #[test]
    fn test_parse_source_fills_file_metadata() {
        let extractor = Extractor::new().unwrap();
        let source = b"import os\n\ndef main():\n    print('hi')\n";
        let parsed = extractor.parse_source("pkg/app.py", source).unwrap();
        assert_eq!(parsed.path, "pkg/app.py");
        assert_eq!(parsed.language, Language::Python);
        assert_eq!(parsed.size, source.len() as u64);
        assert_eq!(parsed.lines, 4);
        assert_eq!(parsed.functions[0].name, "main");
        assert_eq!(parsed.imports[0].module, "os");
    }

    #[test]
    fn test_identical_bytes_give_identical_result() {
        let extractor = Extractor::new().unwrap();
        let source = b"class A:\n    def m(self):\n        helper()\n\ndef helper():\n    pass\n";
        let first = extractor.parse_source("a.py", source).unwrap();
        extractor.parse_source("other.py", b"def other(): pass\n").unwrap();
        let second = extractor.parse_source("a.py", source).unwrap();
        assert_eq!(first, second);
    }
}
