//! Structural extraction, import resolution, discovery, name listing and scan orchestration

pub mod bundle;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod extractor;
pub mod languages;
pub mod names;
pub mod parser_pool;
pub mod resolver;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use bundle::{BundleFormat, BundleSummary, Bundler, FORMATTED_HEADER};
pub use config::{ConfigError, GroveConfig};
pub use coordinator::{CancelFlag, Coordinator, ScanError, ScanOutcome, ScanRequest, ScanSummary};
pub use discovery::{DEFAULT_EXCLUDES, FilterSet, discover_files, discover_sources};
pub use extractor::{DEFAULT_MAX_FILE_BYTES, Extractor, FileStructure, LanguageExtractor, Unparsable};
pub use names::{EntryKind, NameEntry, NameLister, format_size};
pub use parser_pool::{Grammar, ParserPool};
pub use resolver::{ImportResolver, PathAlias};
