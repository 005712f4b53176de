//! Parsed-file model, dependency graphs, analysis and the project cache

pub mod model;
pub mod graph;
pub mod symbols;
pub mod builder;
pub mod analysis;
pub mod cache;

#[cfg(test)]
mod tests;

pub use model::{
    ClassLike, EdgeKind, FileDependencies, FileDetail, FileGraph, FileNode, Function,
    FunctionGraph, FunctionNode, Language, NodeKind, NodeMetrics, ParsedFile, ProjectGraph,
    RawImport, ResolvedEdge,
};
pub use graph::DependencyGraph;
pub use symbols::SymbolTable;
pub use builder::{apply_centrality, build_file_graph, build_function_graph, function_id};
pub use analysis::{DeadCode, ProjectStats, detect_cycles, file_dependencies, file_detail, find_dead_code, summarize};
pub use cache::{CACHE_VERSION, CacheError, CacheMetadata, CacheStats, CacheStore, CachedFile, CachedFiles, FileStamp};
