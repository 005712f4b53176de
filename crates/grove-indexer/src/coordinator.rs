//! Orchestrates a scan: discovery, parallel extraction, resolution, graph
//! building and the project cache

use crate::config::{ConfigError, GroveConfig};
use crate::discovery::{FilterSet, discover_sources};
use crate::extractor::{DEFAULT_MAX_FILE_BYTES, Extractor};
use crate::parser_pool::ParserPool;
use crate::resolver::{ImportResolver, PathAlias};
use grove_core::{
    CACHE_VERSION, CacheMetadata, CacheStore, CachedFile, CachedFiles, FileStamp, ParsedFile,
    ProjectGraph, ProjectStats, build_file_graph, build_function_graph, summarize,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("not a project directory: {0}")]
    InvalidProjectPath(PathBuf),
    #[error("scan cancelled")]
    Cancelled,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start extraction pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("failed to compile extraction patterns: {0}")]
    Patterns(#[from] regex::Error),
}

/// Shared, advisory cancellation signal, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one scan needs to know about the project.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub root: PathBuf,
    pub filters: FilterSet,
    pub aliases: Vec<PathAlias>,
    pub workers: usize,
    pub max_file_bytes: u64,
    /// Cached results older than this are rescanned.
    pub max_age: Duration,
    /// Ignore the cache entirely, including per-file reuse.
    pub force: bool,
    pub cancel: CancelFlag,
}

impl ScanRequest {
    /// Defaults: built-in excludes, no aliases, default pool size.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let config = GroveConfig::default();
        Ok(ScanRequest {
            root: root.into(),
            filters: config.filter_set()?,
            aliases: Vec::new(),
            workers: config.workers(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_age: config.max_age(),
            force: false,
            cancel: CancelFlag::new(),
        })
    }

    /// Settings from the project's `.grove.toml` and tsconfig aliases.
    pub fn from_config(root: impl Into<PathBuf>, config: &GroveConfig) -> Result<Self, ScanError> {
        let root = root.into();
        Ok(ScanRequest {
            filters: config.filter_set()?,
            aliases: config.path_aliases(&root),
            workers: config.workers(),
            max_file_bytes: config.max_file_bytes(),
            max_age: config.max_age(),
            force: false,
            cancel: CancelFlag::new(),
            root,
        })
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Headline numbers of one scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub file_count: usize,
    /// Top-level functions and methods.
    pub function_count: usize,
    pub class_count: usize,
    pub import_edges: usize,
    pub call_edges: usize,
    /// Candidates that could not be parsed.
    pub skipped: usize,
    /// Files taken unchanged from the previous scan.
    pub reused: usize,
    pub elapsed_ms: u64,
    /// The whole result came from the cache.
    pub cached: bool,
}

/// A completed scan: parsed files, both graphs and derived statistics.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub root: PathBuf,
    pub summary: ScanSummary,
    pub files: Vec<ParsedFile>,
    pub graph: ProjectGraph,
    pub stats: ProjectStats,
}

enum FileResult {
    Parsed(ParsedFile, Option<FileStamp>),
    Reused(CachedFile),
    Skipped,
}

/// Runs scans against one cache, sharing a parser pool between them.
pub struct Coordinator {
    cache: Arc<CacheStore>,
    parser_pool: ParserPool,
}

impl Coordinator {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Coordinator {
            cache,
            parser_pool: ParserPool::new(),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Scan a project, or return its cached result when that is still valid
    /// for the request's filters and age ceiling.
    ///
    /// Holds the project lock for the whole call. A cancelled scan writes
    /// nothing to the cache.
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanOutcome, ScanError> {
        let started = Instant::now();
        let root = request
            .root
            .canonicalize()
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| ScanError::InvalidProjectPath(request.root.clone()))?;

        let lock = self.cache.project_lock(&root);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let fingerprint = request.filters.fingerprint();
        let metadata = self
            .cache
            .load_metadata(&root)
            .filter(|m| m.cache_version == CACHE_VERSION && m.matches_filters(&fingerprint));

        if !request.force {
            if let Some(meta) = metadata.as_ref().filter(|m| m.is_fresh(request.max_age)) {
                if let Some(outcome) = self.load_cached(&root, meta, started) {
                    tracing::info!(
                        "Using cached scan of {} from {}",
                        root.display(),
                        meta.last_scan
                    );
                    return Ok(outcome);
                }
            }
        }

        let previous = match (&metadata, request.force) {
            (Some(_), false) => self.cache.load_parsed_files(&root).unwrap_or_default(),
            _ => CachedFiles::default(),
        };

        let candidates = discover_sources(&root, &request.filters);
        if request.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        tracing::info!(
            "Scanning {} candidate files in {} with {} workers",
            candidates.len(),
            root.display(),
            request.workers
        );

        let extractor = Extractor::with_pool(self.parser_pool.clone())?
            .with_max_file_bytes(request.max_file_bytes);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(request.workers.max(1))
            .thread_name(|i| format!("grove-extract-{}", i))
            .build()?;

        let results: Vec<FileResult> = pool.install(|| {
            candidates
                .par_iter()
                .map(|rel_path| {
                    if request.cancel.is_cancelled() {
                        return FileResult::Skipped;
                    }
                    extract_one(&extractor, &root, rel_path, &previous)
                })
                .collect()
        });

        if request.cancel.is_cancelled() {
            tracing::info!("Scan of {} cancelled", root.display());
            return Err(ScanError::Cancelled);
        }

        let mut cached_files = CachedFiles::default();
        let mut files = Vec::with_capacity(results.len());
        let mut summary = ScanSummary::default();
        for result in results {
            match result {
                FileResult::Parsed(parsed, stamp) => {
                    if let Some(stamp) = stamp {
                        cached_files.files.insert(
                            parsed.path.clone(),
                            CachedFile {
                                stamp,
                                parsed: parsed.clone(),
                            },
                        );
                    }
                    files.push(parsed);
                }
                FileResult::Reused(cached) => {
                    summary.reused += 1;
                    files.push(cached.parsed.clone());
                    cached_files.files.insert(cached.parsed.path.clone(), cached);
                }
                FileResult::Skipped => summary.skipped += 1,
            }
        }

        let resolver = ImportResolver::new(files.iter().map(|f| f.path.clone()), request.aliases.clone());
        let resolved = resolver.resolve_all(&files);
        let graph = ProjectGraph {
            files: build_file_graph(&files, &resolved),
            functions: build_function_graph(&files),
        };
        let stats = summarize(&files, &graph);

        summary.file_count = files.len();
        summary.function_count = stats.function_count + stats.method_count;
        summary.class_count = stats.class_count;
        summary.import_edges = graph.files.edges.len();
        summary.call_edges = graph.functions.edges.len();
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        let mut meta = CacheMetadata::new(&root, &fingerprint);
        meta.file_count = summary.file_count;
        meta.function_count = summary.function_count;
        meta.class_count = summary.class_count;
        meta.scan_time_ms = summary.elapsed_ms;
        self.write_cache(&root, &cached_files, &graph, &stats, &meta);

        tracing::info!(
            "Scanned {} files ({} reused, {} skipped) in {} ms",
            summary.file_count,
            summary.reused,
            summary.skipped,
            summary.elapsed_ms
        );

        Ok(ScanOutcome {
            root,
            summary,
            files,
            graph,
            stats,
        })
    }

    fn load_cached(&self, root: &Path, meta: &CacheMetadata, started: Instant) -> Option<ScanOutcome> {
        let graph = self.cache.load_graph(root)?;
        let files = self.cache.load_parsed_files(root)?.parsed();
        let stats = self
            .cache
            .load_stats(root)
            .unwrap_or_else(|| summarize(&files, &graph));

        let summary = ScanSummary {
            file_count: meta.file_count,
            function_count: meta.function_count,
            class_count: meta.class_count,
            import_edges: graph.files.edges.len(),
            call_edges: graph.functions.edges.len(),
            skipped: 0,
            reused: files.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            cached: true,
        };
        Some(ScanOutcome {
            root: root.to_path_buf(),
            summary,
            files,
            graph,
            stats,
        })
    }

    /// Metadata goes last so an interrupted write never looks valid.
    fn write_cache(
        &self,
        root: &Path,
        files: &CachedFiles,
        graph: &ProjectGraph,
        stats: &ProjectStats,
        meta: &CacheMetadata,
    ) {
        let written = self
            .cache
            .save_parsed_files(root, files)
            .and_then(|_| self.cache.save_graph(root, graph))
            .and_then(|_| self.cache.save_stats(root, stats))
            .and_then(|_| self.cache.save_metadata(root, meta));
        if let Err(e) = written {
            tracing::warn!("Failed to write cache for {}: {}", root.display(), e);
        }
    }
}

/// Reuse the previous result when the file's stamp is unchanged, otherwise
/// parse it. Panics stay inside the file boundary.
fn extract_one(extractor: &Extractor, root: &Path, rel_path: &str, previous: &CachedFiles) -> FileResult {
    let stamp = FileStamp::of(&root.join(rel_path)).ok();
    if let (Some(stamp), Some(cached)) = (stamp, previous.files.get(rel_path)) {
        if cached.stamp == stamp {
            return FileResult::Reused(cached.clone());
        }
    }

    match catch_unwind(AssertUnwindSafe(|| extractor.parse_file(root, rel_path))) {
        Ok(Ok(parsed)) => FileResult::Parsed(parsed, stamp),
        Ok(Err(reason)) => {
            tracing::debug!("Skipping {}: {}", rel_path, reason);
            FileResult::Skipped
        }
        Err(_) => {
            tracing::warn!("Extractor panicked on {}; skipping it", rel_path);
            FileResult::Skipped
        }
    }
}
