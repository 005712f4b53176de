//! Per-project cache of parsed files, graphs, metadata and statistics

use crate::analysis::ProjectStats;
use crate::model::{ParsedFile, ProjectGraph};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Bumped whenever a persisted document changes shape.
pub const CACHE_VERSION: &str = "1.0";

/// Prefix of every per-project cache directory.
pub const PROJECT_DIR_PREFIX: &str = "project_";

/// Parsed file document
pub const FILES_DOC: &str = "files.json";
/// Graph document
pub const GRAPH_DOC: &str = "graph.json";
/// Metadata document
pub const METADATA_DOC: &str = "metadata.json";
/// Statistics document
pub const STATS_DOC: &str = "stats.json";

const IGNORE_MARKER: &str = ".gitignore";
const IGNORE_CONTENTS: &str = "# Ignore all cache files\n*\n!.gitignore\n";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode cache document: {0}")]
    Encode(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Size and modification time of a source file when it was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub size: u64,
    /// Milliseconds since the Unix epoch.
    pub modified_ms: i64,
}

impl FileStamp {
    /// Read the stamp of a file on disk.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let modified_ms = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
            .unwrap_or(0);
        Ok(FileStamp {
            size: meta.len(),
            modified_ms,
        })
    }
}

/// One parsed file together with the stamp it was parsed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    pub stamp: FileStamp,
    pub parsed: ParsedFile,
}

/// The parsed-file document, keyed by root-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CachedFiles {
    pub files: BTreeMap<String, CachedFile>,
}

impl CachedFiles {
    pub fn parsed(&self) -> Vec<ParsedFile> {
        self.files.values().map(|c| c.parsed.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Scan bookkeeping persisted next to the data documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub cache_version: String,
    pub project_root: PathBuf,
    pub last_scan: DateTime<Utc>,
    pub file_count: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub scan_time_ms: u64,
    /// Fingerprint of the include/exclude pattern set active at scan time.
    pub filter_fingerprint: String,
}

impl CacheMetadata {
    /// Metadata stamped with the current time and cache version.
    pub fn new(project_root: &Path, filter_fingerprint: &str) -> Self {
        CacheMetadata {
            cache_version: CACHE_VERSION.to_string(),
            project_root: project_root.to_path_buf(),
            last_scan: Utc::now(),
            file_count: 0,
            function_count: 0,
            class_count: 0,
            scan_time_ms: 0,
            filter_fingerprint: filter_fingerprint.to_string(),
        }
    }

    pub fn matches_filters(&self, filter_fingerprint: &str) -> bool {
        self.filter_fingerprint == filter_fingerprint
    }

    /// Whether the last scan is younger than `max_age`.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        let Ok(ceiling) = chrono::Duration::from_std(max_age) else {
            return true;
        };
        Utc::now().signed_duration_since(self.last_scan) < ceiling
    }
}

/// Size and content summary of one project's cache, or of the whole cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub projects: usize,
    pub documents: usize,
    pub total_bytes: u64,
    pub metadata: Option<CacheMetadata>,
}

/// File-backed cache rooted at one directory, one subdirectory per project.
///
/// Loads never fail: a missing, truncated or corrupt document is a miss.
pub struct CacheStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("root", &self.root).finish()
    }
}

impl CacheStore {
    /// Open (creating if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(io_error(&root))?;
        let marker = root.join(IGNORE_MARKER);
        if !marker.exists() {
            std::fs::write(&marker, IGNORE_CONTENTS).map_err(io_error(&marker))?;
        }
        Ok(CacheStore {
            root,
            locks: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Short deterministic hash of a project path.
    pub fn project_key(project: &Path) -> String {
        let digest = Sha256::digest(project.to_string_lossy().as_bytes());
        digest
            .iter()
            .take(6)
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Directory holding one project's documents (not created).
    pub fn project_dir(&self, project: &Path) -> PathBuf {
        self.root
            .join(format!("{}{}", PROJECT_DIR_PREFIX, Self::project_key(project)))
    }

    /// Mutex serializing scans and cache access for one project.
    pub fn project_lock(&self, project: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(Self::project_key(project))
            .or_default()
            .clone()
    }

    pub fn save_parsed_files(&self, project: &Path, files: &CachedFiles) -> Result<(), CacheError> {
        self.write_doc(project, FILES_DOC, files)
    }

    pub fn load_parsed_files(&self, project: &Path) -> Option<CachedFiles> {
        self.read_doc(project, FILES_DOC)
    }

    pub fn save_graph(&self, project: &Path, graph: &ProjectGraph) -> Result<(), CacheError> {
        self.write_doc(project, GRAPH_DOC, graph)
    }

    pub fn load_graph(&self, project: &Path) -> Option<ProjectGraph> {
        self.read_doc(project, GRAPH_DOC)
    }

    pub fn save_metadata(&self, project: &Path, metadata: &CacheMetadata) -> Result<(), CacheError> {
        self.write_doc(project, METADATA_DOC, metadata)
    }

    pub fn load_metadata(&self, project: &Path) -> Option<CacheMetadata> {
        self.read_doc(project, METADATA_DOC)
    }

    pub fn save_stats(&self, project: &Path, stats: &ProjectStats) -> Result<(), CacheError> {
        self.write_doc(project, STATS_DOC, stats)
    }

    pub fn load_stats(&self, project: &Path) -> Option<ProjectStats> {
        self.read_doc(project, STATS_DOC)
    }

    /// True when metadata exists and the last scan is younger than `max_age`.
    ///
    /// Filter fingerprints are not checked here; callers compare
    /// [`CacheMetadata::filter_fingerprint`] themselves.
    pub fn is_cache_valid(&self, project: &Path, max_age: Duration) -> bool {
        self.load_metadata(project)
            .is_some_and(|meta| meta.is_fresh(max_age))
    }

    /// Delete one project's cache, or every project cache when `None`.
    /// Returns the number of project directories removed.
    pub fn clear_cache(&self, project: Option<&Path>) -> Result<usize, CacheError> {
        let dirs = match project {
            Some(project) => vec![self.project_dir(project)],
            None => self.project_dirs(),
        };
        let mut removed = 0;
        for dir in dirs {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(io_error(&dir))?;
                removed += 1;
            }
        }
        tracing::debug!("Removed {} project cache directories", removed);
        Ok(removed)
    }

    /// Entry count and size on disk for one project, or for the whole cache.
    pub fn cache_stats(&self, project: Option<&Path>) -> CacheStats {
        let dirs = match project {
            Some(project) => vec![self.project_dir(project)],
            None => self.project_dirs(),
        };
        let mut stats = CacheStats::default();
        for dir in dirs.iter().filter(|d| d.is_dir()) {
            stats.projects += 1;
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if let Ok(meta) = entry.metadata() {
                    if meta.is_file() {
                        stats.documents += 1;
                        stats.total_bytes += meta.len();
                    }
                }
            }
        }
        stats.metadata = project.and_then(|p| self.load_metadata(p));
        stats
    }

    fn project_dirs(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(PROJECT_DIR_PREFIX))
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        dirs
    }

    fn write_doc<T: Serialize>(&self, project: &Path, name: &str, value: &T) -> Result<(), CacheError> {
        let dir = self.project_dir(project);
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        let path = dir.join(name);
        let tmp = dir.join(format!("{}.tmp", name));
        let json = serde_json::to_vec_pretty(value)?;
        std::fs::write(&tmp, json).map_err(io_error(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(io_error(&path))?;
        tracing::debug!("Cache document saved: {}", path.display());
        Ok(())
    }

    fn read_doc<T: DeserializeOwned>(&self, project: &Path, name: &str) -> Option<T> {
        let path = self.project_dir(project).join(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Cannot read cache document {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding corrupt cache document {}: {}", path.display(), e);
                None
            }
        }
    }
}
