//! Candidate discovery honoring `.gitignore` and include/exclude globs

use crate::config::ConfigError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use grove_core::Language;
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Directories never worth scanning.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    "dist",
    "build",
];

/// Bumped whenever the set of recognized source extensions changes, so that
/// caches written under the old set stop matching.
pub const EXTENSION_SET_VERSION: u32 = 1;

/// Compiled include/exclude globs.
///
/// A pattern without a leading `**/` or `/` matches at any depth, and a
/// pattern naming a directory also matches everything below it.
#[derive(Debug, Clone)]
pub struct FilterSet {
    exclude: Vec<String>,
    include: Vec<String>,
    exclude_set: GlobSet,
    include_set: GlobSet,
}

impl FilterSet {
    pub fn new(exclude: &[String], include: &[String]) -> Result<Self, ConfigError> {
        Ok(FilterSet {
            exclude_set: build_set(exclude)?,
            include_set: build_set(include)?,
            exclude: exclude.to_vec(),
            include: include.to_vec(),
        })
    }

    /// [`DEFAULT_EXCLUDES`] followed by `exclude`.
    pub fn with_defaults(exclude: &[String], include: &[String]) -> Result<Self, ConfigError> {
        let mut all: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        for pattern in exclude {
            if !all.contains(pattern) {
                all.push(pattern.clone());
            }
        }
        Self::new(&all, include)
    }

    pub fn excludes(&self) -> &[String] {
        &self.exclude
    }

    pub fn includes(&self) -> &[String] {
        &self.include
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude_set.is_match(rel_path)
    }

    /// An empty include list admits everything.
    pub fn is_included(&self, rel_path: &str) -> bool {
        self.include.is_empty() || self.include_set.is_match(rel_path)
    }

    pub fn accepts(&self, rel_path: &str) -> bool {
        !self.is_excluded(rel_path) && self.is_included(rel_path)
    }

    /// 16 hex chars identifying the pattern sets, independent of their order.
    pub fn fingerprint(&self) -> String {
        let sorted = |patterns: &[String]| {
            let mut patterns = patterns.to_vec();
            patterns.sort();
            patterns.dedup();
            patterns
        };

        let mut hasher = Sha256::new();
        hasher.update(b"exclude\0");
        for pattern in sorted(&self.exclude) {
            hasher.update(pattern.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(b"include\0");
        for pattern in sorted(&self.include) {
            hasher.update(pattern.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(format!("extensions:{}", EXTENSION_SET_VERSION).as_bytes());

        hasher
            .finalize()
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let trimmed = pattern.trim().trim_start_matches("./").trim_end_matches('/');
        if trimmed.is_empty() {
            continue;
        }
        let anchored = trimmed.strip_prefix('/');
        let base = anchored.unwrap_or(trimmed);
        let mut variants = vec![base.to_string(), format!("{}/**", base)];
        if anchored.is_none() && !base.starts_with("**/") {
            variants.push(format!("**/{}", base));
            variants.push(format!("**/{}/**", base));
        }
        for variant in variants {
            let glob = Glob::new(&variant).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
    }
    builder.build().map_err(|source| ConfigError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Every file under `root` that passes `filters`, as sorted root-relative
/// paths. Excluded directories are never entered.
pub fn discover_files(root: &Path, filters: &FilterSet) -> Vec<String> {
    let prune = Arc::new(filters.clone());
    let walk_root = root.to_path_buf();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            relative_path(&walk_root, entry.path()).is_none_or(|rel| !prune.is_excluded(&rel))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(rel) = relative_path(root, entry.path()) else {
            continue;
        };
        if filters.accepts(&rel) {
            files.push(rel);
        }
    }

    files.sort();
    files
}

/// [`discover_files`] narrowed to files of a registered language.
pub fn discover_sources(root: &Path, filters: &FilterSet) -> Vec<String> {
    discover_files(root, filters)
        .into_iter()
        .filter(|path| Language::from_path(Path::new(path)).is_some())
        .collect()
}

/// `path` relative to `root` with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
