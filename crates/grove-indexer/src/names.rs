//! Folder and file name listing over the filtered project tree

use crate::discovery::{FilterSet, discover_files};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryKind {
    Folder,
    File,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Folder => write!(f, "FOLDER"),
            EntryKind::File => write!(f, "FILE"),
        }
    }
}

/// One listed folder or file. The project root is listed as `.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_size: Option<String>,
}

/// `path; [TYPE]` or `path; [TYPE]; bytes; human size`.
impl fmt::Display for NameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; [{}]", self.path, self.kind)?;
        if let (Some(bytes), Some(human)) = (self.size_bytes, &self.formatted_size) {
            write!(f, "; {}; {}", bytes, human)?;
        }
        Ok(())
    }
}

/// Human-readable size with one decimal, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, SIZE_UNITS[unit])
}

/// Lists folders (and optionally files) depth-first: each folder, then its
/// files, then its subfolders, all sorted by name.
///
/// Only folders that hold at least one file passing the filters appear.
/// Folder sizes are the sum of their listed files.
#[derive(Debug, Clone, Copy)]
pub struct NameLister {
    include_files: bool,
    include_size: bool,
}

impl Default for NameLister {
    fn default() -> Self {
        NameLister {
            include_files: true,
            include_size: false,
        }
    }
}

impl NameLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(mut self, include_files: bool) -> Self {
        self.include_files = include_files;
        self
    }

    pub fn with_sizes(mut self, include_size: bool) -> Self {
        self.include_size = include_size;
        self
    }

    pub fn list(&self, root: &Path, filters: &FilterSet) -> Vec<NameEntry> {
        let mut files_in: BTreeMap<String, Vec<(String, u64)>> = BTreeMap::new();
        let mut children: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut folder_sizes: HashMap<String, u64> = HashMap::new();

        for rel_path in discover_files(root, filters) {
            let size = if self.include_size {
                std::fs::metadata(root.join(&rel_path))
                    .map(|m| m.len())
                    .unwrap_or(0)
            } else {
                0
            };

            let dir = parent_of(&rel_path).to_string();
            let mut current = dir.clone();
            loop {
                *folder_sizes.entry(current.clone()).or_default() += size;
                if current.is_empty() {
                    break;
                }
                let parent = parent_of(&current).to_string();
                children.entry(parent.clone()).or_default().insert(current);
                current = parent;
            }
            files_in.entry(dir).or_default().push((rel_path, size));
        }

        let mut entries = Vec::new();
        self.emit("", &files_in, &children, &folder_sizes, &mut entries);
        tracing::info!("Listed {} names under {}", entries.len(), root.display());
        entries
    }

    fn emit(
        &self,
        dir: &str,
        files_in: &BTreeMap<String, Vec<(String, u64)>>,
        children: &HashMap<String, BTreeSet<String>>,
        folder_sizes: &HashMap<String, u64>,
        out: &mut Vec<NameEntry>,
    ) {
        let path = if dir.is_empty() { "." } else { dir };
        let size = folder_sizes.get(dir).copied().unwrap_or(0);
        out.push(self.entry(path, EntryKind::Folder, size));

        if self.include_files {
            for (file, size) in files_in.get(dir).into_iter().flatten() {
                out.push(self.entry(file, EntryKind::File, *size));
            }
        }
        for child in children.get(dir).into_iter().flatten() {
            self.emit(child, files_in, children, folder_sizes, out);
        }
    }

    fn entry(&self, path: &str, kind: EntryKind, size: u64) -> NameEntry {
        NameEntry {
            path: path.to_string(),
            kind,
            size_bytes: self.include_size.then_some(size),
            formatted_size: self.include_size.then(|| format_size(size)),
        }
    }
}

fn parent_of(rel_path: &str) -> &str {
    rel_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_repo_with_structure;

    fn sample_repo() -> tempfile::TempDir {
        create_repo_with_structure(&[
            ("README.md", "# R\n"),
            ("src/main.rs", "fn main() {}\n"),
            ("src/util/mod.rs", ""),
            ("docs/guide.md", "abc"),
            ("node_modules/pkg/index.js", "x"),
        ])
    }

    #[test]
    fn test_lists_folders_then_files_depth_first() {
        let repo = sample_repo();
        let filters = FilterSet::with_defaults(&[], &[]).unwrap();
        let entries = NameLister::new().with_sizes(true).list(repo.path(), &filters);

        let lines: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                ".; [FOLDER]; 20; 20.0 B",
                "README.md; [FILE]; 4; 4.0 B",
                "docs; [FOLDER]; 3; 3.0 B",
                "docs/guide.md; [FILE]; 3; 3.0 B",
                "src; [FOLDER]; 13; 13.0 B",
                "src/main.rs; [FILE]; 13; 13.0 B",
                "src/util; [FOLDER]; 0; 0 B",
                "src/util/mod.rs; [FILE]; 0; 0 B",
            ]
        );
    }

    #[test]
    fn test_folders_only_without_sizes() {
        let repo = sample_repo();
        let filters = FilterSet::with_defaults(&["docs".to_string()], &[]).unwrap();
        let entries = NameLister::new().with_files(false).list(repo.path(), &filters);

        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec![".", "src", "src/util"]);
        assert_eq!(
            serde_json::to_value(&entries[1]).unwrap(),
            serde_json::json!({ "path": "src", "type": "FOLDER" })
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512.0 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
