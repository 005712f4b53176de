//! Flattens a project's text files into one document for language-model context

use crate::extractor::{DEFAULT_MAX_FILE_BYTES, looks_binary};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// First line of a formatted bundle.
pub const FORMATTED_HEADER: &str =
    "BA denotes the top border and WA denotes the bottom border used to separate files.\n";

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleFormat {
    /// `BA` / `'path'` / content / `WA` blocks under a header note.
    #[default]
    Formatted,
    /// `----- path -----` followed by the content and a blank line.
    Plain,
}

/// What went into a bundle and what was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleSummary {
    pub files: usize,
    pub bytes: u64,
    /// Binary, oversized or unreadable files.
    pub skipped: usize,
    pub included: Vec<String>,
}

pub struct Bundler {
    format: BundleFormat,
    max_file_bytes: u64,
}

impl Bundler {
    pub fn new(format: BundleFormat) -> Self {
        Bundler {
            format,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Append every readable text file in `files` (root-relative) to `out`.
    ///
    /// Only failures writing `out` are errors; a file that cannot be read is
    /// skipped and counted.
    pub fn write<W: Write>(&self, root: &Path, files: &[String], out: &mut W) -> io::Result<BundleSummary> {
        let mut summary = BundleSummary::default();
        if self.format == BundleFormat::Formatted {
            out.write_all(FORMATTED_HEADER.as_bytes())?;
        }

        for rel_path in files {
            let Some(content) = self.read_text(&root.join(rel_path), rel_path) else {
                summary.skipped += 1;
                continue;
            };

            match self.format {
                BundleFormat::Formatted => {
                    write!(out, "BA\n'{}'\n{}\nWA\n", rel_path, content)?;
                }
                BundleFormat::Plain => {
                    write!(out, "----- {} -----\n{}\n\n", rel_path, content)?;
                }
            }

            summary.files += 1;
            summary.bytes += content.len() as u64;
            summary.included.push(rel_path.clone());
            if summary.files % PROGRESS_EVERY == 0 {
                tracing::debug!("Bundled {} files ({} bytes)", summary.files, summary.bytes);
            }
        }

        out.flush()?;
        tracing::info!(
            "Bundled {} files ({} bytes), skipped {}",
            summary.files,
            summary.bytes,
            summary.skipped
        );
        Ok(summary)
    }

    fn read_text(&self, path: &Path, rel_path: &str) -> Option<String> {
        let size = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::debug!("Skipping {}: {}", rel_path, e);
                return None;
            }
        };
        if size > self.max_file_bytes {
            tracing::debug!("Skipping {}: {} bytes exceeds {}", rel_path, size, self.max_file_bytes);
            return None;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", rel_path, e);
                return None;
            }
        };
        if looks_binary(&bytes) {
            tracing::debug!("Skipping binary file {}", rel_path);
            return None;
        }
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}
