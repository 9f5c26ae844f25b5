//! Batch Processing Module
//!
//! Input discovery and run-level accounting for batch transcodes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Container extensions the encoder is known to read (compared case-insensitively).
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mpg", "mpeg", "mpv", "mkv", "flv", "wmv", "avi", "mts", "m2ts", "mov", "qt",
];

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Expands command-line inputs into an ordered, de-duplicated file list.
///
/// Directories are walked recursively for `extensions`, skipping the
/// `excluded_dir` subdirectory of each walked root. Explicit files are taken
/// as given; missing paths are ignored. `on_progress` receives the running
/// count after each input.
pub fn collect_files(
    inputs: &[PathBuf],
    extensions: &[&str],
    excluded_dir: &str,
    mut on_progress: impl FnMut(usize),
) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let Ok(root) = std::fs::canonicalize(input) else {
            on_progress(files.len());
            continue;
        };

        if root.is_dir() {
            let excluded = root.join(excluded_dir);
            let walker = WalkDir::new(&root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.path() != excluded);

            for entry in walker.filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                    let path = entry.into_path();
                    if seen.insert(path.clone()) {
                        files.push(path);
                    }
                }
            }
        } else if root.is_file() && seen.insert(root.clone()) {
            files.push(root);
        }

        on_progress(files.len());
    }

    files
}

/// Run-level accounting: one failure counter, efficiencies of successes.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
    pub efficiencies: Vec<f64>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, efficiency: f64) {
        self.succeeded += 1;
        self.efficiencies.push(efficiency);
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    /// Mean of `size / target` across successful jobs.
    pub fn mean_efficiency(&self) -> Option<f64> {
        if self.efficiencies.is_empty() {
            None
        } else {
            Some(self.efficiencies.iter().sum::<f64>() / self.efficiencies.len() as f64)
        }
    }
}
