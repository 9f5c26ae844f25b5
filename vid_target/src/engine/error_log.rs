//! Persistent per-job failure log.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

/// Appends one line per failed job. Writes are best-effort: a log that
/// cannot be written never fails the job twice.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, source: &Path, error: &str) {
        if let Err(e) = self.try_append(source, error) {
            warn!(log = %self.path.display(), error = %e, "Could not write to error log");
        }
    }

    fn try_append(&self, source: &Path, error: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_entry(source, error))
    }
}

fn format_entry(source: &Path, error: &str) -> String {
    let flattened = error
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "{} {}: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        source.display(),
        flattened
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_one_line_per_call() {
        let dir = TempDir::new().unwrap();
        let log = ErrorLog::new(dir.path().join("logs/errors.txt"));
        log.append(Path::new("a.mkv"), "No video stream found in a.mkv");
        log.append(Path::new("b.mkv"), "Encoder exited\nwith details");

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("a.mkv: No video stream found in a.mkv"));
        assert!(lines[1].ends_with("b.mkv: Encoder exited | with details"));
    }

    #[test]
    fn test_unwritable_log_is_ignored() {
        let dir = TempDir::new().unwrap();
        // a directory where the file should be
        let log = ErrorLog::new(dir.path());
        log.append(Path::new("a.mkv"), "boom");
    }
}
