//! Probing discovered files into transcode jobs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use shared_utils::modern_ui::progress_style::{PROGRESS_CHARS, SPINNER_CHARS};
use shared_utils::modern_ui::symbols;
use shared_utils::{colors, probe_media, ProbeError, ProbeOutput};
use tracing::{debug, info, warn};

use crate::job::TranscodeJob;

const BAR_TEMPLATE: &str = " {spinner:.cyan} Reading video metadata\n   |{bar:25.cyan}| {percent}%";

#[derive(Debug)]
pub struct ProbeSummary {
    pub jobs: Vec<TranscodeJob>,
    /// Files the probe could not read as video containers.
    pub invalid: Vec<PathBuf>,
}

/// Probes every file in parallel. Order of `files` is preserved in the jobs.
pub fn probe_files_with<F>(files: &[PathBuf], progress: &ProgressBar, prober: F) -> ProbeSummary
where
    F: Fn(&Path) -> Result<ProbeOutput, ProbeError> + Sync,
{
    let results: Vec<(PathBuf, Result<ProbeOutput, ProbeError>)> = files
        .par_iter()
        .progress_with(progress.clone())
        .map(|file| (file.clone(), prober(file.as_path())))
        .collect();

    let mut jobs = Vec::with_capacity(results.len());
    let mut invalid = Vec::new();
    for (file, result) in results {
        match result {
            Ok(probe) => jobs.push(TranscodeJob::new(file, probe)),
            Err(e) => {
                debug!(file = %file.display(), error = %e, "Probe failed");
                invalid.push(file);
            }
        }
    }

    ProbeSummary { jobs, invalid }
}

fn metadata_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS)
        .tick_chars(SPINNER_CHARS);
    bar.set_style(style);
    bar
}

/// Reads the metadata of every file with the probe tool.
///
/// Unreadable files are reported and dropped; no readable file at all ends
/// the run.
pub fn read(files: &[PathBuf], probe_path: &Path) -> Result<Vec<TranscodeJob>> {
    let bar = metadata_bar(files.len() as u64);
    let summary = probe_files_with(files, &bar, |file| probe_media(probe_path, file));
    bar.finish_and_clear();

    info!(
        jobs = summary.jobs.len(),
        invalid = summary.invalid.len(),
        "Video metadata read"
    );
    if !summary.invalid.is_empty() {
        warn!(count = summary.invalid.len(), "Files are not valid video containers");
        println!(
            "  {} {} files are not valid video containers.",
            colors::warning().apply_to(symbols::WARNING),
            summary.invalid.len()
        );
    }

    if summary.jobs.is_empty() {
        println!("{}", colors::error().apply_to("No files left to process."));
        bail!("No files left to process");
    }
    Ok(summary.jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_probe(file: &Path) -> Result<ProbeOutput, ProbeError> {
        if file.extension().is_some_and(|e| e == "bad") {
            return Err(ProbeError::ExecutionFailed {
                path: file.display().to_string(),
                message: "Invalid data found when processing input".to_string(),
            });
        }
        Ok(ProbeOutput::from_json(r#"{"streams": [{"codec_type": "video", "height": 720}]}"#)?)
    }

    #[test]
    fn test_order_preserved_and_invalid_counted() {
        let files: Vec<PathBuf> = (0..40)
            .map(|i| PathBuf::from(format!("clip{i}.{}", if i % 7 == 0 { "bad" } else { "mkv" })))
            .collect();

        let bar = ProgressBar::hidden();
        let summary = probe_files_with(&files, &bar, fake_probe);

        let expected: Vec<&PathBuf> = files
            .iter()
            .filter(|f| f.extension().is_some_and(|e| e == "mkv"))
            .collect();
        let got: Vec<&PathBuf> = summary.jobs.iter().map(|j| &j.source_path).collect();
        assert_eq!(got, expected);
        assert_eq!(summary.invalid.len(), 6);
        assert_eq!(bar.position(), 40);
    }

    #[test]
    fn test_metadata_bar_builds_and_ticks() {
        let bar = metadata_bar(10);
        bar.set_draw_target(ProgressDrawTarget::hidden());
        bar.inc(3);
        assert_eq!(bar.position(), 3);
        assert_eq!(bar.length(), Some(10));
        bar.finish_and_clear();
    }

    #[test]
    fn test_read_with_only_invalid_files_fails() {
        let err = read(
            &[PathBuf::from("/nonexistent/clip.mkv")],
            Path::new("/nonexistent/ffprobe"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("No files left to process"));
    }
}
