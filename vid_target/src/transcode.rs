//! Run orchestration: discovery, probing, prompts, the encode loop, summary.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use shared_utils::report::{print_banner, print_completion_line};
use shared_utils::{colors, print_failure_line, summary_line, BatchResult, Reporter, StatusNode};
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::engine::{FfmpegEncoder, SizeTargetController};
use crate::job::TranscodeJob;
use crate::options::EngineOptions;
use crate::prompts::{self, DialoguerPrompter};
use crate::{metadata, prepare};

/// Two-pass statistics files ffmpeg leaves next to the passlog prefix.
const PASSLOG_SUFFIXES: &[&str] = &["-0.log", "-0.log.mbtree", "-0.log.temp", "-0.log.mbtree.temp"];

const SPIN_UP: Duration = Duration::from_secs(1);

/// Makes sure `dir` exists and is empty.
///
/// A non-empty directory is only emptied with `force` or when `confirm`
/// says yes; otherwise the run stops.
pub fn prepare_export_dir(dir: &Path, force: bool, confirm: impl FnOnce() -> Result<bool>) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read export directory {}", dir.display()))?;
    if entries.next().is_none() {
        return Ok(());
    }

    if !(force || confirm()?) {
        println!("{}", colors::error().apply_to("Exports folder is not empty."));
        bail!("Exports folder is not empty");
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    info!(dir = %dir.display(), "Export directory emptied");
    Ok(())
}

/// Removes the two-pass statistics files. Missing files are fine.
pub fn cleanup_passlogs(prefix: &Path) {
    for suffix in PASSLOG_SUFFIXES {
        let mut name = prefix.as_os_str().to_os_string();
        name.push(suffix);
        let path = PathBuf::from(name);
        match fs::remove_file(&path) {
            Ok(()) => debug!(file = %path.display(), "Removed passlog"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %path.display(), error = %e, "Could not remove passlog"),
        }
    }
}

/// Runs every job through the controller on a live status display.
pub fn transcode_all(jobs: &[TranscodeJob], options: &EngineOptions) -> Result<BatchResult> {
    let mut reporter = Reporter::new(StatusNode::new("Spinning up the fans").running().into());
    reporter.start().context("Could not start the status display")?;
    thread::sleep(SPIN_UP);

    let encoder = FfmpegEncoder::new(&options.encoder_path, &options.passlog_prefix);
    let results = {
        let mut controller = SizeTargetController::new(options, encoder, &mut reporter, jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            controller.process(job, index);
        }
        controller.finish()
    };

    reporter.set_state(StatusNode::new(summary_line(&results)).completed(true).into());
    reporter.stop();
    reporter.destroy();
    Ok(results)
}

pub fn run(cli: Cli) -> Result<()> {
    let started = Instant::now();
    print_banner("Vid Target", env!("CARGO_PKG_VERSION"));

    let prepared = prepare::run(
        &cli.paths,
        cli.ffmpeg.as_deref(),
        cli.ffprobe.as_deref(),
        &cli.export_dir,
    )?;
    let mut jobs = metadata::read(&prepared.files, &prepared.tools.probe)?;

    let mut prompter = DialoguerPrompter::new();
    let (partial, notices) = prompts::from_cli(&cli);
    for notice in &notices {
        println!("{}", notice);
    }
    let answers = prompts::ask(partial, &mut prompter)?;
    prompts::fill(&mut jobs, &answers, &mut prompter)?;

    let options = EngineOptions::new(
        answers.target.bytes(),
        prepared.tools.encoder.clone(),
        prepared.tools.probe.clone(),
    )
    .with_preset(cli.preset)
    .with_export_dir(&cli.export_dir)
    .with_error_log(&cli.error_log)
    .with_overwrite_permission(cli.force);

    prepare_export_dir(&options.export_dir, options.overwrite_permission, || {
        prompts::confirm_overwrite(&mut prompter)
    })?;
    println!();

    info!(
        jobs = jobs.len(),
        target = options.target_bytes,
        preset = options.preset.as_str(),
        "Starting transcode"
    );
    let results = transcode_all(&jobs, &options);
    cleanup_passlogs(&options.passlog_prefix);
    let results = results?;

    info!(
        succeeded = results.succeeded,
        failed = results.failed,
        mean_efficiency = ?results.mean_efficiency(),
        "Transcode finished"
    );
    print_failure_line(results.failed, &options.error_log);
    print_completion_line(&options.export_dir, started.elapsed(), !cli.quiet);
    Ok(())
}
