//! Size-targeting controller.
//!
//! Drives each job through at most [`MAX_ATTEMPTS`] two-pass encodes,
//! shrinking both bitrates by the correction factor whenever the output
//! comes out larger than the target. Every failure stays inside the job:
//! it is logged, counted, and the batch moves on.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use shared_utils::{AttemptGuard, BatchResult, EngineError, Reporter};
use tracing::{error, info, warn};

use super::encoder::{EncodeRequest, Encoder, Pass, PassProgress};
use super::error_log::ErrorLog;
use super::params::{derive_parameters, EncodeParameters};
use super::status::{status_tree, BoardView, EncodeDetails, StatusUpdate};
use crate::job::TranscodeJob;
use crate::options::EngineOptions;

pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    TooLarge,
    Accepted,
}

/// One encode of a job and what came out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-based.
    pub attempt: u32,
    pub video_bitrate: f64,
    pub audio_bitrate: f64,
    pub output_size: Option<u64>,
    pub outcome: Option<AttemptOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success {
        /// `output_size / target`, unclamped.
        efficiency: f64,
        output_size: u64,
        attempts: Vec<AttemptRecord>,
    },
    Failure {
        reason: String,
        attempts: Vec<AttemptRecord>,
    },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            JobOutcome::Success { attempts, .. } | JobOutcome::Failure { attempts, .. } => attempts,
        }
    }
}

pub struct SizeTargetController<'a, E: Encoder> {
    options: &'a EngineOptions,
    encoder: E,
    reporter: &'a mut Reporter,
    error_log: ErrorLog,
    results: BatchResult,
    job_count: usize,
}

impl<'a, E: Encoder> SizeTargetController<'a, E> {
    pub fn new(
        options: &'a EngineOptions,
        encoder: E,
        reporter: &'a mut Reporter,
        job_count: usize,
    ) -> Self {
        Self {
            options,
            encoder,
            reporter,
            error_log: ErrorLog::new(&options.error_log),
            results: BatchResult::new(),
            job_count,
        }
    }

    /// Processes one job. Never fails: errors become [`JobOutcome::Failure`]
    /// plus a line in the error log.
    pub fn process(&mut self, job: &TranscodeJob, job_index: usize) -> JobOutcome {
        let file_name = job.file_name();
        info!(file = %file_name, job = job_index + 1, of = self.job_count, "Processing job");
        self.show(&file_name, job_index, &StatusUpdate::Computing);

        let mut attempts = Vec::new();
        match self.run_attempts(job, job_index, &mut attempts) {
            Ok(output_size) => {
                let efficiency = output_size as f64 / self.options.target_bytes as f64;
                info!(
                    file = %file_name,
                    output_size,
                    efficiency,
                    attempts = attempts.len(),
                    "Target met"
                );
                self.results.success(efficiency);
                JobOutcome::Success {
                    efficiency,
                    output_size,
                    attempts,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                error!(file = %file_name, error = %reason, "Job failed");
                self.error_log.append(&job.source_path, &reason);
                self.results.fail();
                JobOutcome::Failure { reason, attempts }
            }
        }
    }

    pub fn results(&self) -> &BatchResult {
        &self.results
    }

    pub fn finish(self) -> BatchResult {
        self.results
    }

    fn run_attempts(
        &mut self,
        job: &TranscodeJob,
        job_index: usize,
        records: &mut Vec<AttemptRecord>,
    ) -> Result<u64, EngineError> {
        let target = self.options.target_bytes;
        let mut params = derive_parameters(job, target, self.options.preset)?;
        let output = job.output_path(&self.options.export_dir);
        let file_name = job.file_name();

        let mut guard = AttemptGuard::new(MAX_ATTEMPTS, &file_name);
        let mut correction: Option<u32> = None;
        let mut last_size = 0;

        loop {
            let attempt = match guard.increment() {
                Ok(n) => n,
                Err(_) => {
                    warn!(file = %file_name, last_size, target, "Giving up on size target");
                    return Err(EngineError::AttemptsExhausted {
                        attempts: guard.max(),
                        last_size,
                        target,
                        output,
                    });
                }
            };

            records.push(AttemptRecord {
                attempt,
                video_bitrate: params.video_bitrate,
                audio_bitrate: params.audio_bitrate,
                output_size: None,
                outcome: None,
            });

            self.encode_attempt(job, job_index, &params, correction)?;
            let size = wait_for_output(
                &output,
                self.options.output_poll_interval,
                self.options.output_wait_limit,
            )?;
            last_size = size;

            let accepted = size <= target;
            if let Some(record) = records.last_mut() {
                record.output_size = Some(size);
                record.outcome = Some(if accepted {
                    AttemptOutcome::Accepted
                } else {
                    AttemptOutcome::TooLarge
                });
            }
            if accepted {
                return Ok(size);
            }

            warn!(file = %file_name, attempt, size, target, "Output too large, correcting bitrates");
            params.apply_correction();
            correction = Some(attempt + 1);
        }
    }

    fn encode_attempt(
        &mut self,
        job: &TranscodeJob,
        job_index: usize,
        params: &EncodeParameters,
        correction: Option<u32>,
    ) -> Result<(), EngineError> {
        let output = job.output_path(&self.options.export_dir);
        let request = EncodeRequest {
            source: &job.source_path,
            output: &output,
            params,
        };
        let details = EncodeDetails::from(params);
        let file_name = job.file_name();
        let view = BoardView {
            file_name: &file_name,
            job_index,
            job_count: self.job_count,
            failed: self.results.failed,
        };

        let reporter = &mut *self.reporter;
        let mut push = |progress: PassProgress| {
            let update = StatusUpdate::encoding(details.clone(), progress, correction);
            reporter.set_state(status_tree(&view, &update));
        };
        push(PassProgress {
            pass: Pass::First,
            fraction: 0.0,
        });
        self.encoder.encode(&request, &mut push)
    }

    fn show(&mut self, file_name: &str, job_index: usize, update: &StatusUpdate) {
        let view = BoardView {
            file_name,
            job_index,
            job_count: self.job_count,
            failed: self.results.failed,
        };
        self.reporter.set_state(status_tree(&view, update));
    }
}

/// Polls until `path` exists, then returns its size.
pub fn wait_for_output(path: &Path, interval: Duration, limit: Duration) -> Result<u64, EngineError> {
    let started = Instant::now();
    loop {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => return Ok(meta.len()),
            Ok(_) => return Err(EngineError::OutputMissing(path.to_path_buf())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if started.elapsed() >= limit {
            return Err(EngineError::OutputMissing(path.to_path_buf()));
        }
        thread::sleep(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::params::fixtures::probe;
    use crate::job::TrimPoint;
    use shared_utils::{Canvas, StatusTree};
    use std::fs::File;
    use std::io;
    use tempfile::TempDir;

    struct NullCanvas;

    impl Canvas for NullCanvas {
        fn draw(&mut self, _frame: &str) -> io::Result<()> {
            Ok(())
        }

        fn done(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn reporter() -> Reporter {
        Reporter::with_canvas(
            StatusTree::default(),
            Box::new(NullCanvas),
            Duration::from_millis(10),
        )
    }

    /// Writes an output of `(video + audio) * duration / 8 * overshoot` bytes.
    struct FakeEncoder {
        overshoot: f64,
        write_output: bool,
        calls: Vec<(f64, f64)>,
    }

    impl FakeEncoder {
        fn new(overshoot: f64) -> Self {
            Self {
                overshoot,
                write_output: true,
                calls: Vec::new(),
            }
        }
    }

    impl Encoder for &mut FakeEncoder {
        fn encode(
            &mut self,
            request: &EncodeRequest<'_>,
            progress: &mut dyn FnMut(PassProgress),
        ) -> Result<(), EngineError> {
            let p = request.params;
            self.calls.push((p.video_bitrate, p.audio_bitrate));
            for pass in [Pass::First, Pass::Second] {
                progress(PassProgress { pass, fraction: 0.5 });
            }
            if self.write_output {
                let size = (p.video_bitrate + p.audio_bitrate) * p.duration / 8.0 * self.overshoot;
                File::create(request.output)?.set_len(size as u64)?;
            }
            Ok(())
        }
    }

    fn options(dir: &TempDir) -> EngineOptions {
        EngineOptions::new(8_000_000, "ffmpeg".into(), "ffprobe".into())
            .with_export_dir(dir.path().join("exports"))
            .with_error_log(dir.path().join("errors.txt"))
            .with_output_wait(Duration::from_millis(5), Duration::from_millis(50))
    }

    fn job(name: &str) -> TranscodeJob {
        TranscodeJob::new(format!("/videos/{name}"), probe(&[(1080, "30/1")], 1, 60.0))
    }

    fn log_lines(options: &EngineOptions) -> usize {
        std::fs::read_to_string(&options.error_log)
            .map(|c| c.lines().count())
            .unwrap_or(0)
    }

    #[test]
    fn test_success_after_correction() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        std::fs::create_dir_all(&options.export_dir).unwrap();
        let mut fake = FakeEncoder::new(1.1);
        let mut reporter = reporter();

        let outcome = {
            let mut controller = SizeTargetController::new(&options, &mut fake, &mut reporter, 1);
            let outcome = controller.process(&job("a.mkv"), 0);
            assert_eq!(controller.results().succeeded, 1);
            outcome
        };

        let JobOutcome::Success {
            efficiency,
            output_size,
            attempts,
        } = outcome
        else {
            panic!("expected success");
        };
        assert!(output_size <= 8_000_000);
        assert!(efficiency <= 1.0 && efficiency > 0.95);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].outcome, Some(AttemptOutcome::TooLarge));
        assert_eq!(attempts[1].outcome, Some(AttemptOutcome::Accepted));

        assert_eq!(fake.calls.len(), 2);
        let (v1, a1) = fake.calls[0];
        let (v2, a2) = fake.calls[1];
        assert!((v1 - 949_333.33).abs() < 0.01);
        assert_eq!(a1, 64_000.0);
        assert!((v2 - v1 * 0.95).abs() < 1e-6);
        assert!((a2 - a1 * 0.95).abs() < 1e-6);
        assert_eq!(log_lines(&options), 0);
    }

    #[test]
    fn test_attempts_exhausted() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        std::fs::create_dir_all(&options.export_dir).unwrap();
        let mut fake = FakeEncoder::new(2.0);
        let mut reporter = reporter();

        let mut controller = SizeTargetController::new(&options, &mut fake, &mut reporter, 1);
        let outcome = controller.process(&job("a.mkv"), 0);
        let results = controller.finish();

        assert!(!outcome.is_success());
        assert_eq!(outcome.attempts().len(), 3);
        assert!(outcome
            .attempts()
            .iter()
            .all(|a| a.outcome == Some(AttemptOutcome::TooLarge)));
        assert_eq!(results.failed, 1);
        assert_eq!(fake.calls.len(), 3);
        assert_eq!(log_lines(&options), 1);

        let output = options.export_dir.join("a.mp4");
        assert!(output.exists());
        let log = std::fs::read_to_string(&options.error_log).unwrap();
        assert!(log.contains(&format!("oversized output kept at {}", output.display())));
    }

    #[test]
    fn test_batch_isolation() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        std::fs::create_dir_all(&options.export_dir).unwrap();
        let mut fake = FakeEncoder::new(0.98);
        let mut reporter = reporter();

        let jobs = vec![
            job("one.mkv"),
            TranscodeJob::new("/videos/two.mkv", probe(&[], 2, 60.0)),
            job("three.mkv"),
        ];
        let mut controller = SizeTargetController::new(&options, &mut fake, &mut reporter, 3);
        let outcomes: Vec<JobOutcome> = jobs
            .iter()
            .enumerate()
            .map(|(i, job)| controller.process(job, i))
            .collect();
        let results = controller.finish();

        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[2].is_success());
        assert_eq!(results.succeeded, 2);
        assert_eq!(results.failed, 1);
        assert!(results.mean_efficiency().is_some());

        let log = std::fs::read_to_string(&options.error_log).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("two.mkv"));
        assert!(dir.path().join("exports/one.mp4").exists());
        assert!(dir.path().join("exports/three.mp4").exists());
    }

    #[test]
    fn test_non_positive_duration_never_encoded() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        let mut fake = FakeEncoder::new(1.0);
        let mut reporter = reporter();

        let mut bad = job("a.mkv");
        bad.trim_start = Some(TrimPoint::At(30.0));
        bad.trim_end = Some(TrimPoint::At(30.0));

        let mut controller = SizeTargetController::new(&options, &mut fake, &mut reporter, 1);
        let outcome = controller.process(&bad, 0);
        drop(controller);

        match outcome {
            JobOutcome::Failure { reason, attempts } => {
                assert!(reason.contains("Invalid duration"));
                assert!(attempts.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(fake.calls.is_empty());
        assert_eq!(log_lines(&options), 1);
    }

    #[test]
    fn test_missing_output_fails_job() {
        let dir = TempDir::new().unwrap();
        let options = options(&dir);
        let mut fake = FakeEncoder::new(1.0);
        fake.write_output = false;
        let mut reporter = reporter();

        let mut controller = SizeTargetController::new(&options, &mut fake, &mut reporter, 1);
        let outcome = controller.process(&job("a.mkv"), 0);
        match outcome {
            JobOutcome::Failure { reason, attempts } => {
                assert!(reason.contains("Output did not appear"));
                assert_eq!(attempts.len(), 1);
                assert_eq!(attempts[0].output_size, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wait_for_output_sees_late_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.mp4");
        let writer = {
            let path = path.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                std::fs::write(path, b"1234").unwrap();
            })
        };
        let size = wait_for_output(&path, Duration::from_millis(5), Duration::from_secs(5)).unwrap();
        writer.join().unwrap();
        assert_eq!(size, 4);
    }
}
