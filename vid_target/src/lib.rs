//! vid-target - Size-Targeted Batch Transcoder
//!
//! Transcodes video files to H.264/AAC MP4 so that each output lands just
//! under a file-size target:
//! - bitrate budget derived from the target and the (trimmed) duration
//! - two-pass x264 encode, retried with smaller bitrates while too large
//! - live status display on its own render thread
//!
//! ## Engine
//! ```rust,ignore
//! use vid_target::engine::{FfmpegEncoder, SizeTargetController};
//! use vid_target::options::EngineOptions;
//!
//! let options = EngineOptions::new(8_000_000, "ffmpeg".into(), "ffprobe".into());
//! let encoder = FfmpegEncoder::new(&options.encoder_path, &options.passlog_prefix);
//! let mut controller = SizeTargetController::new(&options, encoder, &mut reporter, jobs.len());
//! for (i, job) in jobs.iter().enumerate() {
//!     controller.process(job, i);
//! }
//! ```

pub mod cli;
pub mod engine;
pub mod job;
pub mod metadata;
pub mod options;
pub mod prepare;
pub mod prompts;
pub mod transcode;

pub use engine::{JobOutcome, SizeTargetController};
pub use job::{TranscodeJob, TrimPoint};
pub use options::{EngineOptions, Preset};
