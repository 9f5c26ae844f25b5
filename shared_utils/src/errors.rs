use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single transcode job.
///
/// Every variant is job-scoped: the batch controller records it and moves on
/// to the next file.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No video stream found in {0}")]
    NoVideoStream(String),

    #[error("Invalid framerate: {0:?}")]
    InvalidFramerate(String),

    #[error("Invalid duration {0:.3}s (trim end must be after trim start)")]
    InvalidDuration(f64),

    #[error("FFprobe failed: {0}")]
    ProbeError(String),

    #[error("Encoder failed: {0}")]
    EncoderError(String),

    #[error("Encoder exited with {code:?}: {message}")]
    EncoderExit { code: Option<i32>, message: String },

    #[error("Output did not appear: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("File remained too large after {attempts} attempts (last {last_size} bytes, target {target} bytes); oversized output kept at {}", .output.display())]
    AttemptsExhausted {
        attempts: u32,
        last_size: u64,
        target: u64,
        output: PathBuf,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
