//! Shared Utilities for the vid-target tools
//!
//! This crate provides the plumbing the transcoder is built on:
//! - Unified logging (tracing + rolling log file)
//! - Engine error taxonomy
//! - Encoder process wrapper with concurrent diagnostic-stream consumption
//! - FFprobe JSON model
//! - Status tree + Progress Reporter (render thread, snapshot messages)
//! - Batch accounting and summary reporting
//! - Type-safe file sizes (base-10 parsing)
//! - Terminal styling helpers

pub mod batch;
pub mod colors;
pub mod errors;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod modern_ui;
pub mod progress;
pub mod report;
pub mod tools;
pub mod types;

pub use batch::{collect_files, BatchResult, SUPPORTED_VIDEO_EXTENSIONS};
pub use errors::{EngineError, Result};
pub use ffmpeg_process::{
    format_ffmpeg_error, parse_frame_count, run_encoder_pass, EncoderProcess, ProgressParser,
};
pub use ffprobe::{parse_frame_rate, probe_media, ProbeError, ProbeFormat, ProbeOutput, ProbeStream};
pub use progress::{Canvas, Reporter, ReporterState, StatusNode, StatusTree, TerminalCanvas};
pub use report::{format_accuracy, print_failure_line, summary_line};
pub use tools::{locate_tool, ToolError};
pub use types::{AttemptGuard, FileSize, SizeParseError};
