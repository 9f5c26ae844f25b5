//! Encoder process management - 编码进程管理
//!
//! The encoder writes its `-stats` progress to stderr, terminating each
//! update with `\r` rather than `\n`. A dedicated thread consumes the stream
//! (so the pipe buffer never fills), splits it on both terminators, turns
//! progress records into fractions and forwards them over a channel. The
//! caller drains the channel on its own thread, invoking its progress
//! callback, and then waits for the exit status.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::{EncoderProcess, ProgressParser};
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.args(["-stats", "-i", "in.mkv", "out.mp4"]);
//!
//! let process = EncoderProcess::spawn(&mut cmd, ProgressParser::new(Some(1440), None))?;
//! for fraction in process.progress() {
//!     println!("{:.1}%", fraction * 100.0);
//! }
//! let (status, tail) = process.wait_with_output()?;
//! ```

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info};

use crate::errors::{EngineError, Result};
use crate::logging::log_external_tool;

/// Diagnostic lines kept for error reporting.
const TAIL_LINES: usize = 40;

// ═══════════════════════════════════════════════════════════════
// EncoderProcess - 防死锁的编码进程包装器
// ═══════════════════════════════════════════════════════════════

/// A running encoder with its diagnostic stream consumed off-thread.
pub struct EncoderProcess {
    child: Child,
    tool_name: String,
    command: Vec<String>,
    started: Instant,
    progress_rx: Receiver<f64>,
    stderr_thread: Option<JoinHandle<String>>,
}

impl EncoderProcess {
    /// Spawns `cmd` with stdin and stdout detached and stderr piped.
    pub fn spawn(cmd: &mut Command, parser: ProgressParser) -> Result<Self> {
        let tool_name = cmd.get_program().to_string_lossy().to_string();
        let command: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        info!(tool = %tool_name, args = ?command, "Spawning encoder");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            EngineError::EncoderError(format!("failed to spawn {}: {}", tool_name, e))
        })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::EncoderError("failed to capture stderr".to_string()))?;

        let (tx, progress_rx) = mpsc::channel();
        let stderr_thread = thread::spawn(move || consume_diagnostics(stderr, parser, tx));

        Ok(Self {
            child,
            tool_name,
            command,
            started: Instant::now(),
            progress_rx,
            stderr_thread: Some(stderr_thread),
        })
    }

    /// Progress fractions in `[0, 1]`; the iterator ends when the process
    /// closes its diagnostic stream.
    pub fn progress(&self) -> mpsc::Iter<'_, f64> {
        self.progress_rx.iter()
    }

    /// Waits for exit. Returns the status and the last diagnostic lines.
    pub fn wait_with_output(mut self) -> Result<(ExitStatus, String)> {
        let status = self.child.wait()?;
        let tail = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        log_external_tool(
            &self.tool_name,
            &self.command,
            &tail,
            status.code(),
            self.started.elapsed(),
        );

        Ok((status, tail))
    }
}

/// Runs one encoder invocation to completion, reporting progress fractions.
///
/// Fails with [`EngineError::EncoderExit`] on a non-zero exit.
pub fn run_encoder_pass(
    mut cmd: Command,
    parser: ProgressParser,
    on_progress: &mut dyn FnMut(f64),
) -> Result<()> {
    let process = EncoderProcess::spawn(&mut cmd, parser)?;
    for fraction in process.progress() {
        on_progress(fraction);
    }

    let (status, tail) = process.wait_with_output()?;
    if status.success() {
        return Ok(());
    }

    let mut message = format_ffmpeg_error(&tail);
    if let Some(hint) = get_error_suggestion(&tail) {
        message.push_str(" (");
        message.push_str(hint);
        message.push(')');
    }
    Err(EngineError::EncoderExit {
        code: status.code(),
        message,
    })
}

fn consume_diagnostics<R: Read>(stream: R, mut parser: ProgressParser, tx: Sender<f64>) -> String {
    let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
    let reader = BufReader::new(stream);

    for chunk in reader.split(b'\r') {
        let Ok(chunk) = chunk else { break };
        for raw in chunk.split(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(fraction) = parser.parse_line(line) {
                // receiver gone means the caller stopped listening; keep draining
                let _ = tx.send(fraction);
                continue;
            }

            if tail.len() == TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }
    }

    debug!(lines = tail.len(), "Encoder diagnostic stream closed");
    tail.into_iter().collect::<Vec<_>>().join("\n")
}

// ═══════════════════════════════════════════════════════════════
// ProgressParser - 统一的进度解析器
// ═══════════════════════════════════════════════════════════════

/// Extracts the frame count from a `-stats` record such as
/// `frame=  123 fps= 24 q=28.0 size=...`.
pub fn parse_frame_count(line: &str) -> Option<u64> {
    let value = field_value(line, "frame=")?;
    value.parse().ok()
}

fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let start = line.find(key)? + key.len();
    let rest = line[start..].trim_start();
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let value = &rest[..end];
    (!value.is_empty()).then_some(value)
}

/// 进度解析器: frame count against the expected total, with output time
/// against the expected duration as a fallback.
#[derive(Debug, Clone)]
pub struct ProgressParser {
    total_frames: Option<u64>,
    total_duration: Option<f64>,
    current_frame: u64,
    current_time: f64,
}

impl ProgressParser {
    pub fn new(total_frames: Option<u64>, total_duration: Option<f64>) -> Self {
        Self {
            total_frames,
            total_duration,
            current_frame: 0,
            current_time: 0.0,
        }
    }

    /// Progress fraction for a progress record, `None` for anything else.
    pub fn parse_line(&mut self, line: &str) -> Option<f64> {
        let frame = parse_frame_count(line);
        let time = field_value(line, "time=").and_then(Self::parse_time);
        if frame.is_none() && time.is_none() {
            return None;
        }

        if let Some(frame) = frame {
            self.current_frame = frame;
        }
        if let Some(time) = time {
            self.current_time = time;
        }
        Some(self.calculate_progress())
    }

    /// 解析时间字符串 (HH:MM:SS.ms)
    fn parse_time(time_str: &str) -> Option<f64> {
        let parts: Vec<&str> = time_str.split(':').collect();
        if parts.len() != 3 {
            return None;
        }

        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;

        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    }

    fn calculate_progress(&self) -> f64 {
        if let Some(total) = self.total_frames.filter(|t| *t > 0) {
            return (self.current_frame as f64 / total as f64).min(1.0);
        }
        if let Some(total) = self.total_duration.filter(|t| *t > 0.0) {
            return (self.current_time / total).min(1.0);
        }
        0.0
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }
}

// ═══════════════════════════════════════════════════════════════
// 错误格式化
// ═══════════════════════════════════════════════════════════════

/// Picks the most useful line out of the encoder's diagnostic output.
///
/// 1. the last line mentioning "Error"/"error"
/// 2. otherwise the last non-progress line
/// 3. otherwise "Unknown FFmpeg error"
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// Hints for common failure patterns.
pub fn get_error_suggestion(stderr: &str) -> Option<&'static str> {
    let patterns = [
        ("No such file or directory", "check that the input path exists"),
        ("Invalid data found", "the input file may be corrupt"),
        ("Unknown encoder 'libx264'", "this ffmpeg build lacks libx264"),
        ("Unknown encoder 'aac'", "this ffmpeg build lacks the aac encoder"),
        ("Permission denied", "check read/write permissions"),
        ("moov atom not found", "the input MP4 is incomplete"),
        ("Too many packets buffered", "the input has badly interleaved streams"),
    ];

    patterns
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, hint)| *hint)
}
