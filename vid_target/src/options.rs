//! Run-wide engine options.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

/// x264 speed/quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    #[default]
    Veryslow,
    Placebo,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
            Preset::Placebo => "placebo",
        }
    }
}

pub const DEFAULT_EXPORT_DIR: &str = "exports";
pub const DEFAULT_ERROR_LOG: &str = "errors.txt";
pub const DEFAULT_PASSLOG_PREFIX: &str = "ffmpeg2pass";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_OUTPUT_WAIT_LIMIT: Duration = Duration::from_secs(30);

/// Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub target_bytes: u64,
    pub preset: Preset,
    pub encoder_path: PathBuf,
    pub probe_path: PathBuf,
    pub overwrite_permission: bool,
    pub export_dir: PathBuf,
    pub error_log: PathBuf,
    pub passlog_prefix: PathBuf,
    pub output_poll_interval: Duration,
    pub output_wait_limit: Duration,
}

impl EngineOptions {
    pub fn new(target_bytes: u64, encoder_path: PathBuf, probe_path: PathBuf) -> Self {
        Self {
            target_bytes,
            preset: Preset::default(),
            encoder_path,
            probe_path,
            overwrite_permission: false,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
            passlog_prefix: PathBuf::from(DEFAULT_PASSLOG_PREFIX),
            output_poll_interval: DEFAULT_POLL_INTERVAL,
            output_wait_limit: DEFAULT_OUTPUT_WAIT_LIMIT,
        }
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = path.into();
        self
    }

    pub fn with_passlog_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.passlog_prefix = prefix.into();
        self
    }

    pub fn with_output_wait(mut self, interval: Duration, limit: Duration) -> Self {
        self.output_poll_interval = interval;
        self.output_wait_limit = limit;
        self
    }

    pub fn with_overwrite_permission(mut self, granted: bool) -> Self {
        self.overwrite_permission = granted;
        self
    }
}
