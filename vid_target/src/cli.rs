use std::path::PathBuf;

use clap::Parser;

use crate::options::{Preset, DEFAULT_ERROR_LOG, DEFAULT_EXPORT_DIR};

const AFTER_HELP: &str = "\
Compresses every given file to fit under a size target.
Directories are scanned recursively for video files; with no paths the
current directory is used. Sizes are base-10: 1000MB = 1GB.

Examples:
  vid-target --target 40000 --resolution 720 --framerate 30 --start 30 --end 00:01:00 videos/
  vid-target -t 16.5MB --no-resolution --framerate 45 -s 5 -e 25 clips/ other.mp4";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "vid-target")]
#[command(version, about = "Batch video transcoder that hits an exact output size", long_about = None)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Files or directories to transcode
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Force colored output
    #[arg(short = 'c', long)]
    pub colour: bool,

    /// Overwrite the export directory without asking
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Don't ring the terminal bell when done
    #[arg(long)]
    pub quiet: bool,

    /// x264 preset
    #[arg(short, long, value_enum, default_value_t = Preset::Veryslow)]
    pub preset: Preset,

    /// Output size target, e.g. 8MB or 40000
    #[arg(short, long, value_name = "SIZE")]
    pub target: Option<String>,

    /// Vertical output resolution for all files
    #[arg(short, long, value_name = "LINES")]
    pub resolution: Option<String>,

    /// Keep the native resolution without asking
    #[arg(long, conflicts_with = "resolution")]
    pub no_resolution: bool,

    /// Output framerate for all files
    #[arg(short, long, value_name = "FPS")]
    pub framerate: Option<String>,

    /// Keep the native framerate without asking
    #[arg(long, conflicts_with = "framerate")]
    pub no_framerate: bool,

    /// Start time for all files (HH:MM:SS.ms, seconds or auto)
    #[arg(short, long, value_name = "TIME")]
    pub start: Option<String>,

    #[arg(long, conflicts_with = "start")]
    pub no_start: bool,

    /// End time for all files (HH:MM:SS.ms, seconds or auto)
    #[arg(short, long, value_name = "TIME")]
    pub end: Option<String>,

    #[arg(long, conflicts_with = "end")]
    pub no_end: bool,

    /// Full path to the ffmpeg binary
    #[arg(long, value_name = "PATH")]
    pub ffmpeg: Option<PathBuf>,

    /// Full path to the ffprobe binary
    #[arg(long, value_name = "PATH")]
    pub ffprobe: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_EXPORT_DIR)]
    pub export_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_ERROR_LOG)]
    pub error_log: PathBuf,

    /// Also log to stderr
    #[arg(short, long)]
    pub verbose: bool,
}
