//! Report Module
//!
//! End-of-run summary lines and the start banner.

use std::path::Path;
use std::time::Duration;

use console::{pad_str, style, Alignment, Term};

use crate::batch::BatchResult;
use crate::colors;
use crate::modern_ui::symbols;

const BANNER_WIDTH: usize = 50;

/// ` - Compression accuracy: ~NN%`, or nothing when no job succeeded.
pub fn format_accuracy(mean_efficiency: Option<f64>) -> String {
    match mean_efficiency {
        Some(mean) => format!(" - Compression accuracy: ~{}%", (mean * 100.0).round() as i64),
        None => String::new(),
    }
}

/// Label of the final status tree.
pub fn summary_line(result: &BatchResult) -> String {
    format!(
        "Transcode complete{}",
        format_accuracy(result.mean_efficiency())
    )
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

pub fn failure_line(failed: usize, error_log: &Path) -> String {
    format!(
        "  {} {} file{} failed. {}",
        style(symbols::CROSS).red(),
        failed,
        if failed > 1 { "s" } else { "" },
        colors::orange().apply_to(error_log.display())
    )
}

pub fn print_failure_line(failed: usize, error_log: &Path) {
    if failed > 0 {
        println!("{}", failure_line(failed, error_log));
    }
}

pub fn print_completion_line(export_dir: &Path, elapsed: Duration, bell: bool) {
    let folder = export_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| export_dir.display().to_string());

    println!(
        "  {}{}{} {}{}",
        colors::success().apply_to(format!(
            "{} Your brand new video files are in the ",
            symbols::TICK
        )),
        colors::orange().apply_to(folder),
        colors::success().apply_to(" folder!"),
        colors::dim().apply_to(format!("({})", format_duration(elapsed))),
        if bell { "\x07" } else { "" }
    );
}

/// Clears the terminal (when attached to one) and prints the centred banner.
pub fn print_banner(name: &str, version: &str) {
    let term = Term::stdout();
    if term.is_term() {
        let _ = term.clear_screen();
    }
    let title = format!("{} v{}", name, version);
    println!(
        "{}\n",
        style(pad_str(&title, BANNER_WIDTH, Alignment::Center, None)).bold()
    );
}
