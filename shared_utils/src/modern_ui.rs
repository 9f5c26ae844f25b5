//! 现代化 UI 模块
//!
//! Glyphs, spinner frames and the text progress bar used by the live
//! status display.

use console::style;

/// Unicode 符号
pub mod symbols {
    pub const TICK: &str = "✔";
    pub const CROSS: &str = "✖";
    pub const POINTER: &str = "❯";
    pub const WARNING: &str = "⚠";
    pub const HAMBURGER: &str = "☰";
    pub const BULLET: &str = "•";
}

pub mod progress_style {
    /// Spinner 字符序列 - Braille 点阵
    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
    /// indicatif 进度条字符 (filled, head, blank); all one column wide.
    pub const PROGRESS_CHARS: &str = "█▓░";
    /// Shown in place of the spinner once rendering has stopped.
    pub const FINAL_GLYPH: &str = super::symbols::BULLET;
    pub const BAR_WIDTH: usize = 25;
}

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner frame for tick number `tick`.
pub fn spinner_frame(tick: u64) -> &'static str {
    SPINNER_FRAMES[(tick % SPINNER_FRAMES.len() as u64) as usize]
}

/// `|☰☰☰☰      | 40%` with the filled part in cyan. `progress` is clamped to
/// `[0, 1]`; cells are floored, the percentage rounded.
pub fn render_progress_bar(progress: f64, width: usize) -> String {
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    let filled = (progress * width as f64).floor() as usize;
    let blank = width.saturating_sub(filled);

    format!(
        "|{}{}| {}%",
        style(symbols::HAMBURGER.repeat(filled)).cyan(),
        " ".repeat(blank),
        (progress * 100.0).round() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(spinner_frame(0), "⠋");
        assert_eq!(spinner_frame(9), "⠏");
        assert_eq!(spinner_frame(10), "⠋");
        assert_eq!(
            progress_style::SPINNER_CHARS.chars().count(),
            SPINNER_FRAMES.len()
        );
    }

    #[test]
    fn test_progress_bar_cells() {
        let bar = console::strip_ansi_codes(&render_progress_bar(0.4, 10)).to_string();
        assert_eq!(bar, "|☰☰☰☰      | 40%");

        let empty = console::strip_ansi_codes(&render_progress_bar(0.0, 4)).to_string();
        assert_eq!(empty, "|    | 0%");
    }

    #[test]
    fn test_progress_bar_clamps() {
        let over = console::strip_ansi_codes(&render_progress_bar(1.7, 4)).to_string();
        assert_eq!(over, "|☰☰☰☰| 100%");
        let nan = console::strip_ansi_codes(&render_progress_bar(f64::NAN, 4)).to_string();
        assert_eq!(nan, "|    | 0%");
    }
}
