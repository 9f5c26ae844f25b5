//! 终端颜色支持模块
//!
//! `console` styles shared by the status display and the summary output.
//! Colour is decided by `console` (TTY detection, `CLICOLOR`), and can be
//! forced with [`force_colors`].

use console::{style, Style};

pub fn success() -> Style {
    Style::new().green().bold()
}

pub fn error() -> Style {
    Style::new().red().bold()
}

pub fn warning() -> Style {
    Style::new().yellow()
}

/// 橙色 (256-colour palette)
pub fn orange() -> Style {
    Style::new().color256(208)
}

pub fn info() -> Style {
    Style::new().cyan()
}

pub fn dim() -> Style {
    Style::new().dim()
}

/// Forces ANSI colours on both streams regardless of TTY detection.
pub fn force_colors() {
    console::set_colors_enabled(true);
    console::set_colors_enabled_stderr(true);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("❌").red(), style(msg).red().bold());
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("⚠️").yellow(), style(msg).yellow());
}
