//! Drawing surfaces for the status display.

use std::io;

use console::{measure_text_width, Term};

/// Where rendered frames go. Owned by the render thread.
pub trait Canvas: Send + 'static {
    /// Replaces the previously drawn frame with `frame`.
    fn draw(&mut self, frame: &str) -> io::Result<()>;

    /// Leaves the last frame on screen; the next `draw` starts below it.
    fn done(&mut self) -> io::Result<()>;
}

/// Rewrites the previous frame in place on stderr.
///
/// When stderr is not a terminal, intermediate frames are dropped and only
/// the frame current at `done` is written.
pub struct TerminalCanvas {
    term: Term,
    drawn_lines: usize,
    cursor_hidden: bool,
    last_frame: Option<String>,
}

impl TerminalCanvas {
    pub fn stderr() -> Self {
        Self {
            term: Term::stderr(),
            drawn_lines: 0,
            cursor_hidden: false,
            last_frame: None,
        }
    }

    /// Terminal rows `frame` occupies once soft-wrapped at `columns`.
    fn rows(frame: &str, columns: usize) -> usize {
        frame
            .split('\n')
            .map(|line| {
                let width = measure_text_width(line);
                if columns == 0 || width == 0 {
                    1
                } else {
                    width.div_ceil(columns)
                }
            })
            .sum()
    }
}

impl Canvas for TerminalCanvas {
    fn draw(&mut self, frame: &str) -> io::Result<()> {
        if !self.term.is_term() {
            self.last_frame = Some(frame.to_string());
            return Ok(());
        }

        if !self.cursor_hidden {
            self.term.hide_cursor()?;
            self.cursor_hidden = true;
        }
        if self.drawn_lines > 0 {
            self.term.clear_last_lines(self.drawn_lines)?;
        }
        self.term.write_line(frame)?;
        self.drawn_lines = Self::rows(frame, self.term.size().1 as usize);
        self.last_frame = Some(frame.to_string());
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        if !self.term.is_term() {
            if let Some(frame) = self.last_frame.take() {
                self.term.write_line(&console::strip_ansi_codes(&frame))?;
            }
            return Ok(());
        }

        self.drawn_lines = 0;
        self.last_frame = None;
        if self.cursor_hidden {
            self.term.show_cursor()?;
            self.cursor_hidden = false;
        }
        Ok(())
    }
}

impl Drop for TerminalCanvas {
    fn drop(&mut self) {
        if self.cursor_hidden {
            let _ = self.term.show_cursor();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_counts_wrapped_lines() {
        assert_eq!(TerminalCanvas::rows("one", 80), 1);
        assert_eq!(TerminalCanvas::rows("one\ntwo\n", 80), 3);
        assert_eq!(TerminalCanvas::rows(&"x".repeat(100), 40), 3);
        assert_eq!(TerminalCanvas::rows("\u{1b}[36mab\u{1b}[0m", 1), 2);
    }
}
