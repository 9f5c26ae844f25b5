//! Progress Reporter - 独立渲染线程
//!
//! The display is redrawn on a fixed tick by a dedicated thread, independent
//! of how busy the caller is. The caller talks to it only through one-way
//! messages; `stop` is the single round trip, waiting for the thread to
//! acknowledge that the final frame is on screen.
//!
//! ```no_run
//! use shared_utils::progress::{Reporter, StatusNode};
//!
//! let mut reporter = Reporter::new(StatusNode::new("Working").running().into());
//! reporter.start()?;
//! reporter.set_state(StatusNode::new("Done").completed(true).into());
//! reporter.stop();
//! reporter.destroy();
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::canvas::{Canvas, TerminalCanvas};
use super::status_tree::StatusTree;
use crate::modern_ui::{progress_style::FINAL_GLYPH, spinner_frame};

pub const DEFAULT_TICK: Duration = Duration::from_millis(120);

/// Caller → render thread.
#[derive(Debug)]
enum RenderMessage {
    Snapshot(StatusTree),
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    Active,
}

struct RenderThread {
    tx: Sender<RenderMessage>,
    ack_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Handle to the status display. `destroy` (or drop) ends the render thread.
pub struct Reporter {
    state: ReporterState,
    pending: StatusTree,
    tick: Duration,
    canvas: Option<Box<dyn Canvas>>,
    thread: Option<RenderThread>,
}

impl Reporter {
    /// Reporter drawing on stderr at the default tick.
    pub fn new(initial: StatusTree) -> Self {
        Self::with_canvas(initial, Box::new(TerminalCanvas::stderr()), DEFAULT_TICK)
    }

    pub fn with_canvas(initial: StatusTree, canvas: Box<dyn Canvas>, tick: Duration) -> Self {
        Self {
            state: ReporterState::Idle,
            pending: initial,
            tick,
            canvas: Some(canvas),
            thread: None,
        }
    }

    pub fn state(&self) -> ReporterState {
        self.state
    }

    /// Begins ticking, spawning the render thread on first use. No-op while
    /// already active.
    pub fn start(&mut self) -> io::Result<()> {
        if self.state == ReporterState::Active {
            return Ok(());
        }

        if self.thread.is_none() {
            self.thread = Some(self.spawn()?);
        }

        let snapshot = self.pending.clone();
        self.send(RenderMessage::Snapshot(snapshot));
        self.send(RenderMessage::Start);
        self.state = ReporterState::Active;
        Ok(())
    }

    /// Replaces the displayed tree. While idle the tree is kept and shown on
    /// the next `start`.
    pub fn set_state(&mut self, tree: StatusTree) {
        if self.state == ReporterState::Active {
            self.send(RenderMessage::Snapshot(tree.clone()));
        }
        self.pending = tree;
    }

    /// Stops ticking and blocks until the final frame has been drawn.
    /// Returns immediately when idle.
    pub fn stop(&mut self) {
        if self.state != ReporterState::Active {
            return;
        }
        self.state = ReporterState::Idle;

        let Some(thread) = self.thread.as_ref() else {
            return;
        };
        if thread.tx.send(RenderMessage::Stop).is_err() {
            warn!("Status render thread is gone; nothing to stop");
            return;
        }
        if thread.ack_rx.recv().is_err() {
            warn!("Status render thread exited without acknowledging stop");
        }
    }

    /// Stops if needed and joins the render thread.
    pub fn destroy(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            drop(thread.tx);
            if thread.handle.join().is_err() {
                warn!("Status render thread panicked");
            }
        }
    }

    fn spawn(&mut self) -> io::Result<RenderThread> {
        let canvas = match self.canvas.take() {
            Some(canvas) => canvas,
            None => Box::new(TerminalCanvas::stderr()),
        };
        let (tx, rx) = mpsc::channel();
        let (ack_tx, ack_rx) = mpsc::channel();
        let tick = self.tick;

        let handle = thread::Builder::new()
            .name("status-render".to_string())
            .spawn(move || render_loop(canvas, rx, ack_tx, tick))?;

        Ok(RenderThread { tx, ack_rx, handle })
    }

    fn send(&self, message: RenderMessage) {
        if let Some(thread) = self.thread.as_ref() {
            if thread.tx.send(message).is_err() {
                debug!("Status render thread is gone; dropping update");
            }
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop(
    mut canvas: Box<dyn Canvas>,
    rx: Receiver<RenderMessage>,
    ack_tx: Sender<()>,
    tick: Duration,
) {
    let mut tree = StatusTree::default();
    let mut active = false;
    let mut frame: u64 = 0;
    let mut next_tick = Instant::now();

    loop {
        let message = if active {
            let now = Instant::now();
            if now >= next_tick {
                draw(canvas.as_mut(), &tree.render(spinner_frame(frame)));
                frame = frame.wrapping_add(1);
                next_tick = now + tick;
                continue;
            }
            match rx.recv_timeout(next_tick - now) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            }
        };

        match message {
            RenderMessage::Snapshot(next) => tree = next,
            RenderMessage::Start => {
                if !active {
                    active = true;
                    next_tick = Instant::now();
                }
            }
            RenderMessage::Stop => {
                if active {
                    finish(canvas.as_mut(), &tree);
                    active = false;
                }
                let _ = ack_tx.send(());
            }
        }
    }

    if active {
        finish(canvas.as_mut(), &tree);
    }
}

fn draw(canvas: &mut dyn Canvas, frame: &str) {
    if let Err(e) = canvas.draw(frame) {
        debug!(error = %e, "Failed to draw status frame");
    }
}

fn finish(canvas: &mut dyn Canvas, tree: &StatusTree) {
    draw(canvas, &tree.render(FINAL_GLYPH));
    if let Err(e) = canvas.done() {
        debug!(error = %e, "Failed to finalize status display");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::StatusNode;
    use std::sync::{Arc, Mutex};

    type Events = Arc<Mutex<Vec<String>>>;

    struct RecordingCanvas {
        events: Events,
        done_delay: Duration,
    }

    impl RecordingCanvas {
        fn new(events: Events) -> Self {
            Self {
                events,
                done_delay: Duration::ZERO,
            }
        }
    }

    impl Canvas for RecordingCanvas {
        fn draw(&mut self, frame: &str) -> io::Result<()> {
            let plain = console::strip_ansi_codes(frame).to_string();
            self.events.lock().unwrap().push(format!("draw:{plain}"));
            Ok(())
        }

        fn done(&mut self) -> io::Result<()> {
            thread::sleep(self.done_delay);
            self.events.lock().unwrap().push("done".to_string());
            Ok(())
        }
    }

    fn reporter(label: &str, canvas: RecordingCanvas, tick_ms: u64) -> Reporter {
        Reporter::with_canvas(
            StatusNode::new(label).running().into(),
            Box::new(canvas),
            Duration::from_millis(tick_ms),
        )
    }

    fn draws(events: &Events) -> Vec<String> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("draw:"))
            .cloned()
            .collect()
    }

    #[test]
    fn test_ticks_without_messages() {
        let events = Events::default();
        let mut reporter = reporter("idle work", RecordingCanvas::new(events.clone()), 10);
        reporter.start().unwrap();
        thread::sleep(Duration::from_millis(150));
        reporter.stop();

        let frames = draws(&events);
        assert!(frames.len() >= 4, "expected several ticks, got {}", frames.len());
        assert!(frames[0].contains("idle work"));
        reporter.destroy();
    }

    #[test]
    fn test_frequent_updates_do_not_starve_ticks() {
        let events = Events::default();
        let mut reporter = reporter("busy", RecordingCanvas::new(events.clone()), 10);
        reporter.start().unwrap();

        let started = Instant::now();
        let mut n = 0u64;
        while started.elapsed() < Duration::from_millis(150) {
            reporter.set_state(StatusNode::new(format!("update {n}")).running().into());
            n += 1;
        }
        reporter.stop();

        assert!(draws(&events).len() >= 4);
        reporter.destroy();
    }

    #[test]
    fn test_stop_waits_for_final_frame() {
        let events = Events::default();
        let canvas = RecordingCanvas {
            events: events.clone(),
            done_delay: Duration::from_millis(200),
        };
        let mut reporter = reporter("encoding", canvas, 10);
        reporter.start().unwrap();
        reporter.set_state(StatusNode::new("finished").completed(true).into());

        let before = Instant::now();
        reporter.stop();
        assert!(before.elapsed() >= Duration::from_millis(200));
        events.lock().unwrap().push("stop returned".to_string());

        let log = events.lock().unwrap().clone();
        let done_at = log.iter().position(|e| e == "done").unwrap();
        let returned_at = log.iter().position(|e| e == "stop returned").unwrap();
        assert!(done_at < returned_at);
        assert_eq!(log[done_at - 1], "draw: ✔ finished");
        assert_eq!(reporter.state(), ReporterState::Idle);
        reporter.destroy();
    }

    #[test]
    fn test_final_frame_uses_static_glyph() {
        let events = Events::default();
        let mut reporter = reporter("spinning", RecordingCanvas::new(events.clone()), 1000);
        reporter.start().unwrap();
        reporter.stop();

        let frames = draws(&events);
        let last = frames.last().unwrap();
        assert_eq!(last, &format!("draw: {} spinning", FINAL_GLYPH));
        reporter.destroy();
    }

    #[test]
    fn test_set_state_while_idle_shows_on_next_start() {
        let events = Events::default();
        let mut reporter = reporter("first", RecordingCanvas::new(events.clone()), 1000);
        reporter.set_state(StatusNode::new("second").into());
        reporter.start().unwrap();
        reporter.stop();

        let frames = draws(&events);
        assert!(frames.iter().all(|f| !f.contains("first")));
        assert!(frames.iter().any(|f| f.contains("second")));
        reporter.destroy();
    }

    #[test]
    fn test_restart_reuses_thread() {
        let events = Events::default();
        let mut reporter = reporter("one", RecordingCanvas::new(events.clone()), 1000);
        reporter.start().unwrap();
        reporter.stop();
        reporter.set_state(StatusNode::new("two").into());
        reporter.start().unwrap();
        reporter.stop();

        let dones = events.lock().unwrap().iter().filter(|e| *e == "done").count();
        assert_eq!(dones, 2);
        assert!(draws(&events).last().unwrap().contains("two"));
        reporter.destroy();
    }

    #[test]
    fn test_stop_when_idle_returns_immediately() {
        let events = Events::default();
        let mut reporter = reporter("never started", RecordingCanvas::new(events.clone()), 10);
        reporter.stop();
        reporter.destroy();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_while_active_finishes_frame() {
        let events = Events::default();
        {
            let mut reporter = reporter("dropped", RecordingCanvas::new(events.clone()), 1000);
            reporter.start().unwrap();
        }
        assert!(events.lock().unwrap().iter().any(|e| e == "done"));
    }
}
