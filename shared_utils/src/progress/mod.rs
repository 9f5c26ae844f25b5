//! Live status display: status trees, drawing surfaces and the Reporter.

pub mod canvas;
pub mod reporter;
pub mod status_tree;

pub use canvas::{Canvas, TerminalCanvas};
pub use reporter::{Reporter, ReporterState, DEFAULT_TICK};
pub use status_tree::{StatusNode, StatusTree};
