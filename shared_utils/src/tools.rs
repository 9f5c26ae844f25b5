//! External tool lookup.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ToolError {
    #[error("The path provided for {name} does not exist: {}", .path.display())]
    MissingPath { name: String, path: PathBuf },

    #[error("Could not detect {name} on PATH")]
    NotOnPath { name: String },
}

/// Resolves a tool: an explicit path must exist, otherwise `name` is looked
/// up on `PATH`.
pub fn locate_tool(name: &str, explicit: Option<&Path>) -> Result<PathBuf, ToolError> {
    match explicit {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(ToolError::MissingPath {
            name: name.to_string(),
            path: path.to_path_buf(),
        }),
        None => which::which(name).map_err(|_| ToolError::NotOnPath {
            name: name.to_string(),
        }),
    }
}
