//! Tool verification and input discovery.

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{bail, Context, Result};
use shared_utils::{
    collect_files, locate_tool, Reporter, StatusNode, StatusTree, ToolError,
    SUPPORTED_VIDEO_EXTENSIONS,
};
use tracing::{error, info};

use crate::options::DEFAULT_EXPORT_DIR;

pub const ENCODER_NAME: &str = "ffmpeg";
pub const PROBE_NAME: &str = "ffprobe";

#[derive(Debug, Clone, PartialEq)]
pub struct Tools {
    pub encoder: PathBuf,
    pub probe: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Prepared {
    pub tools: Tools,
    pub files: Vec<PathBuf>,
}

/// Both binaries must resolve.
pub fn locate_tools(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Result<Tools, ToolError> {
    Ok(Tools {
        encoder: locate_tool(ENCODER_NAME, ffmpeg)?,
        probe: locate_tool(PROBE_NAME, ffprobe)?,
    })
}

/// Walks `paths` (the current directory when empty), leaving out anything
/// under the export directory of each walked root.
pub fn discover(
    paths: &[PathBuf],
    export_dir: &Path,
    on_progress: impl FnMut(usize),
) -> Result<Vec<PathBuf>> {
    let inputs = if paths.is_empty() {
        vec![std::env::current_dir().context("Could not read the current directory")?]
    } else {
        paths.to_vec()
    };
    let excluded = export_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string());

    Ok(collect_files(
        &inputs,
        SUPPORTED_VIDEO_EXTENSIONS,
        &excluded,
        on_progress,
    ))
}

fn board(root: StatusNode, tools: StatusNode, files: StatusNode) -> StatusTree {
    root.with_child(tools).with_child(files).into()
}

fn found(count: usize) -> String {
    format!("Found {} files", count)
}

/// Runs the tool check next to file discovery, showing both on a status tree.
/// Missing tools or no input files abort the run.
pub fn run(
    paths: &[PathBuf],
    ffmpeg: Option<&Path>,
    ffprobe: Option<&Path>,
    export_dir: &Path,
) -> Result<Prepared> {
    let root = StatusNode::new("Getting some things ready").running();
    let verifying = StatusNode::new("Verifying FFmpeg installation").running();

    let mut reporter = Reporter::new(board(
        root.clone(),
        verifying.clone(),
        StatusNode::new(found(0)).running(),
    ));
    reporter.start().context("Could not start the status display")?;

    let (tools, files) = thread::scope(|scope| {
        let lookup = scope.spawn(|| locate_tools(ffmpeg, ffprobe));
        let files = discover(paths, export_dir, |count| {
            reporter.set_state(board(
                root.clone(),
                verifying.clone(),
                StatusNode::new(found(count)).running(),
            ));
        });
        let tools = lookup
            .join()
            .unwrap_or_else(|_| Err(ToolError::NotOnPath { name: ENCODER_NAME.to_string() }));
        (tools, files)
    });

    let tools_task = match &tools {
        Ok(_) => StatusNode::new("FFmpeg is installed").completed(true),
        Err(_) => StatusNode::new("Unable to locate the FFmpeg binaries").completed(false),
    };
    let files_task = match &files {
        Ok(files) => StatusNode::new(found(files.len())).completed(true),
        Err(_) => StatusNode::new("Could not scan for files").completed(false),
    };

    let outcome = tools
        .map_err(anyhow::Error::new)
        .and_then(|tools| files.map(|files| (tools, files)));
    let (tools, files) = match outcome {
        Ok(prepared) => prepared,
        Err(err) => {
            reporter.set_state(board(root.completed(false), tools_task, files_task));
            reporter.stop();
            reporter.destroy();
            error!(error = %err, "Preparation failed");
            return Err(err.context("Preparation encountered an error"));
        }
    };

    reporter.set_state(StatusNode::new(found(files.len())).completed(true).into());
    reporter.stop();
    reporter.destroy();

    info!(
        encoder = %tools.encoder.display(),
        probe = %tools.probe.display(),
        files = files.len(),
        "Preparation finished"
    );
    if files.is_empty() {
        bail!("There are no files to process.");
    }

    Ok(Prepared { tools, files })
}
