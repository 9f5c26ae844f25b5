//! Status board for the transcode stage.
//!
//! Each stage of a job gets its own [`StatusUpdate`] variant carrying only
//! the fields that stage knows about. [`status_tree`] turns one into the
//! tree handed to the reporter.

use console::style;
use shared_utils::modern_ui::{progress_style::BAR_WIDTH, render_progress_bar, symbols};
use shared_utils::{colors, StatusNode, StatusTree};

use super::encoder::{Pass, PassProgress};
use super::params::EncodeParameters;

const FAIR_AUDIO_BITRATE: f64 = 96_000.0;
const GOOD_AUDIO_BITRATE: f64 = 120_000.0;

/// Bitrate indicator shown next to each stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Poor,
    Fair,
    Good,
}

impl Health {
    /// Relative to the recommended bitrate: below half is poor, below the
    /// recommendation fair.
    pub fn video(bitrate: f64, recommended: f64) -> Self {
        let factor = bitrate / recommended;
        if factor < 0.5 {
            Health::Poor
        } else if factor < 1.0 {
            Health::Fair
        } else {
            Health::Good
        }
    }

    pub fn audio(bitrate: f64) -> Self {
        if bitrate < FAIR_AUDIO_BITRATE {
            Health::Poor
        } else if bitrate < GOOD_AUDIO_BITRATE {
            Health::Fair
        } else {
            Health::Good
        }
    }

    fn glyph(&self) -> String {
        match self {
            Health::Poor => style(symbols::WARNING).red().to_string(),
            Health::Fair => colors::orange().apply_to(symbols::WARNING).to_string(),
            Health::Good => style(symbols::TICK).green().to_string(),
        }
    }
}

/// What the board shows about an attempt in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeDetails {
    pub vertical_resolution: u32,
    pub framerate: f64,
    pub duration: f64,
    pub video_bitrate: f64,
    pub audio_bitrate: f64,
    pub video_health: Health,
    pub audio_health: Health,
}

impl From<&EncodeParameters> for EncodeDetails {
    fn from(params: &EncodeParameters) -> Self {
        Self {
            vertical_resolution: params.vertical_resolution,
            framerate: params.framerate,
            duration: params.duration,
            video_bitrate: params.video_bitrate,
            audio_bitrate: params.audio_bitrate,
            video_health: Health::video(params.video_bitrate, params.recommended_bitrate),
            audio_health: Health::audio(params.audio_bitrate),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Parameters are being derived.
    Computing,
    EncodingPass1 {
        details: EncodeDetails,
        fraction: f64,
        /// Number of the attempt now running after a size miss.
        correction: Option<u32>,
    },
    EncodingPass2 {
        details: EncodeDetails,
        fraction: f64,
        correction: Option<u32>,
    },
}

impl StatusUpdate {
    pub fn encoding(details: EncodeDetails, progress: PassProgress, correction: Option<u32>) -> Self {
        match progress.pass {
            Pass::First => StatusUpdate::EncodingPass1 {
                details,
                fraction: progress.fraction,
                correction,
            },
            Pass::Second => StatusUpdate::EncodingPass2 {
                details,
                fraction: progress.fraction,
                correction,
            },
        }
    }

    /// Completion of the current job in `[0, 1]`.
    pub fn job_fraction(&self) -> f64 {
        match self {
            StatusUpdate::Computing => 0.0,
            StatusUpdate::EncodingPass1 { fraction, .. } => PassProgress {
                pass: Pass::First,
                fraction: *fraction,
            }
            .job_fraction(),
            StatusUpdate::EncodingPass2 { fraction, .. } => PassProgress {
                pass: Pass::Second,
                fraction: *fraction,
            }
            .job_fraction(),
        }
    }
}

/// Where the batch stands.
#[derive(Debug, Clone, Copy)]
pub struct BoardView<'a> {
    pub file_name: &'a str,
    /// Zero-based.
    pub job_index: usize,
    pub job_count: usize,
    pub failed: usize,
}

impl BoardView<'_> {
    /// Completion of the batch in `[0, 1]`.
    pub fn batch_fraction(&self, job_fraction: f64) -> f64 {
        if self.job_count == 0 {
            return 1.0;
        }
        ((self.job_index as f64 + job_fraction) / self.job_count as f64).min(1.0)
    }
}

pub fn status_tree(view: &BoardView<'_>, update: &StatusUpdate) -> StatusTree {
    let mut text = format!(
        "Transcoding   {}",
        render_progress_bar(view.batch_fraction(update.job_fraction()), BAR_WIDTH)
    );
    if view.failed > 0 {
        text.push_str(&format!(
            "   {}",
            style(format!("[{} failed]", view.failed)).bold().red()
        ));
    }
    text.push_str(&format!(
        "\n {} {}",
        colors::orange().apply_to(symbols::POINTER),
        style(view.file_name).cyan()
    ));

    match update {
        StatusUpdate::Computing => {
            let root = StatusNode::new(text)
                .running()
                .with_child(StatusNode::new("Calculating...").running());
            return root.into();
        }
        StatusUpdate::EncodingPass1 {
            details, correction, ..
        } => {
            push_details(&mut text, details);
            text.push_str(&format!(
                "\n       {} First pass {}",
                colors::orange().apply_to(symbols::POINTER),
                colors::dim().apply_to(format!("{} Second pass", symbols::POINTER))
            ));
            push_correction(&mut text, *correction);
        }
        StatusUpdate::EncodingPass2 {
            details, correction, ..
        } => {
            push_details(&mut text, details);
            text.push_str(&format!(
                "\n       {} {} Second pass",
                colors::dim().apply_to(format!("{} First pass", symbols::POINTER)),
                style(symbols::POINTER).cyan()
            ));
            push_correction(&mut text, *correction);
        }
    }

    StatusNode::new(text).running().into()
}

fn push_details(text: &mut String, details: &EncodeDetails) {
    text.push_str(&format!(
        "\n     Video: {} {} Mbit/s H264, {}/{}p, {} seconds",
        details.video_health.glyph(),
        style((details.video_bitrate / 100_000.0).round() / 10.0).cyan(),
        style(details.vertical_resolution).cyan(),
        style(details.framerate).cyan(),
        style(details.duration.round()).cyan()
    ));
    text.push_str(&format!(
        "\n     Audio: {} {} Kbit/s AAC",
        details.audio_health.glyph(),
        style((details.audio_bitrate / 1000.0).round()).cyan()
    ));
}

fn push_correction(text: &mut String, correction: Option<u32>) {
    if let Some(attempt) = correction {
        text.push_str(
            &colors::orange()
                .apply_to(format!(
                    "\n    Attempt {}, file too large! Applying correctional modifier...",
                    attempt
                ))
                .to_string(),
        );
    }
}
