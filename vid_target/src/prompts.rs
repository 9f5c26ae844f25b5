//! Interactive option collection.
//!
//! Values given on the command line are validated first; anything missing
//! or invalid is asked for. Resolution, framerate and trim can be set once
//! for every job, asked per file, or left alone.

use std::fmt;

use anyhow::{Context, Result};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use shared_utils::modern_ui::symbols;
use shared_utils::{colors, FileSize};
use tracing::debug;

use crate::cli::Cli;
use crate::job::{TranscodeJob, TrimPoint};

pub const DEFAULT_TARGET: &str = "8 MB";
const DEFAULT_RESOLUTION: &str = "720";
const DEFAULT_FRAMERATE: &str = "30";
const DEFAULT_TRIM: &str = "auto";

const CHOICES: [&str; 3] = ["Modify for ALL videos", "YES, individually", "No"];

// ═══════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════

pub fn parse_resolution(value: &str) -> Result<u32, String> {
    let lines: i64 = value
        .trim()
        .parse()
        .map_err(|_| "Enter a valid number".to_string())?;
    if lines <= 0 {
        return Err("Must be larger than 0".to_string());
    }
    if lines % 2 == 1 {
        return Err("Must be even".to_string());
    }
    u32::try_from(lines).map_err(|_| "Enter a valid number".to_string())
}

pub fn parse_framerate(value: &str) -> Result<f64, String> {
    let fps: f64 = value
        .trim()
        .parse()
        .map_err(|_| "Enter a valid number".to_string())?;
    if !fps.is_finite() {
        return Err("Enter a valid number".to_string());
    }
    if fps <= 1.0 {
        return Err("Must be larger than 1".to_string());
    }
    Ok(fps)
}

pub fn parse_start(value: &str) -> Result<TrimPoint, String> {
    value.parse::<TrimPoint>().map_err(|e| e.to_string())
}

/// An explicit end must be positive and after an explicit start.
pub fn parse_end(value: &str, start: TrimPoint) -> Result<TrimPoint, String> {
    let end = value.parse::<TrimPoint>().map_err(|e| e.to_string())?;
    if let TrimPoint::At(end_secs) = end {
        let too_early = match start {
            TrimPoint::At(start_secs) => end_secs <= start_secs,
            TrimPoint::Auto => false,
        };
        if end_secs <= 0.0 || too_early {
            return Err(format!("Must be larger than the start time ({})", start));
        }
    }
    Ok(end)
}

// ═══════════════════════════════════════════════════════════════
// Answers
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting<T> {
    /// Same value for every job.
    All(T),
    /// Ask for each file.
    Individually,
    /// Keep the source value.
    No,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trim {
    pub start: TrimPoint,
    pub end: TrimPoint,
}

impl Default for Trim {
    fn default() -> Self {
        Self {
            start: TrimPoint::Auto,
            end: TrimPoint::Auto,
        }
    }
}

/// Whatever the command line settled; `None` still needs asking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialAnswers {
    pub target: Option<FileSize>,
    pub resolution: Option<Setting<u32>>,
    pub framerate: Option<Setting<f64>>,
    pub trim: Option<Setting<Trim>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionAnswers {
    pub target: FileSize,
    pub resolution: Setting<u32>,
    pub framerate: Setting<f64>,
    pub trim: Setting<Trim>,
}

/// Feedback on one command-line value.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Using { what: &'static str, value: String },
    Bad { what: &'static str, raw: String, reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Using { what, value } => write!(
                f,
                "  {} Using {} {}",
                colors::orange().apply_to(symbols::POINTER),
                what,
                style(value).cyan()
            ),
            Notice::Bad { what, raw, reason } => write!(
                f,
                "  {} Bad {} '{}': {}",
                style(symbols::CROSS).red(),
                what,
                raw,
                reason
            ),
        }
    }
}

/// Validates the command-line values. Invalid ones are reported and left for
/// the prompts.
pub fn from_cli(cli: &Cli) -> (PartialAnswers, Vec<Notice>) {
    let mut answers = PartialAnswers::default();
    let mut notices = Vec::new();

    if let Some(raw) = cli.target.as_deref() {
        match FileSize::parse(raw) {
            Ok(size) => {
                notices.push(Notice::Using {
                    what: "compression target",
                    value: size.display(),
                });
                answers.target = Some(size);
            }
            Err(e) => notices.push(Notice::Bad {
                what: "compression target",
                raw: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    if cli.no_resolution {
        answers.resolution = Some(Setting::No);
    } else if let Some(raw) = cli.resolution.as_deref() {
        match parse_resolution(raw) {
            Ok(lines) => {
                notices.push(Notice::Using {
                    what: "resolution",
                    value: lines.to_string(),
                });
                answers.resolution = Some(Setting::All(lines));
            }
            Err(reason) => notices.push(Notice::Bad {
                what: "resolution",
                raw: raw.to_string(),
                reason,
            }),
        }
    }

    if cli.no_framerate {
        answers.framerate = Some(Setting::No);
    } else if let Some(raw) = cli.framerate.as_deref() {
        match parse_framerate(raw) {
            Ok(fps) => {
                notices.push(Notice::Using {
                    what: "framerate",
                    value: fps.to_string(),
                });
                answers.framerate = Some(Setting::All(fps));
            }
            Err(reason) => notices.push(Notice::Bad {
                what: "framerate",
                raw: raw.to_string(),
                reason,
            }),
        }
    }

    // any trim flag settles trimming for all files; bad values stay auto
    if cli.start.is_some() || cli.end.is_some() || cli.no_start || cli.no_end {
        let mut trim = Trim::default();
        if let Some(raw) = cli.start.as_deref() {
            match parse_start(raw) {
                Ok(start) => {
                    notices.push(Notice::Using {
                        what: "start time",
                        value: start.to_string(),
                    });
                    trim.start = start;
                }
                Err(reason) => notices.push(Notice::Bad {
                    what: "start time",
                    raw: raw.to_string(),
                    reason,
                }),
            }
        }
        if let Some(raw) = cli.end.as_deref() {
            match parse_end(raw, trim.start) {
                Ok(end) => {
                    notices.push(Notice::Using {
                        what: "end time",
                        value: end.to_string(),
                    });
                    trim.end = end;
                }
                Err(reason) => notices.push(Notice::Bad {
                    what: "end time",
                    raw: raw.to_string(),
                    reason,
                }),
            }
        }
        answers.trim = Some(Setting::All(trim));
    }

    (answers, notices)
}

// ═══════════════════════════════════════════════════════════════
// Prompting
// ═══════════════════════════════════════════════════════════════

/// 0 = all, 1 = individually, 2 = no
pub type Choice = usize;

/// Source of interactive answers.
pub trait ValuePrompter {
    /// Asks for free text until `validate` accepts it.
    fn input(
        &mut self,
        message: &str,
        default: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<String>;

    /// Index into [`CHOICES`].
    fn choose(&mut self, message: &str) -> Result<Choice>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}

/// Terminal prompts.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuePrompter for DialoguerPrompter {
    fn input(
        &mut self,
        message: &str,
        default: &str,
        validate: &dyn Fn(&str) -> Result<(), String>,
    ) -> Result<String> {
        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .default(default.to_string())
            .validate_with(|value: &String| validate(value))
            .interact_text()
            .with_context(|| format!("Prompt failed: {}", message))?;
        Ok(value)
    }

    fn choose(&mut self, message: &str) -> Result<Choice> {
        let index = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(&CHOICES)
            .default(0)
            .interact()
            .with_context(|| format!("Prompt failed: {}", message))?;
        Ok(index)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()
            .with_context(|| format!("Prompt failed: {}", message))?;
        Ok(answer)
    }
}

fn ask_value<T>(
    prompter: &mut dyn ValuePrompter,
    message: &str,
    default: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T> {
    let raw = prompter.input(message, default, &|value| parse(value).map(|_| ()))?;
    parse(&raw).map_err(anyhow::Error::msg)
}

fn ask_setting<T>(
    prompter: &mut dyn ValuePrompter,
    what: &str,
    value_message: &str,
    default: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Setting<T>> {
    match prompter.choose(&format!("Modify {}?", what))? {
        0 => Ok(Setting::All(ask_value(prompter, value_message, default, parse)?)),
        1 => Ok(Setting::Individually),
        _ => Ok(Setting::No),
    }
}

fn ask_trim(prompter: &mut dyn ValuePrompter, start_message: &str, end_message: &str) -> Result<Trim> {
    let start = ask_value(prompter, start_message, DEFAULT_TRIM, parse_start)?;
    let end = ask_value(prompter, end_message, DEFAULT_TRIM, |v| parse_end(v, start))?;
    Ok(Trim { start, end })
}

/// Completes `partial` by prompting for whatever is missing.
pub fn ask(partial: PartialAnswers, prompter: &mut dyn ValuePrompter) -> Result<OptionAnswers> {
    let target = match partial.target {
        Some(size) => size,
        None => ask_value(
            prompter,
            "Enter desired compression target (base 10)",
            DEFAULT_TARGET,
            |v| FileSize::parse(v).map_err(|e| e.to_string()),
        )?,
    };

    let resolution = match partial.resolution {
        Some(setting) => setting,
        None => ask_setting(
            prompter,
            "resolution",
            "Enter desired vertical resolution",
            DEFAULT_RESOLUTION,
            parse_resolution,
        )?,
    };

    let framerate = match partial.framerate {
        Some(setting) => setting,
        None => ask_setting(
            prompter,
            "framerate",
            "Enter desired framerate",
            DEFAULT_FRAMERATE,
            parse_framerate,
        )?,
    };

    let trim = match partial.trim {
        Some(setting) => setting,
        None => match prompter.choose("Modify start/end?")? {
            0 => Setting::All(ask_trim(
                prompter,
                "Enter desired start time",
                "Enter desired end time",
            )?),
            1 => Setting::Individually,
            _ => Setting::No,
        },
    };

    debug!(?target, ?resolution, ?framerate, ?trim, "Options collected");
    Ok(OptionAnswers {
        target,
        resolution,
        framerate,
        trim,
    })
}

/// Applies the answers to every job, prompting per file where asked to.
pub fn fill(
    jobs: &mut [TranscodeJob],
    answers: &OptionAnswers,
    prompter: &mut dyn ValuePrompter,
) -> Result<()> {
    for job in jobs.iter_mut() {
        match answers.resolution {
            Setting::All(lines) => job.resolution = Some(lines),
            Setting::No => job.resolution = None,
            Setting::Individually => {}
        }
        match answers.framerate {
            Setting::All(fps) => job.framerate = Some(fps),
            Setting::No => job.framerate = None,
            Setting::Individually => {}
        }
        match answers.trim {
            Setting::All(trim) => {
                job.trim_start = Some(trim.start);
                job.trim_end = Some(trim.end);
            }
            Setting::No => {
                job.trim_start = None;
                job.trim_end = None;
            }
            Setting::Individually => {}
        }
    }

    let per_file = matches!(answers.resolution, Setting::Individually)
        || matches!(answers.framerate, Setting::Individually)
        || matches!(answers.trim, Setting::Individually);
    if !per_file {
        return Ok(());
    }

    println!();
    for job in jobs.iter_mut() {
        println!("\n  {}:", style(job.file_name()).cyan());

        if answers.resolution == Setting::Individually {
            job.resolution = Some(ask_value(
                prompter,
                "Enter vertical resolution",
                DEFAULT_RESOLUTION,
                parse_resolution,
            )?);
        }
        if answers.framerate == Setting::Individually {
            job.framerate = Some(ask_value(
                prompter,
                "Enter framerate",
                DEFAULT_FRAMERATE,
                parse_framerate,
            )?);
        }
        if answers.trim == Setting::Individually {
            let trim = ask_trim(prompter, "Enter start time", "Enter end time")?;
            job.trim_start = Some(trim.start);
            job.trim_end = Some(trim.end);
        }
    }
    Ok(())
}

pub fn confirm_overwrite(prompter: &mut dyn ValuePrompter) -> Result<bool> {
    prompter.confirm(
        &colors::error()
            .apply_to("The exports directory is not empty! Overwrite? DANGEROUS!!!")
            .to_string(),
        false,
    )
}
