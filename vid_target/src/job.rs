//! Transcode jobs and trim points.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use shared_utils::ProbeOutput;
use thiserror::Error;

/// A trim boundary: `Auto` follows the source, `At` is an explicit time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimPoint {
    Auto,
    At(f64),
}

impl TrimPoint {
    /// The explicit time, if any.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            TrimPoint::Auto => None,
            TrimPoint::At(secs) => Some(*secs),
        }
    }
}

impl fmt::Display for TrimPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimPoint::Auto => write!(f, "auto"),
            TrimPoint::At(secs) => write!(f, "{}s", secs),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Must be in HH:MM:SS.MILLISECONDS or SECONDS format, or \"auto\" (got {0:?})")]
pub struct TimeParseError(pub String);

impl FromStr for TrimPoint {
    type Err = TimeParseError;

    /// Accepts `auto`, plain seconds (`90`, `12.5`) and `HH:MM:SS(.ms)` /
    /// `MM:SS(.ms)` timestamps.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("auto") {
            return Ok(TrimPoint::Auto);
        }

        let err = || TimeParseError(s.to_string());
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() > 3 {
            return Err(err());
        }

        let (last, leading) = parts.split_last().ok_or_else(err)?;
        let mut seconds = 0.0;
        for part in leading {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            let n: f64 = part.parse().map_err(|_| err())?;
            seconds = seconds * 60.0 + n;
        }

        if !is_decimal(last) {
            return Err(err());
        }
        let tail: f64 = last.parse().map_err(|_| err())?;
        Ok(TrimPoint::At(seconds * 60.0 + tail))
    }
}

/// `digits` or `digits.digits`
fn is_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

/// One source file with its probe report and the user's overrides.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub source_path: PathBuf,
    pub probe: ProbeOutput,
    pub resolution: Option<u32>,
    pub framerate: Option<f64>,
    pub trim_start: Option<TrimPoint>,
    pub trim_end: Option<TrimPoint>,
}

impl TranscodeJob {
    pub fn new(source_path: impl Into<PathBuf>, probe: ProbeOutput) -> Self {
        Self {
            source_path: source_path.into(),
            probe,
            resolution: None,
            framerate: None,
            trim_start: None,
            trim_end: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// `<export_dir>/<stem>.mp4`
    pub fn output_path(&self, export_dir: &Path) -> PathBuf {
        let mut name: OsString = self
            .source_path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| OsString::from("output"));
        name.push(".mp4");
        export_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trim_points() {
        assert_eq!("auto".parse::<TrimPoint>(), Ok(TrimPoint::Auto));
        assert_eq!("90".parse::<TrimPoint>(), Ok(TrimPoint::At(90.0)));
        assert_eq!("12.5".parse::<TrimPoint>(), Ok(TrimPoint::At(12.5)));
        assert_eq!("01:30".parse::<TrimPoint>(), Ok(TrimPoint::At(90.0)));
        assert_eq!("00:01:00".parse::<TrimPoint>(), Ok(TrimPoint::At(60.0)));
        assert_eq!("01:00:02.25".parse::<TrimPoint>(), Ok(TrimPoint::At(3602.25)));
    }

    #[test]
    fn test_parse_trim_rejects_garbage() {
        for bad in ["", "soon", "-5", "1:2:3:4", "1.5:00", "12:", ":30", "1e3", "1."] {
            assert!(bad.parse::<TrimPoint>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_output_path_uses_stem() {
        let job = TranscodeJob::new("/videos/holiday.v2.mkv", ProbeOutput::default());
        assert_eq!(
            job.output_path(Path::new("exports")),
            PathBuf::from("exports/holiday.v2.mp4")
        );
        assert_eq!(job.file_name(), "holiday.v2.mkv");
    }

    #[test]
    fn test_trim_display() {
        assert_eq!(TrimPoint::Auto.to_string(), "auto");
        assert_eq!(TrimPoint::At(5.0).to_string(), "5s");
        assert_eq!(TrimPoint::At(5.5).seconds(), Some(5.5));
    }
}
