//! FFprobe JSON 解析模块
//!
//! Stream/format model of `ffprobe -print_format json -show_format -show_streams`.
//! ffprobe reports most numbers as strings; accessors parse them lazily.

use std::ffi::OsString;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::errors::EngineError;
use crate::logging::execute_external_command_checked;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("ffprobe failed for {path}: {message}")]
    ExecutionFailed { path: String, message: String },

    #[error("ffprobe output is not valid JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl From<ProbeError> for EngineError {
    fn from(e: ProbeError) -> Self {
        EngineError::ProbeError(e.to_string())
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProbeStream {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub codec_type: Option<String>,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub r_frame_rate: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<String>,
}

impl ProbeStream {
    pub fn is_video(&self) -> bool {
        self.codec_type.as_deref() == Some("video")
    }

    pub fn is_audio(&self) -> bool {
        self.codec_type.as_deref() == Some("audio")
    }

    pub fn start_time_secs(&self) -> Option<f64> {
        parse_number(self.start_time.as_deref())
    }

    pub fn duration_secs(&self) -> Option<f64> {
        parse_number(self.duration.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProbeFormat {
    #[serde(default)]
    pub format_name: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

impl ProbeFormat {
    pub fn duration_secs(&self) -> Option<f64> {
        parse_number(self.duration.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    #[serde(default)]
    pub format: ProbeFormat,
}

impl ProbeOutput {
    pub fn from_json(json: &str) -> Result<Self, ProbeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &ProbeStream> {
        self.streams.iter().filter(|s| s.is_video())
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &ProbeStream> {
        self.streams.iter().filter(|s| s.is_audio())
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parses an ffprobe rational such as `30000/1001` or `25/1`; a bare number
/// is accepted too. Returns `None` for malformed or non-positive rates.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Runs the probe tool against `file` and parses its JSON report.
pub fn probe_media(probe_path: &Path, file: &Path) -> Result<ProbeOutput, ProbeError> {
    let args: Vec<OsString> = vec![
        "-v".into(),
        "error".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        "-i".into(),
        file.as_os_str().to_os_string(),
    ];

    let result = execute_external_command_checked("ffprobe", probe_path, &args).map_err(|e| {
        ProbeError::ExecutionFailed {
            path: file.display().to_string(),
            message: e.to_string(),
        }
    })?;

    ProbeOutput::from_json(&result.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264", "width": 1920,
             "height": 1080, "r_frame_rate": "30000/1001", "start_time": "0.000000",
             "duration": "60.060000"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "start_time": "0.021000"},
            {"index": 2, "codec_type": "subtitle"}
        ],
        "format": {"format_name": "matroska,webm", "duration": "61.000000", "size": "12345"}
    }"#;

    #[test]
    fn test_parse_sample() {
        let probe = ProbeOutput::from_json(SAMPLE).unwrap();
        assert_eq!(probe.streams.len(), 3);
        assert_eq!(probe.video_streams().count(), 1);
        assert_eq!(probe.audio_streams().count(), 1);

        let video = probe.video_streams().next().unwrap();
        assert_eq!(video.height, Some(1080));
        assert_eq!(video.start_time_secs(), Some(0.0));
        assert_eq!(video.duration_secs(), Some(60.06));
        assert_eq!(probe.format.duration_secs(), Some(61.0));
    }

    #[test]
    fn test_parse_missing_fields() {
        let probe = ProbeOutput::from_json(r#"{"streams":[{"codec_type":"video"}]}"#).unwrap();
        let video = &probe.streams[0];
        assert_eq!(video.height, None);
        assert_eq!(video.duration_secs(), None);
        assert_eq!(probe.format.duration_secs(), None);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            ProbeOutput::from_json("not json"),
            Err(ProbeError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_malformed() {
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("30/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate(""), None);
        assert_eq!(parse_frame_rate("0/1"), None);
        assert_eq!(parse_frame_rate("30/x"), None);
    }

    #[test]
    fn test_probe_missing_tool() {
        let err = probe_media(Path::new("/nonexistent/ffprobe-xyz"), Path::new("a.mkv"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::ExecutionFailed { .. }));
    }
}
