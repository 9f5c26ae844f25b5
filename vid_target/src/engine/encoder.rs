//! Two-pass x264 invocation.
//!
//! Pass 1 analyses the source into the passlog and discards its output;
//! pass 2 reads the passlog and writes the MP4. Pass 2 is only started once
//! pass 1 has exited.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use shared_utils::{run_encoder_pass, EngineError, ProgressParser};
use tracing::{debug, info};

use super::params::EncodeParameters;

#[cfg(windows)]
const NULL_SINK: &str = "NUL";
#[cfg(not(windows))]
const NULL_SINK: &str = "/dev/null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    First,
    Second,
}

impl Pass {
    pub fn number(&self) -> u8 {
        match self {
            Pass::First => 1,
            Pass::Second => 2,
        }
    }
}

/// Progress within one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassProgress {
    pub pass: Pass,
    /// `[0, 1]` within the pass.
    pub fraction: f64,
}

impl PassProgress {
    /// Completion of the whole job: pass 1 covers the first half, pass 2 the
    /// second.
    pub fn job_fraction(&self) -> f64 {
        let fraction = self.fraction.clamp(0.0, 1.0);
        match self.pass {
            Pass::First => fraction / 2.0,
            Pass::Second => 0.5 + fraction / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub params: &'a EncodeParameters,
}

/// Runs both passes of one attempt.
pub trait Encoder {
    fn encode(
        &mut self,
        request: &EncodeRequest<'_>,
        progress: &mut dyn FnMut(PassProgress),
    ) -> Result<(), EngineError>;
}

/// ffmpeg with libx264 and AAC.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    encoder_path: PathBuf,
    passlog_prefix: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(encoder_path: impl Into<PathBuf>, passlog_prefix: impl Into<PathBuf>) -> Self {
        Self {
            encoder_path: encoder_path.into(),
            passlog_prefix: passlog_prefix.into(),
        }
    }

    /// Argument list for `pass`.
    pub fn pass_args(&self, request: &EncodeRequest<'_>, pass: Pass) -> Vec<OsString> {
        let params = request.params;
        let mut args: Vec<OsString> = ["-y", "-v", "fatal", "-stats", "-nostdin"]
            .iter()
            .map(OsString::from)
            .collect();

        if params.seek {
            args.push("-ss".into());
            args.push(params.start_offset.to_string().into());
        }
        args.push("-i".into());
        args.push(request.source.into());
        if params.limit {
            args.push("-to".into());
            args.push(params.duration.to_string().into());
        }

        args.extend(
            [
                "-c:v",
                "libx264",
                "-profile:v",
                "high",
                "-preset",
                params.preset.as_str(),
                "-b:v",
                bitrate_arg(params.video_bitrate).as_str(),
                "-pass",
                pass.number().to_string().as_str(),
                "-passlogfile",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(self.passlog_prefix.as_os_str().to_os_string());
        args.extend(audio_args(params).into_iter().map(OsString::from));

        if params.change_framerate {
            args.push("-r".into());
            args.push(params.framerate.to_string().into());
        }
        if params.scale {
            args.push("-vf".into());
            args.push(format!("scale=-2:{}", params.vertical_resolution).into());
        }

        args.push("-f".into());
        match pass {
            Pass::First => {
                args.push("null".into());
                args.push(NULL_SINK.into());
            }
            Pass::Second => {
                args.push("mp4".into());
                args.push(request.output.into());
            }
        }
        args
    }

    fn run_pass(
        &self,
        request: &EncodeRequest<'_>,
        pass: Pass,
        progress: &mut dyn FnMut(PassProgress),
    ) -> Result<(), EngineError> {
        let params = request.params;
        let mut cmd = Command::new(&self.encoder_path);
        cmd.args(self.pass_args(request, pass));

        let parser = ProgressParser::new(Some(params.total_frames()), Some(params.duration));
        debug!(pass = pass.number(), source = %request.source.display(), "Starting encoder pass");
        run_encoder_pass(cmd, parser, &mut |fraction| {
            progress(PassProgress { pass, fraction })
        })
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &mut self,
        request: &EncodeRequest<'_>,
        progress: &mut dyn FnMut(PassProgress),
    ) -> Result<(), EngineError> {
        self.run_pass(request, Pass::First, progress)?;
        progress(PassProgress {
            pass: Pass::Second,
            fraction: 0.0,
        });
        self.run_pass(request, Pass::Second, progress)?;
        info!(output = %request.output.display(), "Two-pass encode finished");
        Ok(())
    }
}

/// Bits per second as an integer, never negative.
fn bitrate_arg(bitrate: f64) -> String {
    format!("{}", bitrate.round().max(0.0) as u64)
}

fn audio_args(params: &EncodeParameters) -> Vec<String> {
    let bitrate = bitrate_arg(params.audio_bitrate);
    match params.audio_streams {
        0 => vec!["-an".to_string()],
        1 => vec![
            "-ac".to_string(),
            "2".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            bitrate,
        ],
        n => vec![
            "-filter_complex".to_string(),
            format!("amerge=inputs={}", n),
            "-ac".to_string(),
            "2".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            bitrate,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Preset;

    fn params() -> EncodeParameters {
        EncodeParameters {
            vertical_resolution: 720,
            framerate: 24.0,
            start_offset: 5.0,
            duration: 30.0,
            video_bitrate: 949_333.33,
            audio_bitrate: 64_000.0,
            recommended_bitrate: 3_555_555.5,
            preset: Preset::Veryslow,
            scale: false,
            change_framerate: false,
            seek: false,
            limit: false,
            audio_streams: 1,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_first_pass_minimal() {
        let encoder = FfmpegEncoder::new("ffmpeg", "ffmpeg2pass");
        let params = params();
        let request = EncodeRequest {
            source: Path::new("in.mkv"),
            output: Path::new("exports/in.mp4"),
            params: &params,
        };
        let args = strings(encoder.pass_args(&request, Pass::First));
        let expected = [
            "-y", "-v", "fatal", "-stats", "-nostdin", "-i", "in.mkv", "-c:v", "libx264",
            "-profile:v", "high", "-preset", "veryslow", "-b:v", "949333", "-pass", "1",
            "-passlogfile", "ffmpeg2pass", "-ac", "2", "-c:a", "aac", "-b:a", "64000", "-f",
            "null", NULL_SINK,
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn test_second_pass_with_all_options() {
        let encoder = FfmpegEncoder::new("ffmpeg", "ffmpeg2pass");
        let mut params = params();
        params.seek = true;
        params.limit = true;
        params.scale = true;
        params.change_framerate = true;
        params.audio_streams = 3;
        let request = EncodeRequest {
            source: Path::new("in.mkv"),
            output: Path::new("exports/in.mp4"),
            params: &params,
        };
        let args = strings(encoder.pass_args(&request, Pass::Second));

        assert_eq!(&args[5..9], ["-ss", "5", "-i", "in.mkv"]);
        assert_eq!(&args[9..11], ["-to", "30"]);
        let pass = args.iter().position(|a| a == "-pass").unwrap();
        assert_eq!(args[pass + 1], "2");
        let merge = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[merge + 1], "amerge=inputs=3");
        let tail: Vec<&str> = args[args.len() - 7..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            ["-r", "24", "-vf", "scale=-2:720", "-f", "mp4", "exports/in.mp4"]
        );
    }

    #[test]
    fn test_no_audio_streams() {
        let mut params = params();
        params.audio_streams = 0;
        assert_eq!(audio_args(&params), vec!["-an".to_string()]);
    }

    #[test]
    fn test_job_fraction_halves() {
        let first = PassProgress { pass: Pass::First, fraction: 0.5 };
        assert_eq!(first.job_fraction(), 0.25);
        let second = PassProgress { pass: Pass::Second, fraction: 0.0 };
        assert_eq!(second.job_fraction(), 0.5);
        let done = PassProgress { pass: Pass::Second, fraction: 1.0 };
        assert_eq!(done.job_fraction(), 1.0);
    }

    #[test]
    fn test_bitrate_arg_rounds() {
        assert_eq!(bitrate_arg(949_333.6), "949334");
        assert_eq!(bitrate_arg(-5.0), "0");
    }

    #[cfg(unix)]
    #[test]
    fn test_encode_reports_failure_of_first_pass() {
        let mut encoder = FfmpegEncoder::new("/nonexistent/ffmpeg-binary", "ffmpeg2pass");
        let params = params();
        let request = EncodeRequest {
            source: Path::new("in.mkv"),
            output: Path::new("out.mp4"),
            params: &params,
        };
        let mut seen = Vec::new();
        let err = encoder
            .encode(&request, &mut |p| seen.push(p))
            .unwrap_err();
        assert!(matches!(err, EngineError::EncoderError(_)));
        assert!(seen.is_empty());
    }

    /// Stand-in encoder: pass 1 leaves a marker behind after a delay, pass 2
    /// fails unless the marker is already there.
    #[cfg(unix)]
    fn staged_encoder(dir: &Path, first_pass_exit: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-ffmpeg");
        let body = format!(
            "#!/bin/sh\n\
             dir=$(dirname \"$0\")\n\
             case \" $* \" in\n\
             *\" -pass 1 \"*) sleep 1; : > \"$dir/pass1.done\"; exit {first_pass_exit} ;;\n\
             *\" -pass 2 \"*) [ -f \"$dir/pass1.done\" ] || exit 3; : > \"$dir/pass2.done\" ;;\n\
             esac\n"
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn test_second_pass_waits_for_first() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut encoder = FfmpegEncoder::new(staged_encoder(dir.path(), 0), dir.path().join("log"));
        let params = params();
        let output = dir.path().join("out.mp4");
        let request = EncodeRequest {
            source: Path::new("in.mkv"),
            output: &output,
            params: &params,
        };

        let mut seen = Vec::new();
        encoder.encode(&request, &mut |p| seen.push(p)).unwrap();

        assert!(dir.path().join("pass1.done").exists());
        assert!(dir.path().join("pass2.done").exists());
        assert_eq!(
            seen.first(),
            Some(&PassProgress {
                pass: Pass::Second,
                fraction: 0.0
            })
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_first_pass_skips_second() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut encoder = FfmpegEncoder::new(staged_encoder(dir.path(), 1), dir.path().join("log"));
        let params = params();
        let output = dir.path().join("out.mp4");
        let request = EncodeRequest {
            source: Path::new("in.mkv"),
            output: &output,
            params: &params,
        };

        let mut seen = Vec::new();
        let err = encoder
            .encode(&request, &mut |p| seen.push(p))
            .unwrap_err();

        assert!(matches!(err, EngineError::EncoderExit { code: Some(1), .. }));
        assert!(!dir.path().join("pass2.done").exists());
        assert!(seen.iter().all(|p| p.pass == Pass::First));
    }
}
