//! Bitrate budgeting and per-job parameter derivation.

use shared_utils::{parse_frame_rate, EngineError, ProbeOutput, ProbeStream};
use tracing::{debug, warn};

use crate::job::TranscodeJob;
use crate::options::Preset;

pub const MIN_AUDIO_BITRATE: f64 = 64_000.0;
pub const MAX_AUDIO_BITRATE: f64 = 128_000.0;
/// Applied to the total budget, and to both bitrates on every retry.
pub const CORRECTION_FACTOR: f64 = 0.95;
pub const FULLHD_PIXELS: f64 = 1920.0 * 1080.0;
pub const FULLHD_BITRATE: f64 = 8_000_000.0;
pub const STANDARD_ASPECT_RATIO: f64 = 16.0 / 9.0;

/// Bitrate that looks good at `height` lines, assuming 16:9, scaled by pixel
/// count from 8 Mbit/s at 1080p.
pub fn recommended_bitrate(height: u32) -> f64 {
    let height = height as f64;
    let pixels = height * STANDARD_ASPECT_RATIO * height;
    pixels / FULLHD_PIXELS * FULLHD_BITRATE
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitrateBudget {
    pub total: f64,
    pub video: f64,
    pub audio: f64,
    pub recommended: f64,
}

/// Splits `target_bytes` over `duration` seconds between video and audio.
///
/// Video takes what is left after the audio floor, capped at the
/// recommended rate; audio takes the remainder, capped at 128 kbit/s.
pub fn allocate_bitrates(target_bytes: u64, duration: f64, height: u32) -> BitrateBudget {
    let total = target_bytes as f64 * 8.0 / duration * CORRECTION_FACTOR;
    let recommended = recommended_bitrate(height);
    let video = (total - MIN_AUDIO_BITRATE).min(recommended);
    let audio = (total - video).min(MAX_AUDIO_BITRATE);

    BitrateBudget {
        total,
        video,
        audio,
        recommended,
    }
}

/// Everything one attempt needs to invoke the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParameters {
    pub vertical_resolution: u32,
    pub framerate: f64,
    pub start_offset: f64,
    pub duration: f64,
    pub video_bitrate: f64,
    pub audio_bitrate: f64,
    pub recommended_bitrate: f64,
    pub preset: Preset,
    /// `-vf scale=-2:<h>`
    pub scale: bool,
    /// `-r <fps>`
    pub change_framerate: bool,
    /// `-ss <start>`
    pub seek: bool,
    /// `-to <duration>`
    pub limit: bool,
    pub audio_streams: usize,
}

impl EncodeParameters {
    /// Scales both bitrates by the correction factor.
    pub fn apply_correction(&mut self) {
        self.video_bitrate *= CORRECTION_FACTOR;
        self.audio_bitrate *= CORRECTION_FACTOR;
    }

    /// Frames the encoder is expected to emit, for progress.
    pub fn total_frames(&self) -> u64 {
        (self.framerate * self.duration).round().max(0.0) as u64
    }
}

/// Video stream with the greatest height; the first one wins a tie.
pub fn reference_video_stream(probe: &ProbeOutput) -> Option<&ProbeStream> {
    let mut best: Option<&ProbeStream> = None;
    for stream in probe.video_streams() {
        let taller = best.map_or(true, |b| stream.height.unwrap_or(0) > b.height.unwrap_or(0));
        if taller {
            best = Some(stream);
        }
    }
    best
}

/// Resolves the effective output parameters and the bitrate budget for a job.
pub fn derive_parameters(
    job: &TranscodeJob,
    target_bytes: u64,
    preset: Preset,
) -> Result<EncodeParameters, EngineError> {
    let stream = reference_video_stream(&job.probe)
        .ok_or_else(|| EngineError::NoVideoStream(job.file_name()))?;

    let native_height = stream.height.ok_or_else(|| {
        EngineError::ProbeError(format!("video stream {} has no height", stream.index))
    })?;
    let rate_text = stream.r_frame_rate.clone().unwrap_or_default();
    let native_framerate =
        parse_frame_rate(&rate_text).ok_or(EngineError::InvalidFramerate(rate_text))?;

    let stream_start = stream.start_time_secs().unwrap_or(0.0);
    let stream_duration = stream
        .duration_secs()
        .or_else(|| job.probe.format.duration_secs())
        .ok_or_else(|| EngineError::ProbeError("no stream or container duration".to_string()))?;

    let requested_height = job.resolution.filter(|h| *h < native_height);
    let requested_framerate = job.framerate.filter(|f| *f < native_framerate);
    let explicit_start = job.trim_start.and_then(|t| t.seconds());
    let explicit_end = job.trim_end.and_then(|t| t.seconds());

    let vertical_resolution = requested_height.unwrap_or(native_height);
    let framerate = requested_framerate.unwrap_or_else(|| native_framerate.round());
    let start_offset = explicit_start.unwrap_or(0.0);
    let end = explicit_end.unwrap_or(stream_start + stream_duration);
    let duration = end - start_offset;

    if !(duration > 0.0) {
        return Err(EngineError::InvalidDuration(duration));
    }

    let budget = allocate_bitrates(target_bytes, duration, vertical_resolution);
    if budget.video < 0.0 {
        warn!(
            file = %job.file_name(),
            video_bitrate = budget.video,
            "Target too small for this duration; video bitrate is negative"
        );
    }
    debug!(
        file = %job.file_name(),
        total = budget.total,
        video = budget.video,
        audio = budget.audio,
        recommended = budget.recommended,
        duration,
        "Bitrate budget"
    );

    Ok(EncodeParameters {
        vertical_resolution,
        framerate,
        start_offset,
        duration,
        video_bitrate: budget.video,
        audio_bitrate: budget.audio,
        recommended_bitrate: budget.recommended,
        preset,
        scale: requested_height.is_some(),
        change_framerate: requested_framerate.is_some(),
        seek: explicit_start.is_some(),
        limit: explicit_end.is_some(),
        audio_streams: job.probe.audio_streams().count(),
    })
}



#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_budget_never_exceeds_total(
            target in 1_000u64..10_000_000_000,
            duration in 0.1f64..36_000.0,
            height in 2u32..4320
        ) {
            let budget = allocate_bitrates(target, duration, height);
            prop_assert!(budget.video + budget.audio <= budget.total + 1e-6);
            prop_assert!(budget.video <= budget.recommended);
            prop_assert!(budget.audio <= MAX_AUDIO_BITRATE);
        }

        #[test]
        fn prop_correction_preserves_ratio(
            video in 1.0f64..50_000_000.0,
            audio in 1.0f64..128_000.0,
            rounds in 1usize..3
        ) {
            let mut params = EncodeParameters {
                vertical_resolution: 720,
                framerate: 30.0,
                start_offset: 0.0,
                duration: 10.0,
                video_bitrate: video,
                audio_bitrate: audio,
                recommended_bitrate: recommended_bitrate(720),
                preset: Preset::Veryslow,
                scale: false,
                change_framerate: false,
                seek: false,
                limit: false,
                audio_streams: 1,
            };
            for _ in 0..rounds {
                params.apply_correction();
            }
            let factor = CORRECTION_FACTOR.powi(rounds as i32);
            prop_assert!((params.video_bitrate - video * factor).abs() < 1e-6 * video);
            prop_assert!((params.audio_bitrate - audio * factor).abs() < 1e-6 * audio);
        }
    }
}
