//! Codec negotiation and transcoder argument building.
//!
//! [`candidates`] turns a [`CodecPreference`] into the ordered list of
//! strategies the supervisor should attempt. Each [`CodecCandidate`] carries
//! every argument the transcoder needs after its input, so the caller only
//! has to prepend the source.

use camstream_common::{CodecPreference, CodecStrategy, HwAccel, Quality};
use std::path::Path;

/// Segment duration in seconds.
pub const HLS_SEGMENT_SECS: u32 = 2;
/// Number of segments kept in the playlist window.
pub const HLS_LIST_SIZE: u32 = 5;
/// Segments older than this many entries are deleted.
pub const HLS_DELETE_THRESHOLD: u32 = 10;
/// Muxer flags: rolling deletion, resumable list, wall-clock tags.
pub const HLS_FLAGS: &str =
    "delete_segments+append_list+program_date_time+independent_segments";

/// Encoding inputs that do not depend on the chosen strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeSettings {
    pub quality: Quality,
    pub hwaccel: HwAccel,
}

/// One concrete strategy plus its argument set, minus the output target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecCandidate {
    pub strategy: CodecStrategy,
    args: Vec<String>,
}

impl CodecCandidate {
    /// Build the candidate for `strategy` under `settings`.
    pub fn new(strategy: CodecStrategy, settings: &EncodeSettings) -> Self {
        let mut args = hwaccel_args(settings.hwaccel);
        args.extend(codec_args(strategy, settings.quality));
        args.extend(quality_args(strategy, settings.quality));
        Self { strategy, args }
    }

    /// Full argument list writing the manifest to `target`.
    pub fn output_args(&self, target: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend(hls_args(target));
        args
    }
}

/// Ordered candidates for a preference.
///
/// A specific strategy yields exactly that strategy. `auto` yields copy,
/// then hardware H.264, then software H.264. The result is never empty.
pub fn candidates(preference: CodecPreference, settings: &EncodeSettings) -> Vec<CodecCandidate> {
    let order: &[CodecStrategy] = match preference {
        CodecPreference::Auto => &CodecStrategy::AUTO_ORDER,
        CodecPreference::Only(ref strategy) => std::slice::from_ref(strategy),
    };

    order
        .iter()
        .map(|strategy| CodecCandidate::new(*strategy, settings))
        .collect()
}

fn hwaccel_args(hwaccel: HwAccel) -> Vec<String> {
    match hwaccel {
        HwAccel::None => Vec::new(),
        HwAccel::Auto => strings(&["-hwaccel", "auto"]),
    }
}

fn codec_args(strategy: CodecStrategy, quality: Quality) -> Vec<String> {
    match strategy {
        CodecStrategy::Copy => strings(&["-c:v", "copy", "-c:a", "aac"]),
        CodecStrategy::HardwareH264 => strings(&[
            "-c:v",
            "h264_v4l2m2m",
            "-b:v",
            quality.video_bitrate(),
            "-c:a",
            "aac",
        ]),
        CodecStrategy::SoftwareH264 => strings(&[
            "-c:v",
            "libx264",
            "-preset",
            "veryfast",
            "-b:v",
            quality.video_bitrate(),
            "-c:a",
            "aac",
        ]),
    }
}

// Stream copy cannot be filtered, so only the audio bitrate applies to it.
fn quality_args(strategy: CodecStrategy, quality: Quality) -> Vec<String> {
    let mut args = Vec::new();

    if strategy != CodecStrategy::Copy {
        if let Some((w, h)) = quality.max_resolution() {
            args.push("-vf".to_string());
            args.push(format!(
                "scale=w={}:h={}:force_original_aspect_ratio=decrease",
                w, h
            ));
        }
        let gop = quality.gop_size().to_string();
        args.extend(["-g".to_string(), gop.clone(), "-keyint_min".to_string(), gop]);
    }

    args.extend(["-b:a".to_string(), quality.audio_bitrate().to_string()]);
    args
}

fn hls_args(target: &Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        HLS_SEGMENT_SECS.to_string(),
        "-hls_list_size".to_string(),
        HLS_LIST_SIZE.to_string(),
        "-hls_flags".to_string(),
        HLS_FLAGS.to_string(),
        "-hls_delete_threshold".to_string(),
        HLS_DELETE_THRESHOLD.to_string(),
        target.to_string_lossy().to_string(),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
