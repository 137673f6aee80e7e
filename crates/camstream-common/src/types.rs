//! Core type definitions for stream configuration and lifecycle reporting.
//!
//! All enums are serialized in lowercase so they read the same in TOML
//! config files, CLI flags, and notifier payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 480p cap, 1200k video.
    Low,
    /// 720p cap, 2500k video.
    Medium,
    /// Source resolution, 4500k video.
    #[default]
    High,
}

impl Quality {
    /// Video bitrate used by re-encoding strategies.
    pub fn video_bitrate(&self) -> &'static str {
        match self {
            Self::Low => "1200k",
            Self::Medium => "2500k",
            Self::High => "4500k",
        }
    }

    /// Audio bitrate for the AAC track.
    pub fn audio_bitrate(&self) -> &'static str {
        match self {
            Self::Low => "96k",
            Self::Medium | Self::High => "128k",
        }
    }

    /// GOP length in frames.
    pub fn gop_size(&self) -> u32 {
        match self {
            Self::Low => 48,
            Self::Medium | Self::High => 60,
        }
    }

    /// Maximum output resolution, `None` keeps the source size.
    pub fn max_resolution(&self) -> Option<(u32, u32)> {
        match self {
            Self::Low => Some((854, 480)),
            Self::Medium => Some((1280, 720)),
            Self::High => None,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}

/// A concrete encoding strategy the transcoder can be launched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecStrategy {
    /// Pass the source video through untouched.
    #[serde(rename = "copy")]
    Copy,
    /// V4L2 memory-to-memory hardware H.264 encoder.
    #[serde(rename = "h264_v4l2m2m")]
    HardwareH264,
    /// libx264 software encoder.
    #[serde(rename = "h264")]
    SoftwareH264,
}

impl CodecStrategy {
    /// Priority order used when the preference is `auto`.
    pub const AUTO_ORDER: [CodecStrategy; 3] =
        [Self::Copy, Self::HardwareH264, Self::SoftwareH264];

    /// Name used in logs, config, and notifier payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::HardwareH264 => "h264_v4l2m2m",
            Self::SoftwareH264 => "h264",
        }
    }
}

impl fmt::Display for CodecStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "h264_v4l2m2m" => Ok(Self::HardwareH264),
            "h264" | "libx264" => Ok(Self::SoftwareH264),
            _ => Err(format!("Unknown codec: {}", s)),
        }
    }
}

/// Which strategies the negotiator should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CodecPreference {
    /// Try every strategy in priority order.
    #[default]
    Auto,
    /// Use exactly this strategy, no fallback.
    Only(CodecStrategy),
}

impl fmt::Display for CodecPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Only(codec) => write!(f, "{}", codec),
        }
    }
}

impl FromStr for CodecPreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse().map(Self::Only)
    }
}

impl TryFrom<String> for CodecPreference {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CodecPreference> for String {
    fn from(value: CodecPreference) -> Self {
        value.to_string()
    }
}

/// Hardware-accelerated decoding preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HwAccel {
    /// Let ffmpeg pick a decoder (`-hwaccel auto`).
    #[default]
    Auto,
    /// Software decoding only.
    None,
}

impl fmt::Display for HwAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for HwAccel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            _ => Err(format!("Unknown hwaccel: {}", s)),
        }
    }
}

/// State reported for the liveness entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    On,
    Off,
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Reason tag attached to every "stopped" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A stall, a process error, or an exhausted codec list ended the cycle.
    ErrorOrStall,
    /// External termination signal.
    Shutdown,
    /// Setup failed before supervision began.
    Fatal,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorOrStall => "error_or_stall",
            Self::Shutdown => "shutdown",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
