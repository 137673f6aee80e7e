//! # camstream-av
//!
//! Codec negotiation and transcoder process control for live HLS output.
//!
//! This crate provides functionality for:
//! - Turning a codec preference into an ordered list of encode strategies
//! - Building the full ffmpeg argument set for segmented HLS output
//! - Launching the transcoder and normalizing how it is stopped
//! - Detecting the external tools the transcoder needs
//!
//! ## Features
//!
//! - `tracing` - Forward transcoder stderr and lifecycle details to `tracing`
//!
//! ## Example
//!
//! ```
//! use camstream_av::{candidates, EncodeSettings};
//! use camstream_common::{CodecPreference, CodecStrategy};
//! use std::path::Path;
//!
//! let list = candidates(CodecPreference::Auto, &EncodeSettings::default());
//! assert_eq!(list[0].strategy, CodecStrategy::Copy);
//!
//! let args = list[0].output_args(Path::new("/tmp/out/stream.m3u8"));
//! assert_eq!(args.last().unwrap(), "/tmp/out/stream.m3u8");
//! ```

pub mod codec;
mod error;
pub mod process;
pub mod template;
pub mod tools;

// Re-exports
pub use codec::{candidates, CodecCandidate, EncodeSettings};
pub use error::{Error, Result};
pub use process::{StopCapability, TranscoderCommand};
pub use template::TemplateContext;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
