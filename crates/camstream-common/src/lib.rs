//! Camstream-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across camstream:
//!
//! - **Core Types**: Enums for quality tiers, codec strategies, hardware
//!   acceleration, entity states, and stop reasons
//! - **Path Utilities**: Functions to recognise and clear stream artifacts
//! - **Error Handling**: The supervision error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use camstream_common::{CodecPreference, CodecStrategy, Error, Quality, Result};
//! use camstream_common::paths::is_stream_artifact;
//! use std::path::Path;
//!
//! let pref: CodecPreference = "auto".parse().unwrap();
//! assert_eq!(pref, CodecPreference::Auto);
//!
//! let quality: Quality = "Medium".parse().unwrap();
//! assert_eq!(quality, Quality::Medium);
//!
//! assert!(is_stream_artifact(Path::new("stream.m3u8")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::start_failure(CodecStrategy::Copy, "encoder missing"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
