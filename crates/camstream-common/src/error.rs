//! Common error types used throughout camstream.
//!
//! The variants mirror how the supervisor treats each failure: start failures
//! are retried against the next codec candidate, cycle-level failures are
//! absorbed into backoff, notifier failures are only logged, and setup
//! failures end the process.

use crate::types::CodecStrategy;
use std::time::Duration;

/// Common error type for camstream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single codec candidate could not be started.
    #[error("Start failed with codec={codec}: {message}")]
    StartFailure {
        codec: CodecStrategy,
        message: String,
    },

    /// Every codec candidate failed within one cycle.
    #[error("No codec worked ({attempts} candidates tried)")]
    CycleExhausted { attempts: usize },

    /// The manifest stopped advancing between two polls.
    #[error("HLS stalled: manifest unchanged for {unchanged_for:?}")]
    StallDetected { unchanged_for: Duration },

    /// The transcoder never produced a manifest within the startup timeout.
    #[error("No manifest produced within {0:?}")]
    StartupTimeout(Duration),

    /// A notifier call failed. Never propagated past the notifier wrapper.
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// The camera source returned no cameras.
    #[error("No cameras found")]
    NoCamerasFound,

    /// The configured camera name matched nothing.
    #[error("Camera \"{name}\" not found. Have: {}", available.join(", "))]
    CameraNotFound {
        name: String,
        available: Vec<String>,
    },

    /// The camera source could not attach its stream to the transcoder.
    #[error("Attach failed: {0}")]
    AttachFailure(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new StartFailure error.
    pub fn start_failure<S: Into<String>>(codec: CodecStrategy, msg: S) -> Self {
        Self::StartFailure {
            codec,
            message: msg.into(),
        }
    }

    /// Create a new Notifier error.
    pub fn notifier<S: Into<String>>(msg: S) -> Self {
        Self::Notifier(msg.into())
    }

    /// Create a new AttachFailure error.
    pub fn attach<S: Into<String>>(msg: S) -> Self {
        Self::AttachFailure(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
