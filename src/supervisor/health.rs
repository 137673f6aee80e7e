//! Manifest freshness checks.
//!
//! The transcoder rewrites the manifest every segment, so its modification
//! time is the only liveness signal needed. Nothing here keeps state between
//! polls; the caller threads the previous mtime through.

use camstream_common::Result;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// What one poll says about the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No manifest yet.
    NotYetStarted,
    /// The manifest appeared since the previous poll.
    FirstSeen,
    /// The manifest was rewritten since the previous poll.
    Healthy,
    /// The manifest has the same mtime as last time.
    Stalled,
}

impl Classification {
    /// Whether the session has produced output.
    pub fn is_producing(&self) -> bool {
        matches!(self, Self::FirstSeen | Self::Healthy)
    }
}

/// Snapshot of the manifest on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistHealth {
    pub exists: bool,
    pub modified: Option<SystemTime>,
    pub age: Option<Duration>,
}

impl PlaylistHealth {
    /// Read the manifest metadata, computing age against `now`.
    ///
    /// A missing file is not an error.
    pub fn read_at(path: &Path, now: SystemTime) -> io::Result<Self> {
        match std::fs::metadata(path) {
            Ok(meta) => {
                let modified = meta.modified()?;
                Ok(Self {
                    exists: true,
                    modified: Some(modified),
                    // Clock skew can put mtime in the future; treat that as fresh.
                    age: Some(now.duration_since(modified).unwrap_or_default()),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self {
                exists: false,
                modified: None,
                age: None,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        Self::read_at(path, SystemTime::now())
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, Copy)]
pub struct Poll {
    /// mtime to pass as `previous` next time.
    pub current: Option<SystemTime>,
    pub classification: Classification,
    pub health: PlaylistHealth,
}

/// Classify a manifest mtime against the one seen on the previous poll.
pub fn classify(current: Option<SystemTime>, previous: Option<SystemTime>) -> Classification {
    match (current, previous) {
        (None, _) => Classification::NotYetStarted,
        (Some(_), None) => Classification::FirstSeen,
        (Some(cur), Some(prev)) if cur != prev => Classification::Healthy,
        (Some(_), Some(_)) => Classification::Stalled,
    }
}

/// Stat the manifest at `path` and classify it.
pub fn poll(path: &Path, previous: Option<SystemTime>) -> Result<Poll> {
    let health = PlaylistHealth::read(path)?;
    Ok(Poll {
        current: health.modified,
        classification: classify(health.modified, previous),
        health,
    })
}
