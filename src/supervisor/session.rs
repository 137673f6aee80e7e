use crate::camera::CameraIdentity;
use camstream_common::CodecStrategy;
use chrono::{DateTime, Utc};

/// One start-to-stop run of the transcoder.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub camera: CameraIdentity,
    pub codec_used: Option<CodecStrategy>,
    pub started_at: DateTime<Utc>,
    announced: bool,
}

impl StreamSession {
    pub fn new(camera: CameraIdentity) -> Self {
        Self {
            camera,
            codec_used: None,
            started_at: Utc::now(),
            announced: false,
        }
    }

    /// Whether "playing" has been sent for this session.
    pub fn announced(&self) -> bool {
        self.announced
    }

    /// Returns `true` exactly once: the first time it is called.
    pub fn take_announcement(&mut self) -> bool {
        !std::mem::replace(&mut self.announced, true)
    }
}
