use crate::camera::{CameraIdentity, CameraSource};
use camstream_av::{CodecCandidate, StopCapability};
use camstream_common::{CodecStrategy, Error, Result};
use std::path::Path;

/// A running transcode started from one codec candidate.
#[derive(Debug)]
pub struct ProcessHandle {
    codec: CodecStrategy,
    stop: Option<StopCapability>,
}

impl ProcessHandle {
    /// Attach `camera` with the candidate's arguments writing to `target`.
    ///
    /// Any failure from the source is reported as [`Error::StartFailure`]
    /// for this candidate's codec.
    pub async fn start(
        source: &dyn CameraSource,
        camera: &CameraIdentity,
        candidate: &CodecCandidate,
        target: &Path,
    ) -> Result<Self> {
        let args = candidate.output_args(target);
        match source.attach(camera, &args).await {
            Ok(stop) => {
                tracing::debug!(
                    camera = %camera.name,
                    codec = %candidate.strategy,
                    pid = ?stop.pid(),
                    "Transcoder attached"
                );
                Ok(Self {
                    codec: candidate.strategy,
                    stop: Some(stop),
                })
            }
            Err(e) => Err(Error::start_failure(candidate.strategy, e.to_string())),
        }
    }

    pub fn codec(&self) -> CodecStrategy {
        self.codec
    }

    /// Stop the transcode. Later calls do nothing.
    pub async fn stop(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };
        if let Err(e) = stop.stop().await {
            tracing::warn!(codec = %self.codec, error = %e, "Failed to stop transcoder");
        }
    }
}
