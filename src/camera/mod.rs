//! Camera-source collaborator.
//!
//! A [`CameraSource`] knows which cameras exist and how to attach one of
//! them to a transcoder. The supervisor only ever sees the opaque
//! [`CameraIdentity`] and the [`StopCapability`] returned by `attach`.

pub mod ffmpeg;

pub use ffmpeg::FfmpegCameraSource;

use async_trait::async_trait;
use camstream_av::StopCapability;
use camstream_common::{Error, Result};
use serde::Serialize;

/// Opaque handle to one camera exposed by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraIdentity {
    /// Source-specific identifier.
    pub id: String,
    /// Display name, matched case-insensitively by [`select_camera`].
    pub name: String,
}

/// Async trait every camera backend implements.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Short, lowercase identifier for this source (e.g. `"ffmpeg"`).
    fn name(&self) -> &'static str;

    /// List available cameras.
    ///
    /// Fails with [`Error::NoCamerasFound`] when there are none.
    async fn enumerate(&self) -> Result<Vec<CameraIdentity>>;

    /// Start feeding `camera` into a transcoder configured with `output_args`.
    ///
    /// Fails with [`Error::AttachFailure`] if the stream cannot be started.
    async fn attach(&self, camera: &CameraIdentity, output_args: &[String])
        -> Result<StopCapability>;
}

/// Pick the camera to stream.
///
/// Without a name the first enumerated camera is used. Names are compared
/// case-insensitively.
pub async fn select_camera(source: &dyn CameraSource, name: Option<&str>) -> Result<CameraIdentity> {
    let mut cameras = source.enumerate().await?;
    if cameras.is_empty() {
        return Err(Error::NoCamerasFound);
    }

    let Some(wanted) = name.filter(|n| !n.is_empty()) else {
        let first = cameras.swap_remove(0);
        tracing::info!(camera = %first.name, "Using first camera");
        return Ok(first);
    };

    let wanted_lower = wanted.to_lowercase();
    match cameras.iter().position(|c| c.name.to_lowercase() == wanted_lower) {
        Some(idx) => Ok(cameras.swap_remove(idx)),
        None => Err(Error::CameraNotFound {
            name: wanted.to_string(),
            available: cameras.into_iter().map(|c| c.name).collect(),
        }),
    }
}
