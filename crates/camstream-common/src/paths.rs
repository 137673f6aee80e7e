//! Path utilities for the HLS output directory.
//!
//! The transcoder writes a manifest plus rolling segments into a single
//! directory. These helpers recognise those artifacts by extension and clear
//! leftovers from a previous run.

use std::path::Path;

/// Extensions written by the segmented-output muxer.
const STREAM_EXTENSIONS: &[&str] = &["m3u8", "ts", "m4s", "mp4"];

/// Name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "stream.m3u8";

/// Check if a path is a manifest or segment artifact.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use camstream_common::paths::is_stream_artifact;
///
/// assert!(is_stream_artifact(Path::new("stream.m3u8")));
/// assert!(is_stream_artifact(Path::new("/out/stream42.TS")));
/// assert!(!is_stream_artifact(Path::new("index.html")));
/// ```
pub fn is_stream_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| STREAM_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Create the output directory if needed and delete stream artifacts in it.
///
/// Non-artifact files are left alone. Individual delete failures are ignored;
/// the transcoder overwrites anything that survives.
///
/// Returns the number of files removed.
pub fn prepare_output_dir(dir: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dir)?;

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_stream_artifact(&path) && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }

    Ok(removed)
}
