use crate::server::AppContext;
use crate::supervisor::PlaylistHealth;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, SystemTime};

pub fn status_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/ls", get(list_output))
        .route("/ha-ping", get(ha_ping))
        .route("/ha-me", get(ha_me))
}

/// Liveness of the manifest at `path` as of `now`.
///
/// Healthy only while the manifest is younger than `threshold`.
pub fn liveness_report(path: &Path, threshold: Duration, now: SystemTime) -> (StatusCode, Value) {
    let health = match PlaylistHealth::read_at(path, now) {
        Ok(h) => h,
        Err(e) => {
            tracing::debug!("Failed to stat manifest: {}", e);
            return no_playlist();
        }
    };

    let (Some(modified), Some(age)) = (health.modified, health.age) else {
        return no_playlist();
    };

    let ok = age < threshold;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let updated_at = DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Millis, true);

    (
        status,
        json!({
            "ok": ok,
            "age_ms": age.as_millis() as u64,
            "updated_at": updated_at,
        }),
    )
}

fn no_playlist() -> (StatusCode, Value) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "ok": false, "reason": "no_playlist" }),
    )
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let (status, body) = liveness_report(
        &ctx.config.manifest_path(),
        ctx.config.stream.liveness_threshold(),
        SystemTime::now(),
    );
    (status, Json(body))
}

async fn status(State(ctx): State<AppContext>) -> impl IntoResponse {
    let snapshot = ctx.status.as_ref().map(|rx| rx.borrow().clone());

    Json(json!({
        "camera": ctx.camera,
        "quality": ctx.config.stream.quality,
        "entity_id": ctx.config.notifier.entity_id,
        "playlist": ctx.config.manifest_path().exists(),
        "state": snapshot.as_ref().map(|s| s.state),
        "codec": snapshot.as_ref().and_then(|s| s.codec),
        "failures": snapshot.as_ref().map(|s| s.failures),
    }))
}

async fn list_output(State(ctx): State<AppContext>) -> impl IntoResponse {
    let dir = &ctx.config.server.output_dir;

    let listing = std::fs::read_dir(dir).and_then(|entries| {
        let mut files = entries
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<Vec<_>>>()?;
        files.sort();
        let realpath = std::fs::canonicalize(dir)?;
        Ok((files, realpath))
    });

    match listing {
        Ok((files, realpath)) => (
            StatusCode::OK,
            Json(json!({ "files": files, "realpath": realpath })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        ),
    }
}

async fn ha_ping(State(ctx): State<AppContext>) -> impl IntoResponse {
    let Some(mode) = ctx.ha.mode() else {
        return no_auth();
    };

    match ctx.ha.ping().await {
        Ok(keys) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "mode": mode, "keys": keys })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Home Assistant ping failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "ok": false, "reason": "unreachable", "error": e.to_string() })),
            )
        }
    }
}

async fn ha_me(State(ctx): State<AppContext>) -> impl IntoResponse {
    if ctx.ha.mode().is_none() {
        return no_auth();
    }

    match ctx.ha.config().await {
        Ok(config) => (StatusCode::OK, Json(config)),
        Err(e) => {
            tracing::warn!(error = %e, "Home Assistant config lookup failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "ok": false, "reason": "unreachable", "error": e.to_string() })),
            )
        }
    }
}

fn no_auth() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "reason": "no_auth" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = liveness_report(
            &dir.path().join("stream.m3u8"),
            Duration::from_secs(15),
            SystemTime::now(),
        );
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["reason"], "no_playlist");
    }

    #[test]
    fn test_stale_manifest_reports_age() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.m3u8");
        std::fs::write(&path, "#EXTM3U\n").unwrap();

        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();

        let now = modified + Duration::from_millis(20_000);
        let (status, body) = liveness_report(&path, Duration::from_secs(15), now);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["ok"], false);
        assert_eq!(body["age_ms"], 20_000);
        assert_eq!(body["updated_at"], "2023-11-14T22:13:20.000Z");

        let fresh = modified + Duration::from_secs(3);
        let (status, body) = liveness_report(&path, Duration::from_secs(15), fresh);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["age_ms"], 3_000);
    }
}
