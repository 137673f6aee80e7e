//! Lifecycle notifications to the automation platform.
//!
//! Everything here is best-effort: the wrappers log failures and return
//! nothing, so supervision never depends on the notifier being reachable.

pub mod homeassistant;

pub use homeassistant::{HaAuth, HomeAssistantClient};

use crate::config::Config;
use async_trait::async_trait;
use camstream_common::{CodecStrategy, EntityState, Quality, Result, StopReason};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;

/// Sink for stream lifecycle signals.
#[async_trait]
pub trait LifecycleNotifier: Send + Sync {
    /// `false` when the integration has no credentials and every call is a no-op.
    fn is_enabled(&self) -> bool;

    /// Fire a platform event of `event_type` with `payload`.
    async fn fire_event(&self, event_type: &str, payload: serde_json::Value) -> Result<()>;

    /// Set `entity_id` to `state` with `attributes`.
    async fn set_state(
        &self,
        entity_id: &str,
        state: EntityState,
        attributes: serde_json::Value,
    ) -> Result<()>;
}

/// Turns supervisor transitions into event + state pairs.
#[derive(Clone)]
pub struct StreamNotifier {
    sink: Arc<dyn LifecycleNotifier>,
    entity_id: String,
    event_prefix: String,
    friendly_name: String,
    quality: Quality,
    playlist_url: String,
}

impl StreamNotifier {
    pub fn new(sink: Arc<dyn LifecycleNotifier>, config: &Config) -> Self {
        Self {
            sink,
            entity_id: config.notifier.entity_id.clone(),
            event_prefix: config.notifier.event_prefix.clone(),
            friendly_name: config.notifier.friendly_name.clone(),
            quality: config.stream.quality,
            playlist_url: config.playlist_url(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_enabled()
    }

    /// Publish an "off" state so the entity exists before the first stream.
    pub async fn announce_initial(&self) {
        if !self.sink.is_enabled() {
            return;
        }
        let attrs = json!({
            "friendly_name": self.friendly_name,
            "device_class": "running",
        });
        let result = self
            .sink
            .set_state(&self.entity_id, EntityState::Off, attrs)
            .await;
        log_failure("set state", result);
    }

    /// Report that `camera` is streaming with `codec`.
    pub async fn signal_playing(&self, camera: &str, codec: CodecStrategy) {
        if !self.sink.is_enabled() {
            return;
        }
        let event = format!("{}_started", self.event_prefix);
        let payload = json!({
            "camera": camera,
            "quality": self.quality,
            "codec": codec,
            "playlist": self.playlist_url,
        });
        let attrs = json!({
            "friendly_name": self.friendly_name,
            "device_class": "running",
            "camera": camera,
            "quality": self.quality,
            "codec": codec,
            "playlist": self.playlist_url,
            "last_change": now(),
        });

        let (fired, set) = tokio::join!(
            self.sink.fire_event(&event, payload),
            self.sink.set_state(&self.entity_id, EntityState::On, attrs),
        );
        log_failure("fire event", fired);
        log_failure("set state", set);
    }

    /// Report that `camera` stopped for `reason`.
    pub async fn signal_stopped(&self, camera: &str, reason: StopReason) {
        if !self.sink.is_enabled() {
            return;
        }
        let event = format!("{}_stopped", self.event_prefix);
        let payload = json!({
            "camera": camera,
            "reason": reason,
        });
        let attrs = json!({
            "friendly_name": self.friendly_name,
            "device_class": "running",
            "camera": camera,
            "reason": reason,
            "last_change": now(),
        });

        let (fired, set) = tokio::join!(
            self.sink.fire_event(&event, payload),
            self.sink.set_state(&self.entity_id, EntityState::Off, attrs),
        );
        log_failure("fire event", fired);
        log_failure("set state", set);
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn log_failure(what: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "Notifier {} failed", what);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camstream_common::Error;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, serde_json::Value)>>,
        fail: bool,
    }

    #[async_trait]
    impl LifecycleNotifier for Recorder {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn fire_event(&self, event_type: &str, payload: serde_json::Value) -> Result<()> {
            self.calls.lock().push((format!("event:{event_type}"), payload));
            if self.fail {
                return Err(Error::notifier("HTTP 500"));
            }
            Ok(())
        }

        async fn set_state(
            &self,
            entity_id: &str,
            state: EntityState,
            attributes: serde_json::Value,
        ) -> Result<()> {
            self.calls
                .lock()
                .push((format!("state:{entity_id}={state}"), attributes));
            if self.fail {
                return Err(Error::notifier("HTTP 500"));
            }
            Ok(())
        }
    }

    fn notifier(recorder: Arc<Recorder>) -> StreamNotifier {
        let mut config = Config::default();
        config.notifier.event_prefix = "front".to_string();
        config.notifier.entity_id = "binary_sensor.front_live".to_string();
        StreamNotifier::new(recorder, &config)
    }

    #[tokio::test]
    async fn playing_sends_event_and_state() {
        let recorder = Arc::new(Recorder::default());
        notifier(recorder.clone())
            .signal_playing("Front Door", CodecStrategy::HardwareH264)
            .await;

        let calls = recorder.calls.lock();
        assert_eq!(calls.len(), 2);

        let event = calls.iter().find(|(k, _)| k == "event:front_started").unwrap();
        assert_eq!(event.1["camera"], "Front Door");
        assert_eq!(event.1["codec"], "h264_v4l2m2m");
        assert_eq!(event.1["quality"], "high");
        assert_eq!(
            event.1["playlist"],
            "http://homeassistant.local:8080/public/stream.m3u8"
        );

        let state = calls
            .iter()
            .find(|(k, _)| k == "state:binary_sensor.front_live=on")
            .unwrap();
        assert_eq!(state.1["device_class"], "running");
        assert!(state.1["last_change"].is_string());
    }

    #[tokio::test]
    async fn stopped_carries_reason() {
        let recorder = Arc::new(Recorder::default());
        notifier(recorder.clone())
            .signal_stopped("Front Door", StopReason::ErrorOrStall)
            .await;

        let calls = recorder.calls.lock();
        let event = calls.iter().find(|(k, _)| k == "event:front_stopped").unwrap();
        assert_eq!(event.1["reason"], "error_or_stall");
        assert!(calls
            .iter()
            .any(|(k, v)| k == "state:binary_sensor.front_live=off" && v["reason"] == "error_or_stall"));
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let n = notifier(recorder.clone());
        n.announce_initial().await;
        n.signal_stopped("Front Door", StopReason::Shutdown).await;
        assert_eq!(recorder.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn disabled_sink_is_skipped() {
        let n = StreamNotifier::new(Arc::new(HomeAssistantClient::new(None)), &Config::default());
        assert!(!n.is_enabled());
        n.signal_playing("cam", CodecStrategy::Copy).await;
    }
}
