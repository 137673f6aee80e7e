use super::LifecycleNotifier;
use crate::config::NotifierConfig;
use async_trait::async_trait;
use camstream_common::{EntityState, Error, Result};
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Core API proxy reachable from inside a Home Assistant add-on.
pub const SUPERVISOR_BASE: &str = "http://supervisor/core/api";

/// Environment variable the supervisor injects into add-ons.
pub const SUPERVISOR_TOKEN_ENV: &str = "SUPERVISOR_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Supervisor,
    User,
}

#[derive(Debug, Clone)]
pub struct HaAuth {
    base: String,
    token: String,
    mode: AuthMode,
}

impl HaAuth {
    /// Pick credentials: the supervisor token first, then a configured base URL and token.
    pub fn resolve(supervisor_token: Option<&str>, config: &NotifierConfig) -> Option<Self> {
        if let Some(token) = supervisor_token.filter(|t| !t.is_empty()) {
            return Some(Self {
                base: SUPERVISOR_BASE.to_string(),
                token: token.to_string(),
                mode: AuthMode::Supervisor,
            });
        }

        match (config.base_url.as_deref(), config.token.as_deref()) {
            (Some(base), Some(token)) if !base.is_empty() && !token.is_empty() => Some(Self {
                base: base.trim_end_matches('/').to_string(),
                token: token.to_string(),
                mode: AuthMode::User,
            }),
            _ => None,
        }
    }

    /// Resolve using `SUPERVISOR_TOKEN` from the process environment.
    pub fn from_env(config: &NotifierConfig) -> Option<Self> {
        let token = std::env::var(SUPERVISOR_TOKEN_ENV).ok();
        Self::resolve(token.as_deref(), config)
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }
}

/// Home Assistant REST client for events and entity state.
///
/// Without credentials every call succeeds without doing anything.
pub struct HomeAssistantClient {
    client: Client,
    auth: Option<HaAuth>,
}

impl HomeAssistantClient {
    pub fn new(auth: Option<HaAuth>) -> Self {
        let client = Client::builder()
            .timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self { client, auth }
    }

    /// Build the client for the configured integration.
    pub fn from_config(config: &NotifierConfig) -> Self {
        if !config.enabled {
            tracing::info!("Home Assistant integration disabled");
            return Self::new(None);
        }

        let auth = HaAuth::from_env(config);
        match &auth {
            Some(a) => tracing::info!(mode = ?a.mode, "Home Assistant integration enabled"),
            None => tracing::warn!(
                "No Home Assistant auth available: {} not set and no base_url/token configured; integration disabled",
                SUPERVISOR_TOKEN_ENV
            ),
        }
        Self::new(auth)
    }

    pub fn mode(&self) -> Option<AuthMode> {
        self.auth.as_ref().map(|a| a.mode)
    }

    /// Check the API answers, returning up to five top-level keys of `GET /`.
    pub async fn ping(&self) -> Result<Vec<String>> {
        let body = self.get_json(&[""]).await?;

        Ok(body
            .as_object()
            .map(|obj| obj.keys().take(5).cloned().collect())
            .unwrap_or_default())
    }

    /// The instance configuration from `GET /config`, passed through as-is.
    pub async fn config(&self) -> Result<serde_json::Value> {
        self.get_json(&["config"]).await
    }

    async fn get_json(&self, segments: &[&str]) -> Result<serde_json::Value> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| Error::notifier("no_auth"))?;
        let url = endpoint(&auth.base, segments)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&auth.token)
            .send()
            .await
            .map_err(|e| Error::notifier(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::notifier(format!("HTTP {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| Error::notifier(e.to_string()))
    }

    async fn post(&self, auth: &HaAuth, segments: &[&str], body: &serde_json::Value) -> Result<()> {
        let url = endpoint(&auth.base, segments)?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&auth.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::notifier(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::debug!(
                mode = ?auth.mode,
                path = %segments.join("/"),
                "Home Assistant request failed"
            );
            return Err(Error::notifier(format!("HTTP {}", status)));
        }

        Ok(())
    }
}

#[async_trait]
impl LifecycleNotifier for HomeAssistantClient {
    fn is_enabled(&self) -> bool {
        self.auth.is_some()
    }

    async fn fire_event(&self, event_type: &str, payload: serde_json::Value) -> Result<()> {
        let Some(auth) = &self.auth else {
            return Ok(());
        };
        self.post(auth, &["events", event_type], &payload).await?;
        tracing::debug!(event = %event_type, "Event fired");
        Ok(())
    }

    async fn set_state(
        &self,
        entity_id: &str,
        state: EntityState,
        attributes: serde_json::Value,
    ) -> Result<()> {
        let Some(auth) = &self.auth else {
            return Ok(());
        };
        if !is_valid_entity_id(entity_id) {
            return Err(Error::notifier(format!("malformed entity id '{}'", entity_id)));
        }

        let body = serde_json::json!({
            "state": state.to_string(),
            "attributes": attributes,
        });
        self.post(auth, &["states", entity_id], &body).await?;
        tracing::debug!(entity = %entity_id, state = %state, "State set");
        Ok(())
    }
}

/// Append percent-encoded path segments to the API base.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| Error::notifier(format!("invalid base url '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::notifier(format!("base url '{}' cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `domain.object_id`, both halves lowercase alphanumerics and underscores.
pub fn is_valid_entity_id(entity_id: &str) -> bool {
    let valid_part = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };

    match entity_id.split_once('.') {
        Some((domain, object_id)) => valid_part(domain) && valid_part(object_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier_config(base_url: Option<&str>, token: Option<&str>) -> NotifierConfig {
        NotifierConfig {
            base_url: base_url.map(str::to_string),
            token: token.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_supervisor_token_wins() {
        let config = notifier_config(Some("http://ha.local:8123/api"), Some("user"));
        let auth = HaAuth::resolve(Some("super"), &config).unwrap();
        assert_eq!(auth.mode(), AuthMode::Supervisor);
        assert_eq!(auth.base, SUPERVISOR_BASE);
        assert_eq!(auth.token, "super");
    }

    #[test]
    fn test_user_token_fallback() {
        let config = notifier_config(Some("http://ha.local:8123/api/"), Some("user"));
        let auth = HaAuth::resolve(None, &config).unwrap();
        assert_eq!(auth.mode(), AuthMode::User);
        assert_eq!(auth.base, "http://ha.local:8123/api");

        let auth = HaAuth::resolve(Some(""), &config).unwrap();
        assert_eq!(auth.mode(), AuthMode::User);
    }

    #[test]
    fn test_no_auth() {
        assert!(HaAuth::resolve(None, &notifier_config(None, None)).is_none());
        assert!(HaAuth::resolve(None, &notifier_config(Some("http://x/api"), None)).is_none());
        assert!(HaAuth::resolve(None, &notifier_config(None, Some("t"))).is_none());
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = endpoint("http://supervisor/core/api", &["events", "cam stream/started"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://supervisor/core/api/events/cam%20stream%2Fstarted"
        );

        let url = endpoint("http://ha.local:8123/api/", &["states", "binary_sensor.x"]).unwrap();
        assert_eq!(url.as_str(), "http://ha.local:8123/api/states/binary_sensor.x");

        let url = endpoint("http://ha.local:8123/api", &[""]).unwrap();
        assert_eq!(url.as_str(), "http://ha.local:8123/api/");

        assert!(endpoint("not a url", &["x"]).is_err());
    }

    #[test]
    fn test_entity_id_validation() {
        assert!(is_valid_entity_id("binary_sensor.camstream_playing"));
        assert!(is_valid_entity_id("sensor.cam2"));
        assert!(!is_valid_entity_id("binary_sensor"));
        assert!(!is_valid_entity_id("Binary_Sensor.x"));
        assert!(!is_valid_entity_id(".x"));
        assert!(!is_valid_entity_id("sensor."));
        assert!(!is_valid_entity_id("sensor.front door"));
    }

    #[tokio::test]
    async fn test_disabled_client_is_noop() {
        let client = HomeAssistantClient::new(None);
        assert!(!client.is_enabled());
        client
            .fire_event("camstream_started", serde_json::json!({}))
            .await
            .unwrap();
        client
            .set_state("not valid", EntityState::On, serde_json::json!({}))
            .await
            .unwrap();
        assert!(client.ping().await.is_err());
    }
}
