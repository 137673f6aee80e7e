use camstream_common::paths::MANIFEST_FILE;
use camstream_common::{CodecPreference, HwAccel, Quality};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub cameras: Vec<CameraConfig>,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl Config {
    /// Path of the manifest the transcoder keeps rewriting.
    pub fn manifest_path(&self) -> PathBuf {
        self.server.output_dir.join(MANIFEST_FILE)
    }

    /// URL advertised to the notifier for playback.
    pub fn playlist_url(&self) -> String {
        format!(
            "http://{}:{}/public/{}",
            self.server.public_host, self.server.port, MANIFEST_FILE
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory the transcoder writes into and `/public` serves.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Host name used when advertising the playlist URL
    #[serde(default = "default_public_host")]
    pub public_host: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("/var/lib/camstream/public")
}
fn default_public_host() -> String {
    "homeassistant.local".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            output_dir: default_output_dir(),
            public_host: default_public_host(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Credential substituted for `{token}` in camera inputs.
    #[serde(default)]
    pub token: Option<String>,

    /// Camera to stream; the first configured camera when unset.
    #[serde(default)]
    pub camera: Option<String>,

    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// How long the transcoder must survive before a start counts as successful
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,
}

fn default_startup_grace_ms() -> u64 {
    1500
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            token: None,
            camera: None,
            ffmpeg_path: None,
            startup_grace_ms: default_startup_grace_ms(),
        }
    }
}

impl SourceConfig {
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CameraConfig {
    pub name: String,

    /// ffmpeg input, e.g. an RTSP URL. May reference `{token}` and `{camera}`.
    pub input: String,

    /// Extra arguments placed before `-i`
    #[serde(default)]
    pub input_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub quality: Quality,

    #[serde(default)]
    pub codec: CodecPreference,

    #[serde(default)]
    pub hwaccel: HwAccel,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,

    /// Manifest age above which `/health` reports unhealthy
    #[serde(default = "default_liveness_threshold")]
    pub liveness_threshold_secs: u64,

    /// Abort a session whose manifest never appears. 0 disables the check.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_backoff_base() -> u64 {
    3000
}
fn default_backoff_max() -> u64 {
    30000
}
fn default_liveness_threshold() -> u64 {
    15
}
fn default_startup_timeout() -> u64 {
    30
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            codec: CodecPreference::default(),
            hwaccel: HwAccel::default(),
            poll_interval_secs: default_poll_interval(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            liveness_threshold_secs: default_liveness_threshold(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn liveness_threshold(&self) -> Duration {
        Duration::from_secs(self.liveness_threshold_secs)
    }

    pub fn startup_timeout(&self) -> Option<Duration> {
        (self.startup_timeout_secs > 0).then(|| Duration::from_secs(self.startup_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Report stream state to Home Assistant
    #[serde(default = "default_notifier_enabled")]
    pub enabled: bool,

    #[serde(default = "default_entity_id")]
    pub entity_id: String,

    /// Events are fired as `{prefix}_started` / `{prefix}_stopped`
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,

    #[serde(default = "default_friendly_name")]
    pub friendly_name: String,

    /// Core API base for running outside the supervisor, e.g. `http://ha.local:8123/api`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Long-lived access token paired with `base_url`
    #[serde(default)]
    pub token: Option<String>,
}

fn default_notifier_enabled() -> bool {
    true
}
fn default_entity_id() -> String {
    "binary_sensor.camstream_playing".to_string()
}
fn default_event_prefix() -> String {
    "camstream".to_string()
}
fn default_friendly_name() -> String {
    "Camera Livestream Playing".to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifier_enabled(),
            entity_id: default_entity_id(),
            event_prefix: default_event_prefix(),
            friendly_name: default_friendly_name(),
            base_url: None,
            token: None,
        }
    }
}

/// Values supplied on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub output_dir: Option<PathBuf>,
    pub token: Option<String>,
    pub camera: Option<String>,
    pub quality: Option<Quality>,
    pub codec: Option<CodecPreference>,
    pub hwaccel: Option<HwAccel>,
    pub notifier_enabled: Option<bool>,
    pub entity_id: Option<String>,
    pub event_prefix: Option<String>,
}
