mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./camstream.toml",
        "./config.toml",
        "~/.config/camstream/config.toml",
        "/etc/camstream/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Apply command-line overrides on top of a loaded config.
pub fn apply_overrides(config: &mut Config, overrides: ConfigOverrides) {
    if let Some(host) = overrides.host {
        config.server.host = host;
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    if let Some(dir) = overrides.output_dir {
        config.server.output_dir = dir;
    }
    if let Some(token) = overrides.token.filter(|t| !t.is_empty()) {
        config.source.token = Some(token);
    }
    if let Some(camera) = overrides.camera.filter(|c| !c.is_empty()) {
        config.source.camera = Some(camera);
    }
    if let Some(quality) = overrides.quality {
        config.stream.quality = quality;
    }
    if let Some(codec) = overrides.codec {
        config.stream.codec = codec;
    }
    if let Some(hwaccel) = overrides.hwaccel {
        config.stream.hwaccel = hwaccel;
    }
    if let Some(enabled) = overrides.notifier_enabled {
        config.notifier.enabled = enabled;
    }
    if let Some(entity_id) = overrides.entity_id {
        config.notifier.entity_id = entity_id;
    }
    if let Some(prefix) = overrides.event_prefix {
        config.notifier.event_prefix = prefix;
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.stream.poll_interval_secs == 0 {
        anyhow::bail!("stream.poll_interval_secs must be greater than 0");
    }

    if config.stream.backoff_base_ms == 0 {
        anyhow::bail!("stream.backoff_base_ms must be greater than 0");
    }

    if config.stream.backoff_base_ms > config.stream.backoff_max_ms {
        anyhow::bail!(
            "stream.backoff_base_ms ({}) exceeds stream.backoff_max_ms ({})",
            config.stream.backoff_base_ms,
            config.stream.backoff_max_ms
        );
    }

    for camera in &config.cameras {
        if camera.name.trim().is_empty() {
            anyhow::bail!("Camera with input '{}' has no name", camera.input);
        }
        if camera.input.trim().is_empty() {
            anyhow::bail!("Camera '{}' has no input", camera.name);
        }
    }

    if config.notifier.enabled && config.notifier.entity_id.trim().is_empty() {
        anyhow::bail!("Notifier is enabled but has no entity_id");
    }

    if config.notifier.base_url.is_some() != config.notifier.token.is_some() {
        tracing::warn!("notifier.base_url and notifier.token must be set together; ignoring both");
    }

    Ok(())
}
