use camstream::config::ConfigOverrides;
use camstream_common::{CodecPreference, HwAccel, Quality};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "camstream")]
#[command(author, version, about = "Camera to HLS livestream supervisor")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Alias for --verbose
    #[arg(long, global = true, hide = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream the selected camera and serve the HLS output
    Start(StreamArgs),

    /// List the cameras the configured source exposes
    Cameras(StreamArgs),

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (defaults to --config)
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

/// Flags that override the config file.
#[derive(Args, Debug, Default)]
pub struct StreamArgs {
    /// Credential substituted for {token} in camera inputs
    #[arg(long, env = "CAMSTREAM_SOURCE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Camera name to stream (case-insensitive); first camera when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Quality tier: low, medium or high
    #[arg(long)]
    pub quality: Option<Quality>,

    /// Codec preference: auto, copy, h264_v4l2m2m or h264
    #[arg(long)]
    pub codec: Option<CodecPreference>,

    /// Hardware acceleration: auto or none
    #[arg(long)]
    pub hwaccel: Option<HwAccel>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Report stream state to Home Assistant
    #[arg(long)]
    pub ha_integration: Option<bool>,

    /// Entity id to keep in sync with the stream state
    #[arg(long)]
    pub ha_entity: Option<String>,

    /// Prefix for the fired `_started` / `_stopped` events
    #[arg(long)]
    pub ha_prefix: Option<String>,

    /// Directory for the manifest and segments
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl From<StreamArgs> for ConfigOverrides {
    fn from(args: StreamArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            output_dir: args.output_dir,
            token: args.token,
            camera: args.name,
            quality: args.quality,
            codec: args.codec,
            hwaccel: args.hwaccel,
            notifier_enabled: args.ha_integration,
            entity_id: args.ha_entity,
            event_prefix: args.ha_prefix,
        }
    }
}
