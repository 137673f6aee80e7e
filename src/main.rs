mod cli;

use camstream::{
    camera::{self, CameraSource, FfmpegCameraSource},
    config::{self, Config, ConfigOverrides},
    notifications::{HomeAssistantClient, StreamNotifier},
    server::{self, AppContext},
    supervisor::Supervisor,
};
use camstream_common::StopReason;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Config> {
    let mut config = config::load_config_or_default(config_path)?;
    config::apply_overrides(&mut config, overrides);
    config::validate_config(&config)?;
    Ok(config)
}

async fn start(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let ha = Arc::new(HomeAssistantClient::from_config(&config.notifier));
    let notifier = StreamNotifier::new(ha.clone(), &config);

    let source: Arc<dyn CameraSource> = match FfmpegCameraSource::new(&config) {
        Ok(source) => Arc::new(source),
        Err(e) => return fatal(&notifier, "(none)", e.into()).await,
    };

    let camera =
        match camera::select_camera(source.as_ref(), config.source.camera.as_deref()).await {
            Ok(camera) => camera,
            Err(e) => {
                let name = config.source.camera.as_deref().unwrap_or("(first)");
                return fatal(&notifier, name, e.into()).await;
            }
        };

    tracing::info!(
        camera = %camera.name,
        source = source.name(),
        quality = %config.stream.quality,
        codec = %config.stream.codec,
        "Starting camstream"
    );
    tracing::info!("Playlist available at {}", config.playlist_url());

    let cancel = CancellationToken::new();
    let supervisor = Supervisor::new(
        &config,
        source.clone(),
        camera.clone(),
        notifier,
        cancel.clone(),
    );

    let ctx = AppContext {
        config: config.clone(),
        camera: camera.name.clone(),
        status: Some(supervisor.subscribe()),
        ha,
    };

    let supervisor_handle = tokio::spawn(supervisor.run());
    let server_handle = tokio::spawn(server::start_server(ctx, cancel.clone()));
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let server_result = match server_handle.await {
        Ok(result) => result,
        Err(e) => Err(e.into()),
    };

    // A server that failed to bind must still take the supervisor down.
    cancel.cancel();
    if let Err(e) = supervisor_handle.await {
        tracing::error!("Supervisor task failed: {}", e);
    }

    tracing::info!("Shutdown complete");
    server_result
}

/// Report a setup failure and give up.
async fn fatal(notifier: &StreamNotifier, camera: &str, err: anyhow::Error) -> Result<()> {
    tracing::error!("Fatal: {:#}", err);
    notifier.signal_stopped(camera, StopReason::Fatal).await;
    Err(err)
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => return,
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose || cli.debug {
            "camstream=trace,camstream_av=trace,camstream_common=debug,tower_http=debug".to_string()
        } else {
            "camstream=info,camstream_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start(args) => {
            let config = load(cli.config.as_deref(), args.into())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(config))
        }
        Commands::Cameras(args) => {
            let config = load(cli.config.as_deref(), args.into())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list_cameras(config))
        }
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("camstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn list_cameras(config: Config) -> Result<()> {
    let source = FfmpegCameraSource::new(&config)?;
    let cameras = source.enumerate().await?;
    let selected = config.source.camera.as_deref().map(str::to_lowercase);

    for cam in cameras {
        let marker = if selected.as_deref() == Some(cam.name.to_lowercase().as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {} ({})", marker, cam.name, cam.id);
    }
    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = camstream_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Install it before starting a stream.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Output: {}", config.server.output_dir.display());
    println!("  Cameras: {}", config.cameras.len());
    for cam in &config.cameras {
        println!("    - {}", cam.name);
    }
    println!(
        "  Stream: quality={} codec={} hwaccel={}",
        config.stream.quality, config.stream.codec, config.stream.hwaccel
    );
    println!(
        "  Home Assistant: {}",
        if config.notifier.enabled {
            config.notifier.entity_id.as_str()
        } else {
            "disabled"
        }
    );

    Ok(())
}
