//! Shared test harness for integration tests.
//!
//! [`TestHarness`] owns a temporary output directory and a config pointing at
//! it. [`FakeSource`] and [`Recorder`] stand in for the camera source and the
//! Home Assistant sink so the supervisor loop can run under paused time.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use camstream::camera::{CameraIdentity, CameraSource};
use camstream::config::Config;
use camstream::notifications::{HomeAssistantClient, LifecycleNotifier};
use camstream::server::{self, AppContext};
use camstream::supervisor::SupervisorStatus;
use camstream_av::StopCapability;
use camstream_common::{CodecStrategy, EntityState, Error, Result};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Temp output directory plus a config that writes into it.
pub struct TestHarness {
    pub dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.output_dir = dir.path().join("public");
        config.notifier.enabled = false;
        std::fs::create_dir_all(&config.server.output_dir).expect("failed to create output dir");
        Self { dir, config }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.server.output_dir
    }

    pub fn manifest(&self) -> PathBuf {
        self.config.manifest_path()
    }

    pub fn ctx(
        &self,
        ha: HomeAssistantClient,
        status: Option<watch::Receiver<SupervisorStatus>>,
    ) -> AppContext {
        AppContext {
            config: Arc::new(self.config.clone()),
            camera: "Front Door".to_string(),
            status,
            ha: Arc::new(ha),
        }
    }

    /// Serve `ctx` on a random port until the returned token is cancelled.
    pub async fn with_server(ctx: AppContext) -> (SocketAddr, CancellationToken) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            server::serve(listener, ctx, token).await.ok();
        });

        (addr, cancel)
    }
}

/// Write a manifest at `path` with the given modification time.
pub fn write_manifest(path: &Path, modified: SystemTime) {
    std::fs::write(path, "#EXTM3U\n#EXT-X-TARGETDURATION:2\n").expect("write manifest");
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(modified))
        .expect("set mtime");
}

pub fn epoch_plus(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// What a successful attach does with the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Attach fails.
    Fail,
    /// Rewrites the manifest every second.
    Healthy,
    /// Writes the manifest once and never again.
    Stall,
    /// Never writes anything.
    Silent,
}

/// Scripted camera source. Strategies in `failing` always fail to attach;
/// other attaches consume `script` front to back, repeating the last entry.
pub struct FakeSource {
    pub manifest: PathBuf,
    pub failing: Vec<CodecStrategy>,
    script: Mutex<VecDeque<Behavior>>,
    pub attempts: Mutex<Vec<(CodecStrategy, Instant)>>,
    pub stops: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(manifest: PathBuf, script: &[Behavior]) -> Self {
        Self {
            manifest,
            failing: Vec::new(),
            script: Mutex::new(script.iter().copied().collect()),
            attempts: Mutex::new(Vec::new()),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(mut self, strategies: &[CodecStrategy]) -> Self {
        self.failing = strategies.to_vec();
        self
    }

    pub fn attempted(&self) -> Vec<CodecStrategy> {
        self.attempts.lock().iter().map(|(s, _)| *s).collect()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn next_behavior(&self) -> Behavior {
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.pop_front().unwrap_or(Behavior::Fail)
        } else {
            script.front().copied().unwrap_or(Behavior::Fail)
        }
    }
}

fn strategy_of(args: &[String]) -> CodecStrategy {
    let codec = args
        .iter()
        .position(|a| a == "-c:v")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str);
    match codec {
        Some("copy") => CodecStrategy::Copy,
        Some("h264_v4l2m2m") => CodecStrategy::HardwareH264,
        _ => CodecStrategy::SoftwareH264,
    }
}

#[async_trait]
impl CameraSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn enumerate(&self) -> Result<Vec<CameraIdentity>> {
        Ok(vec![CameraIdentity {
            id: "fake-0".to_string(),
            name: "Front Door".to_string(),
        }])
    }

    async fn attach(&self, _camera: &CameraIdentity, args: &[String]) -> Result<StopCapability> {
        let strategy = strategy_of(args);
        self.attempts.lock().push((strategy, Instant::now()));

        if self.failing.contains(&strategy) {
            return Err(Error::attach(format!("{} unsupported", strategy)));
        }

        let writer = match self.next_behavior() {
            Behavior::Fail => return Err(Error::attach("source unavailable")),
            Behavior::Silent => None,
            Behavior::Stall => {
                write_manifest(&self.manifest, epoch_plus(1_000));
                None
            }
            Behavior::Healthy => {
                let manifest = self.manifest.clone();
                Some(tokio::spawn(async move {
                    for tick in 0u64.. {
                        write_manifest(&manifest, epoch_plus(2_000 + tick));
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }))
            }
        };

        let stops = self.stops.clone();
        Ok(StopCapability::from_fn(move || {
            if let Some(writer) = writer {
                writer.abort();
            }
            stops.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

/// One call the notifier received.
#[derive(Debug, Clone)]
pub enum Call {
    Event(String, serde_json::Value),
    State(String, EntityState, serde_json::Value),
}

/// Notifier sink that records every call.
#[derive(Default)]
pub struct Recorder {
    pub calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Event(name, payload) => Some((name.clone(), payload.clone())),
                Call::State(..) => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<EntityState> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::State(_, state, _) => Some(*state),
                Call::Event(..) => None,
            })
            .collect()
    }
}

#[async_trait]
impl LifecycleNotifier for Recorder {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn fire_event(&self, event_type: &str, payload: serde_json::Value) -> Result<()> {
        self.calls
            .lock()
            .push(Call::Event(event_type.to_string(), payload));
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
            .push(Call::State(entity_id.to_string(), state, attributes));
        Ok(())
    }
}
