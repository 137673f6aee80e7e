//! The always-on stream control loop.
//!
//! One cycle is: clear old output, try codec candidates in order, then poll
//! the manifest until it stalls or errors. A failed cycle stops the
//! transcoder, reports "stopped" and sleeps for the backoff delay before the
//! next cycle. Cancelling the token ends the loop from any state.

pub mod backoff;
pub mod health;
pub mod process;
pub mod session;

pub use backoff::RestartScheduler;
pub use health::{Classification, PlaylistHealth, Poll};
pub use process::ProcessHandle;
pub use session::StreamSession;

use crate::camera::{CameraIdentity, CameraSource};
use crate::config::Config;
use crate::notifications::StreamNotifier;
use camstream_av::{candidates, CodecCandidate, EncodeSettings};
use camstream_common::paths::prepare_output_dir;
use camstream_common::{CodecStrategy, Error, StopReason};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Negotiating,
    Starting(CodecStrategy),
    Monitoring,
    Stalled,
    ProcessError,
    Stopping,
    BackingOff,
    ShuttingDown,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Starting(_) => "starting",
            Self::Monitoring => "monitoring",
            Self::Stalled => "stalled",
            Self::ProcessError => "process_error",
            Self::Stopping => "stopping",
            Self::BackingOff => "backing_off",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting(codec) => write!(f, "starting({})", codec),
            other => f.write_str(other.as_str()),
        }
    }
}

impl Serialize for SupervisorState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Read-only view of the loop, published on every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorStatus {
    pub state: SupervisorState,
    /// Codec of the running or starting transcoder.
    pub codec: Option<CodecStrategy>,
    /// Consecutive failed cycles.
    pub failures: u32,
    pub next_delay_ms: u64,
}

enum CycleEnd {
    Failed(Error),
    Cancelled,
}

/// What the loop does after one health poll.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    AnnouncePlaying,
    Abort(SupervisorState),
}

pub struct Supervisor {
    source: Arc<dyn CameraSource>,
    camera: CameraIdentity,
    notifier: StreamNotifier,
    candidates: Vec<CodecCandidate>,
    output_dir: PathBuf,
    manifest: PathBuf,
    poll_interval: Duration,
    startup_timeout: Option<Duration>,
    scheduler: RestartScheduler,
    status: watch::Sender<SupervisorStatus>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(
        config: &Config,
        source: Arc<dyn CameraSource>,
        camera: CameraIdentity,
        notifier: StreamNotifier,
        cancel: CancellationToken,
    ) -> Self {
        let settings = EncodeSettings {
            quality: config.stream.quality,
            hwaccel: config.stream.hwaccel,
        };
        let scheduler =
            RestartScheduler::new(config.stream.backoff_base(), config.stream.backoff_max());
        let (status, _) = watch::channel(SupervisorStatus {
            state: SupervisorState::Idle,
            codec: None,
            failures: 0,
            next_delay_ms: scheduler.next_delay().as_millis() as u64,
        });

        Self {
            source,
            camera,
            notifier,
            candidates: candidates(config.stream.codec, &settings),
            output_dir: config.server.output_dir.clone(),
            manifest: config.manifest_path(),
            poll_interval: config.stream.poll_interval(),
            startup_timeout: config.stream.startup_timeout(),
            scheduler,
            status,
            cancel,
        }
    }

    /// Receive status snapshots from the loop.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorStatus> {
        self.status.subscribe()
    }

    /// Run until the cancellation token fires.
    pub async fn run(mut self) {
        tracing::info!(
            camera = %self.camera.name,
            candidates = self.candidates.len(),
            "Supervisor starting"
        );
        self.notifier.announce_initial().await;

        while !self.cancel.is_cancelled() {
            match self.run_cycle().await {
                CycleEnd::Cancelled => break,
                CycleEnd::Failed(err) => {
                    tracing::warn!(camera = %self.camera.name, error = %err, "Stream cycle failed");
                    self.notifier
                        .signal_stopped(&self.camera.name, StopReason::ErrorOrStall)
                        .await;

                    let delay = self.scheduler.next_delay();
                    self.scheduler.fail();
                    self.set_state(SupervisorState::BackingOff, None);
                    tracing::info!("Restarting in {:?}", delay);
                    if !self.sleep(delay).await {
                        break;
                    }
                }
            }
        }

        self.set_state(SupervisorState::ShuttingDown, None);
        tracing::info!(camera = %self.camera.name, "Supervisor shutting down");
        self.notifier
            .signal_stopped(&self.camera.name, StopReason::Shutdown)
            .await;
    }

    async fn run_cycle(&mut self) -> CycleEnd {
        self.set_state(SupervisorState::Negotiating, None);
        match prepare_output_dir(&self.output_dir) {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Removed {} stale stream files", n),
            Err(e) => return CycleEnd::Failed(e.into()),
        }

        let mut handle = match self.negotiate().await {
            Ok(Some(handle)) => handle,
            Ok(None) => return CycleEnd::Cancelled,
            Err(e) => return CycleEnd::Failed(e),
        };

        let mut session = StreamSession::new(self.camera.clone());
        session.codec_used = Some(handle.codec());
        self.set_state(SupervisorState::Monitoring, session.codec_used);

        let end = self.monitor(&mut session).await;

        if !matches!(end, CycleEnd::Cancelled) {
            self.set_state(SupervisorState::Stopping, session.codec_used);
        }
        handle.stop().await;
        tracing::info!(
            camera = %session.camera.name,
            uptime_secs = (chrono::Utc::now() - session.started_at).num_seconds(),
            "Stream stopped"
        );
        end
    }

    /// Try each candidate in order. `Ok(None)` means cancelled mid-attempt.
    async fn negotiate(&self) -> Result<Option<ProcessHandle>, Error> {
        for candidate in &self.candidates {
            self.set_state(SupervisorState::Starting(candidate.strategy), Some(candidate.strategy));

            let started = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(None),
                result = ProcessHandle::start(
                    self.source.as_ref(),
                    &self.camera,
                    candidate,
                    &self.manifest,
                ) => result,
            };

            match started {
                Ok(handle) => {
                    tracing::info!(
                        camera = %self.camera.name,
                        codec = %candidate.strategy,
                        "Transcoder started"
                    );
                    return Ok(Some(handle));
                }
                Err(e) => tracing::warn!(codec = %candidate.strategy, error = %e, "Codec failed"),
            }
        }

        Err(Error::CycleExhausted {
            attempts: self.candidates.len(),
        })
    }

    async fn monitor(&mut self, session: &mut StreamSession) -> CycleEnd {
        let started = Instant::now();
        let mut previous = None;

        loop {
            if !self.sleep(self.poll_interval).await {
                return CycleEnd::Cancelled;
            }

            let poll = match health::poll(&self.manifest, previous) {
                Ok(poll) => poll,
                Err(e) => {
                    self.set_state(SupervisorState::ProcessError, session.codec_used);
                    return CycleEnd::Failed(e);
                }
            };
            tracing::trace!(classification = ?poll.classification, "Manifest polled");

            if poll.classification.is_producing() && self.scheduler.failures() > 0 {
                self.scheduler.reset();
                self.set_state(SupervisorState::Monitoring, session.codec_used);
            }

            match step(poll.classification, session, started.elapsed(), self.startup_timeout) {
                Step::Continue => {}
                Step::AnnouncePlaying => {
                    if let Some(codec) = session.codec_used {
                        tracing::info!(camera = %session.camera.name, codec = %codec, "Stream playing");
                        self.notifier.signal_playing(&session.camera.name, codec).await;
                    }
                }
                Step::Abort(state) => {
                    self.set_state(state, session.codec_used);
                    let err = match state {
                        SupervisorState::Stalled => Error::StallDetected {
                            unchanged_for: self.poll_interval,
                        },
                        _ => Error::StartupTimeout(started.elapsed()),
                    };
                    return CycleEnd::Failed(err);
                }
            }

            previous = poll.current;
        }
    }

    /// Sleep unless cancelled first. Returns `false` on cancellation.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn set_state(&self, state: SupervisorState, codec: Option<CodecStrategy>) {
        tracing::debug!(state = %state, "Supervisor transition");
        let failures = self.scheduler.failures();
        let next_delay_ms = self.scheduler.next_delay().as_millis() as u64;
        self.status.send_modify(|status| {
            status.state = state;
            status.codec = codec;
            status.failures = failures;
            status.next_delay_ms = next_delay_ms;
        });
    }
}

fn step(
    classification: Classification,
    session: &mut StreamSession,
    elapsed: Duration,
    startup_timeout: Option<Duration>,
) -> Step {
    match classification {
        Classification::NotYetStarted => match startup_timeout {
            Some(limit) if !session.announced() && elapsed >= limit => {
                Step::Abort(SupervisorState::ProcessError)
            }
            _ => Step::Continue,
        },
        Classification::FirstSeen | Classification::Healthy => {
            if session.take_announcement() {
                Step::AnnouncePlaying
            } else {
                Step::Continue
            }
        }
        Classification::Stalled => Step::Abort(SupervisorState::Stalled),
    }
}
