//! Transcoder process launch and the stop capability.
//!
//! Camera sources hand back whatever they use to control a running stream:
//! a child process they spawned, a callback into their own client, or
//! nothing at all. [`StopCapability`] folds those shapes into one value with
//! a single `stop` operation.

use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Default time a freshly spawned transcoder must survive to count as started.
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_millis(1500);

/// How long to wait for a killed child to be reaped.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// The one way the supervisor can end a running stream.
pub enum StopCapability {
    /// A transcoder child owned by us.
    Child(Child),
    /// A stop hook supplied by the camera source.
    Callback(Box<dyn FnOnce() + Send + 'static>),
    /// The source offered nothing to stop.
    Noop,
}

impl StopCapability {
    /// Wrap a plain stop function.
    pub fn from_fn(f: impl FnOnce() + Send + 'static) -> Self {
        Self::Callback(Box::new(f))
    }

    /// Process id of the child, if this capability owns one that is still running.
    pub fn pid(&self) -> Option<u32> {
        match self {
            Self::Child(child) => child.id(),
            _ => None,
        }
    }

    /// Stop the stream, consuming the capability.
    ///
    /// A child that has already exited is only reaped.
    pub async fn stop(self) -> Result<()> {
        match self {
            Self::Child(mut child) => {
                if child.try_wait()?.is_some() {
                    return Ok(());
                }
                child.start_kill()?;
                match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
                    Ok(status) => {
                        let _status = status?;
                        #[cfg(feature = "tracing")]
                        tracing::debug!("Transcoder exited with {}", _status);
                    }
                    Err(_) => {
                        return Err(Error::tool_failed(
                            "transcoder",
                            format!("not reaped within {:?} after kill", STOP_TIMEOUT),
                        ));
                    }
                }
            }
            Self::Callback(f) => f(),
            Self::Noop => {}
        }
        Ok(())
    }
}

impl fmt::Debug for StopCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Child(child) => f.debug_tuple("Child").field(&child.id()).finish(),
            Self::Callback(_) => f.write_str("Callback"),
            Self::Noop => f.write_str("Noop"),
        }
    }
}

/// A builder for launching a long-running transcoder.
///
/// # Example
///
/// ```no_run
/// use camstream_av::TranscoderCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> camstream_av::Result<()> {
/// let stop = TranscoderCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-i").arg("rtsp://camera.local/stream")
///     .args(["-c:v", "copy", "-f", "hls", "/tmp/out/stream.m3u8"])
///     .spawn()
///     .await?;
/// stop.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TranscoderCommand {
    program: PathBuf,
    args: Vec<String>,
    startup_grace: Duration,
}

impl TranscoderCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            startup_grace: DEFAULT_STARTUP_GRACE,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set how long the process must stay alive before `spawn` returns.
    pub fn startup_grace(&mut self, d: Duration) -> &mut Self {
        self.startup_grace = d;
        self
    }

    /// Arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Spawn the process and wait out the startup grace period.
    ///
    /// stderr is forwarded line by line to the log at debug level. The child
    /// is killed if the returned capability is dropped without `stop`.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolFailed`] if spawning fails.
    /// - [`Error::ProcessExited`] if the process exits within the grace period,
    ///   e.g. when an encoder is missing or the input cannot be opened.
    pub async fn spawn(&self) -> Result<StopCapability> {
        let program_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool_failed(&program_name, format!("failed to spawn: {e}")))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(program_name.clone(), stderr));
        }

        if !self.startup_grace.is_zero() {
            match tokio::time::timeout(self.startup_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    return Err(Error::ProcessExited {
                        tool: program_name,
                        status,
                    });
                }
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_still_running) => {}
            }
        }

        Ok(StopCapability::Child(child))
    }
}

async fn forward_stderr(_program: String, stderr: tokio::process::ChildStderr) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(_line)) = lines.next_line().await {
        #[cfg(feature = "tracing")]
        tracing::debug!(tool = %_program, "{}", _line);
    }
}
