//! Native monitor process supervision.
//!
//! On Unix the monitor's stdout and stderr are both attached to the write end
//! of one pipe, so lines arrive in the order the monitor wrote them. Elsewhere
//! each stream gets its own pipe and order is only kept within a stream.
//!
//! A small reader task drains the pipe(s) and pushes every line into one
//! bounded channel. When the channel is full the reader stops pulling and the
//! child's writes block, exactly as they would against a slow synchronous
//! reader.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use click_bridge::supervisor::MonitorProcess;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut monitor = MonitorProcess::spawn(Path::new("./macos_monitor_universal")).unwrap();
//!     while let Some(line) = monitor.next_line().await {
//!         println!("[Monitor] {line}");
//!     }
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Capacity of the merged line channel.
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// How long the monitor gets to exit after a graceful termination request.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Errors that can occur while supervising the monitor process.
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The monitor could not be started.
    #[error("failed to start monitor {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting for the monitor to exit failed.
    #[error("failed to wait for monitor: {0}")]
    Wait(#[source] io::Error),

    /// Force-killing the monitor failed.
    #[error("failed to kill monitor: {0}")]
    Kill(#[source] io::Error),
}

/// A running monitor process and its merged output stream.
#[derive(Debug)]
pub struct MonitorProcess {
    child: Child,
    lines: mpsc::Receiver<String>,
}

impl MonitorProcess {
    /// Starts the monitor binary at `path` with no arguments.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Spawn` if the process cannot be started.
    pub fn spawn(path: &Path) -> Result<Self, SupervisorError> {
        Self::spawn_command(Command::new(path))
    }

    /// Starts an arbitrary command as the monitor.
    ///
    /// Stdin is closed and stdout/stderr are captured regardless of how the
    /// command was configured.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Spawn` if the process cannot be started.
    pub fn spawn_command(mut command: Command) -> Result<Self, SupervisorError> {
        let program = PathBuf::from(command.as_std().get_program());
        let spawn_error = |source: io::Error| SupervisorError::Spawn {
            path: program.clone(),
            source,
        };

        command.stdin(Stdio::null()).kill_on_drop(true);
        let (tx, lines) = mpsc::channel(LINE_CHANNEL_CAPACITY);

        #[cfg(unix)]
        let child = {
            let (reader, writer) = io::pipe().map_err(spawn_error)?;
            command
                .stdout(Stdio::from(writer.try_clone().map_err(spawn_error)?))
                .stderr(Stdio::from(writer));

            let child = command.spawn().map_err(spawn_error)?;
            // The command still owns our copies of the write end; the reader
            // only sees EOF once they are gone.
            drop(command);

            let reader = tokio::net::unix::pipe::Receiver::from_owned_fd(reader.into())
                .map_err(spawn_error)?;
            tokio::spawn(pump_lines(reader, tx, "output"));
            child
        };

        #[cfg(not(unix))]
        let child = {
            let mut child = command
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(spawn_error)?;

            if let Some(stdout) = child.stdout.take() {
                tokio::spawn(pump_lines(stdout, tx.clone(), "stdout"));
            }
            if let Some(stderr) = child.stderr.take() {
                tokio::spawn(pump_lines(stderr, tx, "stderr"));
            }
            child
        };

        info!(
            program = %program.display(),
            pid = child.id(),
            "Monitor process started"
        );

        Ok(Self { child, lines })
    }

    /// Returns the OS process ID, or `None` once the process has been reaped.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits for the next line of merged output.
    ///
    /// Returns `None` once every copy of the monitor's stdout and stderr is
    /// closed. The process itself may still be running at that point.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Waits for the monitor to exit and returns its status.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Wait` if the status cannot be collected.
    pub async fn wait(&mut self) -> Result<ExitStatus, SupervisorError> {
        self.child.wait().await.map_err(SupervisorError::Wait)
    }

    /// Returns the exit status if the monitor has already exited.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Wait` if the status cannot be queried.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, SupervisorError> {
        self.child.try_wait().map_err(SupervisorError::Wait)
    }

    /// Asks the monitor to stop, waiting up to [`TERMINATE_GRACE`].
    ///
    /// # Errors
    ///
    /// Returns a `SupervisorError` if the process cannot be killed or reaped.
    pub async fn terminate(&mut self) -> Result<ExitStatus, SupervisorError> {
        self.terminate_within(TERMINATE_GRACE).await
    }

    /// Asks the monitor to stop, force-killing it after `grace`.
    ///
    /// On Unix the monitor first receives `SIGTERM`; elsewhere it is killed
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns a `SupervisorError` if the process cannot be killed or reaped.
    pub async fn terminate_within(
        &mut self,
        grace: Duration,
    ) -> Result<ExitStatus, SupervisorError> {
        if let Some(status) = self.try_wait()? {
            debug!(%status, "Monitor already exited");
            return Ok(status);
        }

        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                use nix::sys::signal::{self, Signal};
                use nix::unistd::Pid;

                debug!(pid, "Sending SIGTERM to monitor");
                if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    warn!(pid, error = %e, "Failed to send SIGTERM to monitor");
                }

                match tokio::time::timeout(grace, self.child.wait()).await {
                    Ok(result) => return result.map_err(SupervisorError::Wait),
                    Err(_) => {
                        warn!(
                            pid,
                            grace_ms = grace.as_millis() as u64,
                            "Monitor did not exit after SIGTERM, killing"
                        );
                    }
                }
            }
        }

        #[cfg(not(unix))]
        let _ = grace;

        self.child.kill().await.map_err(SupervisorError::Kill)?;
        self.wait().await
    }
}

/// Forwards lines from one pipe into the merged channel until EOF.
async fn pump_lines<R>(stream: R, tx: mpsc::Sender<String>, stream_name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(decode_line(&buf)).await.is_err() {
                    // Receiver dropped; nobody is listening anymore.
                    break;
                }
            }
            Err(e) => {
                warn!(stream = stream_name, error = %e, "Failed to read monitor output");
                break;
            }
        }
    }

    trace!(stream = stream_name, "Monitor stream closed");
}

/// Strips the line terminator and decodes the bytes, replacing invalid UTF-8.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
