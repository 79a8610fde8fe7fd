//! The bridge loop: monitor output in, click events out.
//!
//! One control path reads a line, echoes it, parses it and, for clicks,
//! awaits the forward before taking the next line. A slow backend therefore
//! stalls consumption of the monitor's output; that is intended.
//!
//! The loop ends when either:
//!
//! - the shutdown future resolves (Ctrl+C / SIGTERM in the binary), in which
//!   case the monitor is terminated, or
//! - the monitor closes its output, in which case it is reaped. Shutdown is
//!   still honoured while waiting, since a monitor may close its output and
//!   keep running.
//!
//! Neither case is an error. Forward failures are printed and the loop
//! carries on.

use std::future::Future;
use std::io::Write;
use std::process::ExitStatus;

use tracing::{debug, info, warn};

use crate::parser::parse_click_line;
use crate::sender::{Sender, SenderError};
use crate::supervisor::MonitorProcess;
use crate::types::ClickEvent;

/// Prefix for echoed monitor lines.
const ECHO_PREFIX: &str = "[Monitor]";

/// How the bridge loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Shutdown was requested and the monitor was asked to terminate.
    Stopped { status: Option<ExitStatus> },

    /// The monitor closed its output on its own.
    MonitorExited { status: Option<ExitStatus> },
}

/// Counters collected over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    /// Lines received from the monitor, clicks included.
    pub lines_read: u64,

    /// Lines recognised as click reports.
    pub clicks_parsed: u64,

    /// Clicks the backend answered with `200 OK`.
    pub clicks_forwarded: u64,

    /// Clicks rejected by the backend or lost in transport.
    pub clicks_failed: u64,
}

enum Step {
    Continue,
    Closed,
    Interrupted,
}

/// Relays monitor output to the backend and narrates it on a console.
#[derive(Debug)]
pub struct Bridge<W> {
    sender: Sender,
    console: W,
    stats: BridgeStats,
}

impl<W: Write> Bridge<W> {
    /// Creates a bridge that forwards with `sender` and prints to `console`.
    #[must_use]
    pub fn new(sender: Sender, console: W) -> Self {
        Self {
            sender,
            console,
            stats: BridgeStats::default(),
        }
    }

    /// Returns the counters collected so far.
    #[must_use]
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Consumes the bridge and returns its console.
    pub fn into_console(self) -> W {
        self.console
    }

    /// Runs until `shutdown` resolves or the monitor's output closes.
    pub async fn run<F>(&mut self, process: &mut MonitorProcess, shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let step = tokio::select! {
                biased;
                () = &mut shutdown => Step::Interrupted,
                more = self.pump_one(process) => {
                    if more { Step::Continue } else { Step::Closed }
                }
            };

            match step {
                Step::Continue => {}
                Step::Interrupted => return self.stop(process).await,
                Step::Closed => {
                    debug!("Monitor output closed, waiting for exit");
                    let exited = tokio::select! {
                        biased;
                        () = &mut shutdown => None,
                        result = process.wait() => Some(result),
                    };

                    let Some(result) = exited else {
                        return self.stop(process).await;
                    };
                    let status = match result {
                        Ok(status) => {
                            info!(%status, "Monitor exited");
                            Some(status)
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to collect monitor exit status");
                            None
                        }
                    };
                    self.log_stats();
                    return RunOutcome::MonitorExited { status };
                }
            }
        }
    }

    /// Terminates the monitor after a shutdown request.
    async fn stop(&mut self, process: &mut MonitorProcess) -> RunOutcome {
        info!(pid = process.id(), "Shutdown signal received");
        self.say("\n\n👋 Stopping monitor...");
        let status = match process.terminate().await {
            Ok(status) => {
                info!(%status, "Monitor terminated");
                Some(status)
            }
            Err(e) => {
                warn!(error = %e, "Failed to terminate monitor");
                None
            }
        };
        self.log_stats();
        RunOutcome::Stopped { status }
    }

    /// Handles one line; returns `false` once the monitor's output is closed.
    async fn pump_one(&mut self, process: &mut MonitorProcess) -> bool {
        match process.next_line().await {
            Some(line) => {
                self.handle_line(&line).await;
                true
            }
            None => false,
        }
    }

    async fn handle_line(&mut self, raw: &str) {
        let line = raw.trim();
        self.stats.lines_read += 1;
        self.say(&format!("{ECHO_PREFIX} {line}"));

        let Some(event) = parse_click_line(line) else {
            return;
        };
        self.stats.clicks_parsed += 1;

        let result = self.sender.forward(&event).await;
        match &result {
            Ok(()) => self.stats.clicks_forwarded += 1,
            Err(_) => self.stats.clicks_failed += 1,
        }
        self.say(&describe_forward(&event, &result));
    }

    fn say(&mut self, line: &str) {
        if let Err(e) = writeln!(self.console, "{line}").and_then(|()| self.console.flush()) {
            warn!(error = %e, "Failed to write to console");
        }
    }

    fn log_stats(&self) {
        info!(
            lines_read = self.stats.lines_read,
            clicks_parsed = self.stats.clicks_parsed,
            clicks_forwarded = self.stats.clicks_forwarded,
            clicks_failed = self.stats.clicks_failed,
            "Bridge stopped"
        );
    }
}

/// Formats the console line reporting a forward attempt.
#[must_use]
pub fn describe_forward(event: &ClickEvent, result: &Result<(), SenderError>) -> String {
    match result {
        Ok(()) => format!("✓ Forwarded click: x={:.2}, y={:.2}", event.x, event.y),
        Err(SenderError::Rejected { status }) => format!("✗ API error: {status}"),
        Err(e) => format!("✗ Failed to send to API: {e}"),
    }
}
