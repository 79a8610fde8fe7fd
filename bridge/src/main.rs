//! Click Bridge - forwards native monitor clicks to the backend API.
//!
//! This binary starts the native monitor, echoes its output, and posts every
//! click it reports to `{API_URL}/api/click-detection/events/os`.
//!
//! # Exit Codes
//!
//! - `0`: stopped by Ctrl+C/SIGTERM, or the monitor exited on its own
//! - `1`: monitor binary not found or not startable, or unusable config file
//!
//! # Environment Variables
//!
//! See the [`click_bridge::locator`] module for the binary override.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use click_bridge::bridge::{Bridge, RunOutcome};
use click_bridge::config::{default_config_path, Config};
use click_bridge::locator::{locate_monitor, LocateError};
use click_bridge::sender::{Sender, SenderConfig};
use click_bridge::supervisor::MonitorProcess;

/// Click Bridge - native monitor to backend API relay.
///
/// Launches the native OS monitor and forwards every click it reports to the
/// backend API.
#[derive(Parser, Debug)]
#[command(name = "click-bridge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    MONITOR_BINARY_PATH   Path to the native monitor (default: search base directory)
    RUST_LOG              Diagnostic log filter (default: info)

CONFIG FILE:
    config.env in the base directory, e.g.
        API_URL=http://localhost:8000

EXAMPLES:
    # Run next to macos_monitor_universal and config.env
    click-bridge

    # Use a monitor built elsewhere
    MONITOR_BINARY_PATH=./build/macos_monitor_test click-bridge
")]
struct Cli {
    /// Config file to read API_URL from (default: <base dir>/config.env).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory probed for the monitor binary (default: directory of this executable).
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run_bridge(cli))
}

/// Runs the bridge from startup to shutdown.
async fn run_bridge(cli: Cli) -> Result<ExitCode> {
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => executable_dir()?,
    };
    let config_path = cli
        .config
        .unwrap_or_else(|| default_config_path(&base_dir));

    let config = Config::from_file(&config_path).context("Failed to load configuration")?;
    let endpoint = config.events_endpoint();

    info!(
        api_url = %config.api_url,
        config_path = %config_path.display(),
        base_dir = %base_dir.display(),
        "Configuration loaded"
    );

    println!("🔗 OS Monitor Bridge");
    println!("{}", "=".repeat(50));
    println!("Forwarding OS clicks to API at {endpoint}");
    println!("Starting native monitor...");
    println!();

    let location = match locate_monitor(&base_dir) {
        Ok(location) => location,
        Err(LocateError::NotFound {
            searched_dir,
            candidates,
        }) => {
            error!(searched_dir = %searched_dir.display(), "Native monitor binary not found");
            println!("❌ ERROR: Native monitor binary not found!");
            println!("Expected: {}", candidates.join(" or "));
            println!("Looking in: {}", searched_dir.display());
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("{location}");

    let sender = Sender::new(SenderConfig::new(endpoint)).context("Failed to create sender")?;

    let mut process = MonitorProcess::spawn(&location.path).with_context(|| {
        format!(
            "Failed to start native monitor at {}",
            location.path.display()
        )
    })?;

    info!(
        endpoint = sender.endpoint(),
        pid = process.id(),
        "Forwarding monitor clicks"
    );

    let mut bridge = Bridge::new(sender, io::stdout());
    match bridge.run(&mut process, wait_for_shutdown()).await {
        RunOutcome::Stopped { .. } => info!("Bridge stopped by signal"),
        RunOutcome::MonitorExited { status } => {
            info!(
                exit_code = status.and_then(|s| s.code()),
                "Monitor output closed"
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Returns the directory containing the running executable.
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to determine executable path")?;
    exe.parent()
        .map(PathBuf::from)
        .context("Executable path has no parent directory")
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr so that stdout carries only the console narration.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// If a handler cannot be installed that signal is simply never observed.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
