//! Click Bridge - native monitor to backend API relay.
//!
//! This crate launches a platform-native input monitor as a child process,
//! watches its output for click log lines, and forwards each click to the
//! backend API as JSON.
//!
//! # Overview
//!
//! ```text
//! config.env ──> Config ──> Sender ──────────────┐
//!                                                 v
//! monitor binary ──> MonitorProcess ──> Bridge ──> POST /api/click-detection/events/os
//!                                        │
//!                                        └──> parse_click_line
//! ```
//!
//! # Modules
//!
//! - [`config`]: Base URL loading from `config.env`
//! - [`locator`]: Monitor binary resolution
//! - [`supervisor`]: Child process with merged stdout/stderr line stream
//! - [`parser`]: Click line parsing
//! - [`types`]: The click event record
//! - [`sender`]: HTTP forwarding with a fixed timeout
//! - [`bridge`]: The read, parse, forward loop

pub mod bridge;
pub mod config;
pub mod locator;
pub mod parser;
pub mod sender;
pub mod supervisor;
pub mod types;

pub use bridge::{Bridge, BridgeStats, RunOutcome};
pub use config::{Config, ConfigError};
pub use locator::{locate_monitor, LocateError, MonitorLocation};
pub use parser::parse_click_line;
pub use sender::{Sender, SenderConfig, SenderError};
pub use supervisor::{MonitorProcess, SupervisorError};
pub use types::ClickEvent;
