//! Event types for the click bridge.
//!
//! This module defines the record forwarded to the backend API. The JSON
//! field names are part of the backend contract and must not change.

use serde::{Deserialize, Serialize};

/// A single click reported by the native monitor.
///
/// Created per matched log line and discarded once the forward attempt
/// returns. All four fields are always present together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Horizontal screen position.
    pub x: f64,

    /// Vertical screen position.
    pub y: f64,

    /// Mouse button identifier as reported by the monitor.
    pub button: i64,

    /// Monitor-side timestamp (seconds, fractional).
    pub timestamp: f64,
}

impl ClickEvent {
    /// Creates a new click event.
    #[must_use]
    pub fn new(x: f64, y: f64, button: i64, timestamp: f64) -> Self {
        Self {
            x,
            y,
            button,
            timestamp,
        }
    }
}
