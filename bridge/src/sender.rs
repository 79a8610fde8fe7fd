//! HTTP forwarder for the click bridge.
//!
//! Each parsed click is posted to the backend exactly once:
//!
//! - Connection reuse via a single reqwest client
//! - Fixed request timeout (5 seconds by default)
//! - No buffering and no retry; every event's outcome is independent
//!
//! # Example
//!
//! ```no_run
//! use click_bridge::sender::{Sender, SenderConfig};
//! use click_bridge::types::ClickEvent;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SenderConfig::new(
//!         "http://localhost:8000/api/click-detection/events/os".to_string(),
//!     );
//!     let sender = Sender::new(config).unwrap();
//!
//!     let event = ClickEvent::new(100.0, 200.0, 0, 1234.567);
//!     if let Err(e) = sender.forward(&event).await {
//!         eprintln!("forward failed: {e}");
//!     }
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::ClickEvent;

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur while forwarding a click.
#[derive(Error, Debug)]
pub enum SenderError {
    /// Failed to build the HTTP client.
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level failure (timeout, connection refused, DNS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with something other than 200 OK.
    #[error("API error: {status}")]
    Rejected { status: u16 },
}

/// Configuration for the sender.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Full endpoint URL that clicks are posted to.
    pub endpoint: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl SenderConfig {
    /// Creates a new sender configuration with the default timeout.
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP click forwarder.
#[derive(Debug)]
pub struct Sender {
    config: SenderConfig,
    client: Client,
}

impl Sender {
    /// Creates a new sender with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `SenderError::Client` if the HTTP client cannot be built.
    pub fn new(config: SenderConfig) -> Result<Self, SenderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SenderError::Client)?;

        Ok(Self { config, client })
    }

    /// Returns the endpoint clicks are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Posts a single click to the backend.
    ///
    /// # Errors
    ///
    /// - `SenderError::Rejected` if the response status is not 200
    /// - `SenderError::Http` on timeout or any other transport failure
    pub async fn forward(&self, event: &ClickEvent) -> Result<(), SenderError> {
        debug!(
            url = %self.config.endpoint,
            x = event.x,
            y = event.y,
            button = event.button,
            "Forwarding click"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            debug!("Click accepted");
            return Ok(());
        }

        warn!(status = status.as_u16(), "Click rejected by API");
        Err(SenderError::Rejected {
            status: status.as_u16(),
        })
    }
}
