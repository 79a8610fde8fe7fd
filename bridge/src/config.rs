//! Configuration module for the click bridge.
//!
//! The bridge reads a single setting, the backend base URL, from an optional
//! flat `KEY=value` file named `config.env` next to the executable.
//!
//! # Config File
//!
//! | Key | Required | Default | Description |
//! |-----|----------|---------|-------------|
//! | `API_URL` | No | `http://localhost:8000` | Base URL of the backend API |
//!
//! Lines are trimmed before matching and the first `API_URL=` line wins. Any
//! other line is ignored, so comments and unrelated keys are harmless.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use click_bridge::config::Config;
//!
//! let config = Config::from_file(Path::new("/opt/bridge/config.env"))
//!     .expect("Failed to load configuration");
//! println!("Posting to: {}", config.events_endpoint());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Base URL used when no config file or no `API_URL` line is present.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// File name of the config file inside the base directory.
pub const CONFIG_FILE_NAME: &str = "config.env";

/// Path of the click ingestion endpoint, relative to the base URL.
pub const EVENTS_PATH: &str = "/api/click-detection/events/os";

/// Key prefix recognized in the config file.
const API_URL_PREFIX: &str = "API_URL=";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A recognized key has an unusable value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the click bridge.
///
/// Loaded once at startup and never reloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the backend API (e.g., `http://localhost:8000`).
    pub api_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Config {
    /// Creates a configuration with an explicit base URL.
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    /// Loads the configuration from a `config.env` style file.
    ///
    /// A missing file is the normal case and yields the default base URL.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - The file exists but cannot be read
    /// - The `API_URL` line has an empty value
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using default API URL");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match parse_api_url(&contents)? {
            Some(api_url) => Ok(Self { api_url }),
            None => {
                debug!(path = %path.display(), "No API_URL in config file, using default");
                Ok(Self::default())
            }
        }
    }

    /// Returns the full URL that click events are posted to.
    #[must_use]
    pub fn events_endpoint(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), EVENTS_PATH)
    }
}

/// Returns the default config file path for a base directory.
#[must_use]
pub fn default_config_path(base_dir: &Path) -> PathBuf {
    base_dir.join(CONFIG_FILE_NAME)
}

/// Finds the first `API_URL=` line and returns its trimmed value.
fn parse_api_url(contents: &str) -> Result<Option<String>, ConfigError> {
    let Some(value) = contents
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(API_URL_PREFIX))
    else {
        return Ok(None);
    };

    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "API_URL".to_string(),
            message: "value must not be empty".to_string(),
        });
    }

    Ok(Some(value.to_string()))
}
