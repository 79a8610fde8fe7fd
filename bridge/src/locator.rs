//! Native monitor binary resolution.
//!
//! The monitor is found in one of two ways, in order:
//!
//! 1. `MONITOR_BINARY_PATH`, used only if it points to an existing file
//! 2. The first existing file among [`CANDIDATE_BINARIES`] in the base
//!    directory (the directory containing the bridge executable)

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable overriding the monitor binary path.
pub const BINARY_PATH_ENV: &str = "MONITOR_BINARY_PATH";

/// File names probed in the base directory, in priority order.
pub const CANDIDATE_BINARIES: [&str; 2] = ["macos_monitor_universal", "macos_monitor_test"];

/// Errors that can occur while locating the monitor binary.
#[derive(Error, Debug)]
pub enum LocateError {
    /// Neither the override nor any probed candidate exists.
    #[error(
        "native monitor binary not found in {} (expected one of: {})",
        searched_dir.display(),
        candidates.join(", ")
    )]
    NotFound {
        searched_dir: PathBuf,
        candidates: Vec<String>,
    },
}

/// How the monitor binary was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSource {
    /// Taken from `MONITOR_BINARY_PATH`.
    Environment,

    /// Found by probing the base directory under this file name.
    Probed { name: String },
}

/// A resolved monitor binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorLocation {
    /// Path to the executable.
    pub path: PathBuf,

    /// How the path was resolved.
    pub source: LocationSource,
}

impl fmt::Display for MonitorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            LocationSource::Environment => {
                write!(f, "Using binary from env: {}", self.path.display())
            }
            LocationSource::Probed { name } => write!(f, "Using binary: {name}"),
        }
    }
}

/// Resolves the monitor binary using `MONITOR_BINARY_PATH` and `base_dir`.
///
/// # Errors
///
/// Returns `LocateError::NotFound` if no candidate exists.
pub fn locate_monitor(base_dir: &Path) -> Result<MonitorLocation, LocateError> {
    let env_override = env::var_os(BINARY_PATH_ENV).map(PathBuf::from);
    resolve(env_override.as_deref(), base_dir)
}

/// Resolves the monitor binary from an explicit override and base directory.
///
/// # Errors
///
/// Returns `LocateError::NotFound` if no candidate exists.
pub fn resolve(
    env_override: Option<&Path>,
    base_dir: &Path,
) -> Result<MonitorLocation, LocateError> {
    if let Some(path) = env_override {
        if path.is_file() {
            debug!(path = %path.display(), "Monitor binary taken from environment");
            return Ok(MonitorLocation {
                path: path.to_path_buf(),
                source: LocationSource::Environment,
            });
        }
        warn!(
            path = %path.display(),
            env = BINARY_PATH_ENV,
            "Configured monitor binary does not exist, probing base directory"
        );
    }

    for name in CANDIDATE_BINARIES {
        let candidate = base_dir.join(name);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "Monitor binary found by probing");
            return Ok(MonitorLocation {
                path: candidate,
                source: LocationSource::Probed {
                    name: name.to_string(),
                },
            });
        }
    }

    Err(LocateError::NotFound {
        searched_dir: base_dir.to_path_buf(),
        candidates: CANDIDATE_BINARIES.iter().map(|s| s.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").expect("should create file");
        path
    }

    #[test]
    fn test_env_override_wins_when_file_exists() {
        let dir = TempDir::new().expect("should create temp dir");
        let custom = touch(dir.path(), "custom_monitor");
        touch(dir.path(), CANDIDATE_BINARIES[0]);

        let location = resolve(Some(&custom), dir.path()).expect("should resolve");

        assert_eq!(location.path, custom);
        assert_eq!(location.source, LocationSource::Environment);
    }

    #[test]
    fn test_missing_env_override_falls_back_to_search() {
        let dir = TempDir::new().expect("should create temp dir");
        let probed = touch(dir.path(), CANDIDATE_BINARIES[1]);

        let location = resolve(Some(&dir.path().join("nope")), dir.path()).expect("should resolve");

        assert_eq!(location.path, probed);
        assert_eq!(
            location.source,
            LocationSource::Probed {
                name: "macos_monitor_test".to_string()
            }
        );
    }

    #[test]
    fn test_env_override_pointing_at_directory_is_ignored() {
        let dir = TempDir::new().expect("should create temp dir");
        touch(dir.path(), CANDIDATE_BINARIES[0]);

        let location = resolve(Some(dir.path()), dir.path()).expect("should resolve");

        assert!(matches!(location.source, LocationSource::Probed { .. }));
    }

    #[test]
    fn test_probe_order_prefers_universal() {
        let dir = TempDir::new().expect("should create temp dir");
        touch(dir.path(), "macos_monitor_test");
        let universal = touch(dir.path(), "macos_monitor_universal");

        let location = resolve(None, dir.path()).expect("should resolve");

        assert_eq!(location.path, universal);
    }

    #[test]
    fn test_not_found_reports_directory_and_candidates() {
        let dir = TempDir::new().expect("should create temp dir");

        let err = resolve(None, dir.path()).unwrap_err();

        let LocateError::NotFound {
            searched_dir,
            candidates,
        } = &err;
        assert_eq!(searched_dir, dir.path());
        assert_eq!(
            candidates,
            &vec![
                "macos_monitor_universal".to_string(),
                "macos_monitor_test".to_string()
            ]
        );
        assert!(err.to_string().contains("macos_monitor_universal"));
    }

    #[test]
    fn test_display_for_sources() {
        let env_location = MonitorLocation {
            path: PathBuf::from("/opt/monitor"),
            source: LocationSource::Environment,
        };
        assert_eq!(
            env_location.to_string(),
            "Using binary from env: /opt/monitor"
        );

        let probed = MonitorLocation {
            path: PathBuf::from("/opt/macos_monitor_test"),
            source: LocationSource::Probed {
                name: "macos_monitor_test".to_string(),
            },
        };
        assert_eq!(probed.to_string(), "Using binary: macos_monitor_test");
    }

    #[test]
    #[serial]
    fn test_locate_monitor_reads_environment() {
        let dir = TempDir::new().expect("should create temp dir");
        let custom = touch(dir.path(), "from_env");
        let original = env::var_os(BINARY_PATH_ENV);

        env::set_var(BINARY_PATH_ENV, &custom);
        let result = locate_monitor(dir.path());
        match original {
            Some(value) => env::set_var(BINARY_PATH_ENV, value),
            None => env::remove_var(BINARY_PATH_ENV),
        }

        let location = result.expect("should resolve");
        assert_eq!(location.path, custom);
        assert_eq!(location.source, LocationSource::Environment);
    }
}
