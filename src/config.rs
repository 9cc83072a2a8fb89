//! Environment-driven configuration.
//!
//! All knobs are plain environment variables so the binary can run unchanged
//! on a host or inside a container with a mounted docker socket.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that may occur while reading the configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{variable}`: expected {expected}")]
    InvalidValue {
        variable: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runtime configuration for the monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory scanned for registered stack directories.
    pub stacks_root: PathBuf,
    /// Docker socket path; `None` uses the engine's local defaults.
    pub docker_socket: Option<PathBuf>,
    /// Listen address for the read-only HTTP API.
    pub listen_addr: String,
    /// Interval between discovery passes.
    pub poll_interval: Duration,
    /// Deadline for a single discovery pass.
    pub discovery_deadline: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables fall back to their documented defaults; set but
    /// malformed values are an error rather than a silent default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a duration variable is not a
    /// positive integer number of seconds.
    pub fn from_env() -> Result<Self> {
        let stacks_root = std::env::var_os("STACKS_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/opt/stacks"));
        let docker_socket = std::env::var_os("DOCKER_SOCKET").map(PathBuf::from);
        let listen_addr =
            std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned());
        let poll_interval = read_seconds("POLL_INTERVAL_SECS", 10)?;
        let discovery_deadline = read_seconds("DISCOVERY_DEADLINE_SECS", 30)?;

        Ok(Self {
            stacks_root,
            docker_socket,
            listen_addr,
            poll_interval,
            discovery_deadline,
        })
    }
}

fn read_seconds(variable: &'static str, default_secs: u64) -> Result<Duration> {
    match std::env::var(variable) {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(Error::InvalidValue {
                    variable,
                    value: raw,
                    expected: "a positive integer number of seconds",
                })?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}
