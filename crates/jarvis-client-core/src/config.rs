use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ENDPOINT_PATH: &str = "/ws";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_SCREENSHOTS_PREFIX: &str = "/screenshots/";
pub const DEFAULT_ERROR_MARKER: &str = "❌ Error: ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid JARVIS_WS_PATH: {0}")]
    InvalidEndpointPath(String),
    #[error("invalid JARVIS_RECONNECT_DELAY_MS: {0}")]
    InvalidReconnectDelayMs(String),
    #[error("invalid JARVIS_MAX_RECONNECT_ATTEMPTS: {0}")]
    InvalidMaxReconnectAttempts(String),
    #[error("invalid JARVIS_SCREENSHOTS_PREFIX: {0}")]
    InvalidScreenshotsPrefix(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint_path: String,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub screenshots_prefix: String,
    pub error_marker: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            screenshots_prefix: DEFAULT_SCREENSHOTS_PREFIX.to_string(),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let endpoint_path = match lookup("JARVIS_WS_PATH") {
            Some(value) => {
                let trimmed = value.trim();
                if !trimmed.starts_with('/') {
                    return Err(ConfigError::InvalidEndpointPath(format!(
                        "path must start with '/', got {trimmed:?}"
                    )));
                }
                trimmed.to_string()
            }
            None => defaults.endpoint_path,
        };

        let reconnect_delay = match lookup("JARVIS_RECONNECT_DELAY_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|error| ConfigError::InvalidReconnectDelayMs(error.to_string()))?,
            None => defaults.reconnect_delay,
        };

        let max_reconnect_attempts = match lookup("JARVIS_MAX_RECONNECT_ATTEMPTS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .map_err(|error| ConfigError::InvalidMaxReconnectAttempts(error.to_string()))?,
            None => defaults.max_reconnect_attempts,
        };

        let screenshots_prefix = match lookup("JARVIS_SCREENSHOTS_PREFIX") {
            Some(value) => {
                let trimmed = value.trim();
                if !trimmed.starts_with('/') || !trimmed.ends_with('/') {
                    return Err(ConfigError::InvalidScreenshotsPrefix(format!(
                        "prefix must start and end with '/', got {trimmed:?}"
                    )));
                }
                trimmed.to_string()
            }
            None => defaults.screenshots_prefix,
        };

        Ok(Self {
            endpoint_path,
            reconnect_delay,
            max_reconnect_attempts,
            screenshots_prefix,
            error_marker: defaults.error_marker,
        })
    }
}

/// Socket URL on the page host, secure when the page itself was loaded over https.
#[must_use]
pub fn websocket_url(page_protocol: &str, host: &str, path: &str) -> String {
    let ws_protocol = if page_protocol.eq_ignore_ascii_case("https:") {
        "wss"
    } else {
        "ws"
    };
    format!("{ws_protocol}://{host}{path}")
}
