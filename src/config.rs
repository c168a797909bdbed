use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SentinelError};
use crate::session::SessionConfig;

/// User-configurable settings for the sentinel server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Host address for the HTTP server (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server (default: 8700)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum spacing between produced events, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Outbound queue depth per subscriber
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Bound on a single delivery attempt, in milliseconds
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Maximum number of concurrently connected subscribers
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,

    /// Default number of records returned by `GET /logs`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Directory for the JSONL store; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8700
}

fn default_interval_ms() -> u64 {
    1800
}

fn default_subscriber_buffer() -> usize {
    64
}

fn default_delivery_timeout_ms() -> u64 {
    250
}

fn default_max_subscribers() -> usize {
    1024
}

fn default_history_limit() -> usize {
    150
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            interval_ms: default_interval_ms(),
            subscriber_buffer: default_subscriber_buffer(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            max_subscribers: default_max_subscribers(),
            history_limit: default_history_limit(),
            store_path: None,
        }
    }
}

impl SentinelConfig {
    /// Load configuration from a TOML file.
    /// Returns default config if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            SentinelError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: SentinelConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("interval_ms", self.interval_ms == 0),
            ("subscriber_buffer", self.subscriber_buffer == 0),
            ("delivery_timeout_ms", self.delivery_timeout_ms == 0),
            ("max_subscribers", self.max_subscribers == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(SentinelError::Config(format!("{name} must be greater than zero")));
        }
        Ok(())
    }

    /// Returns the server bind address string (e.g., "127.0.0.1:8700").
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }

    /// Session settings derived from this config.
    ///
    /// A socket write gets the same bound as a queue handoff, scaled by
    /// the buffer so a briefly slow peer can catch up.
    pub fn session(&self) -> SessionConfig {
        let factor = self.subscriber_buffer.clamp(1, u32::MAX as usize) as u32;
        SessionConfig {
            buffer: self.subscriber_buffer,
            send_timeout: self.delivery_timeout() * factor,
        }
    }
}
