//! Session configuration
//!
//! ```toml
//! submit_timeout_ms = 30000
//! replay_log_capacity = 1024
//!
//! [reconnect]
//! initial_delay_ms = 100
//! max_delay_ms = 3000
//! multiplier = 2
//! max_attempts = 50
//!
//! [journal]
//! path = "/var/lib/app/continuity.journal"
//! sync = true
//! ```
//!
//! Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field has an unusable value
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Why
        reason: String,
    },
}

/// Capped exponential backoff for link acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay after the first failed acquisition
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    /// Failed acquisitions tolerated before the session closes
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 3_000,
            multiplier: 2,
            max_attempts: 50,
        }
    }
}

impl ReconnectPolicy {
    /// Initial delay as a Duration
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Maximum delay as a Duration
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Persisted journal settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Journal file (created if missing, appended otherwise)
    pub path: PathBuf,
    /// fsync after every record
    #[serde(default)]
    pub sync: bool,
}

/// Top-level configuration for a resilient session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuityConfig {
    /// Link acquisition policy
    pub reconnect: ReconnectPolicy,
    /// Default wait for `submit`; None waits until the outcome is terminal
    pub submit_timeout_ms: Option<u64>,
    /// Maximum retained replay log entries
    pub replay_log_capacity: usize,
    /// Optional persisted journal
    pub journal: Option<JournalConfig>,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            submit_timeout_ms: None,
            replay_log_capacity: 1024,
            journal: None,
        }
    }
}

impl ContinuityConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ContinuityConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = &self.reconnect;
        if policy.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "reconnect.max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if policy.multiplier == 0 {
            return Err(ConfigError::Invalid {
                field: "reconnect.multiplier",
                reason: "must be at least 1".into(),
            });
        }
        if policy.initial_delay_ms > policy.max_delay_ms {
            return Err(ConfigError::Invalid {
                field: "reconnect.initial_delay_ms",
                reason: format!(
                    "{} exceeds max_delay_ms {}",
                    policy.initial_delay_ms, policy.max_delay_ms
                ),
            });
        }
        if self.replay_log_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "replay_log_capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Default submit timeout as a Duration
    pub fn submit_timeout(&self) -> Option<Duration> {
        self.submit_timeout_ms.map(Duration::from_millis)
    }

    /// Set the reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set the backoff delays
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect.initial_delay_ms = initial.as_millis() as u64;
        self.reconnect.max_delay_ms = max.as_millis() as u64;
        self
    }

    /// Set the maximum failed acquisitions
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = attempts;
        self
    }

    /// Set the default submit timeout
    pub fn submit_timeout_after(mut self, timeout: Option<Duration>) -> Self {
        self.submit_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Set the replay log capacity
    pub fn replay_log_capacity(mut self, capacity: usize) -> Self {
        self.replay_log_capacity = capacity;
        self
    }

    /// Enable the persisted journal
    pub fn journal(mut self, path: impl Into<PathBuf>, sync: bool) -> Self {
        self.journal = Some(JournalConfig {
            path: path.into(),
            sync,
        });
        self
    }
}
