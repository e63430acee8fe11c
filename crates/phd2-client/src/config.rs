//! Client configuration
//!
//! ```toml
//! host = "observatory.local"
//! instance = 2
//! stop_capture_timeout_secs = 20
//! ```
//!
//! Keys left out take their defaults.

use crate::error::GuiderError;
use phd2_driver::{DEFAULT_BASE_PORT, SessionBuilder, SessionConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Connection and timing settings for a [`Guider`](crate::Guider)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiderConfig {
    pub host: String,
    /// Guider instance, starting at 1
    pub instance: u32,
    pub base_port: u16,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub stop_capture_timeout_secs: u64,
    pub loop_timeout_secs: u64,
    /// Interval between state polls in `stop_capture` and `loop_exposures`
    pub poll_interval_ms: u64,
}

impl Default for GuiderConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            instance: 1,
            base_port: DEFAULT_BASE_PORT,
            connect_timeout_ms: 5000,
            read_timeout_ms: 500,
            stop_capture_timeout_secs: 10,
            loop_timeout_secs: 10,
            poll_interval_ms: 1000,
        }
    }
}

impl GuiderConfig {
    pub fn new(host: impl Into<String>, instance: u32) -> Self {
        Self {
            host: host.into(),
            instance,
            ..Default::default()
        }
    }

    /// Parse and validate TOML text.
    ///
    /// ```
    /// use phd2_client::GuiderConfig;
    ///
    /// let config = GuiderConfig::from_toml_str("instance = 2").unwrap();
    /// assert_eq!(config.address(), "localhost:4401");
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, GuiderError> {
        let config: Self =
            toml::from_str(content).map_err(|e| GuiderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GuiderError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| GuiderError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GuiderError> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| GuiderError::Config(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| GuiderError::Config(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Reject settings no session could run with.
    pub fn validate(&self) -> Result<(), GuiderError> {
        if self.instance == 0 {
            return Err(GuiderError::Config("instance numbers start at 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(GuiderError::Config("poll_interval_ms must be positive".to_string()));
        }
        // a zero read timeout would make the reader poll in a busy loop
        if self.read_timeout_ms == 0 {
            return Err(GuiderError::Config("read_timeout_ms must be positive".to_string()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(GuiderError::Config("connect_timeout_ms must be positive".to_string()));
        }
        if self.host.is_empty() {
            return Err(GuiderError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn stop_capture_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_capture_timeout_secs)
    }

    pub fn loop_timeout(&self) -> Duration {
        Duration::from_secs(self.loop_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            ..Default::default()
        }
    }

    pub fn session_builder(&self) -> SessionBuilder {
        SessionBuilder::new()
            .host(self.host.clone())
            .instance(self.instance)
            .base_port(self.base_port)
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .session_config(self.session_config())
    }

    /// `host:port` of the configured instance, for messages
    pub fn address(&self) -> String {
        let port = u32::from(self.base_port) + self.instance.saturating_sub(1);
        format!("{}:{}", self.host, port)
    }
}
