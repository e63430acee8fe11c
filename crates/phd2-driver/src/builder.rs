//! Builder for TCP-backed sessions

use crate::error::DriverError;
use crate::session::{GuiderSession, SessionConfig};
use phd2_transport::TcpLineStream;
use std::time::Duration;
use tracing::info;

/// First instance listens here; instance `n` listens on `DEFAULT_BASE_PORT + n - 1`.
pub const DEFAULT_BASE_PORT: u16 = 4400;

/// Chained construction of a [`GuiderSession`] over TCP.
///
/// # Example
///
/// ```no_run
/// use phd2_driver::SessionBuilder;
///
/// let session = SessionBuilder::new()
///     .host("observatory.local")
///     .instance(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    host: String,
    instance: u32,
    base_port: u16,
    connect_timeout: Duration,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            host: "localhost".to_string(),
            instance: 1,
            base_port: DEFAULT_BASE_PORT,
            connect_timeout: Duration::from_secs(5),
            config: SessionConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Guider instance number, starting at 1
    pub fn instance(mut self, instance: u32) -> Self {
        self.instance = instance;
        self
    }

    pub fn base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// TCP port of the configured instance
    pub fn port(&self) -> Result<u16, DriverError> {
        if self.instance == 0 {
            return Err(DriverError::InvalidInput(
                "instance numbers start at 1".to_string(),
            ));
        }
        let port = u32::from(self.base_port) + self.instance - 1;
        u16::try_from(port).map_err(|_| {
            DriverError::InvalidInput(format!(
                "instance {} is out of range for base port {}",
                self.instance, self.base_port
            ))
        })
    }

    /// Connect over TCP and start the session.
    ///
    /// Fails with [`DriverError::InvalidInput`] for an out-of-range instance
    /// and with [`DriverError::Transport`] if the connection cannot be made.
    pub fn build(self) -> Result<GuiderSession, DriverError> {
        let port = self.port()?;
        let stream = TcpLineStream::connect(
            &self.host,
            port,
            self.connect_timeout,
            self.config.read_timeout,
        )?;
        info!("Connected to guider at {}:{}", self.host, port);
        GuiderSession::new(stream, self.config)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
