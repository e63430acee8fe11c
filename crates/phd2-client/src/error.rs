//! Client error taxonomy

use phd2_driver::DriverError;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuiderError {
    /// The transport could not be opened
    #[error("Could not connect to guider at {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: DriverError,
    },

    /// No session was ever opened (or it was closed with `disconnect`)
    #[error("Not connected to guider")]
    NotConnected,

    /// The server closed the stream
    #[error("Connection to guider lost")]
    Disconnected,

    /// The server rejected the request; message passed through verbatim
    #[error("{message}")]
    Rpc { code: Option<i64>, message: String },

    #[error("cannot guide or dither while settling")]
    AlreadySettling,

    #[error("not settling")]
    NotSettling,

    #[error("timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        timeout: Duration,
    },

    #[error("invalid phd2 profile name: {0}")]
    ProfileNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("invalid arguments: {0}")]
    InvalidArgument(String),

    /// A call succeeded but its result had an unexpected shape
    #[error("unexpected result from {method}: {result}")]
    UnexpectedResult { method: &'static str, result: Value },

    #[error("Driver error: {0}")]
    Driver(DriverError),
}

impl GuiderError {
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            GuiderError::Connection { .. } | GuiderError::NotConnected | GuiderError::Disconnected
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GuiderError::Timeout { .. })
    }
}

impl From<DriverError> for GuiderError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Rpc { code, message } => GuiderError::Rpc { code, message },
            DriverError::Disconnected => GuiderError::Disconnected,
            other => GuiderError::Driver(other),
        }
    }
}
