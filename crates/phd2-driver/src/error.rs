//! Driver layer errors

use phd2_protocol::ProtocolError;
use phd2_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server answered the call with an error object; message is verbatim
    #[error("{message}")]
    Rpc { code: Option<i64>, message: String },

    /// The stream ended before (or while) the call was answered
    #[error("Connection to guider lost")]
    Disconnected,

    /// Reader thread could not be started
    #[error("IO thread error: {0}")]
    IoThread(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
