//! # PHD2 Transport Layer
//!
//! Line-oriented stream abstraction for the guider connection.
//!
//! The driver never touches sockets directly: it splits a [`SplittableStream`]
//! into a [`LineReader`] owned by the background thread and a [`LineWriter`]
//! shared by callers. Forcing the writer closed must make a blocked
//! `read_line` fail so the reader thread can be joined.

use std::time::Duration;
use thiserror::Error;

pub mod framing;
pub mod tcp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use framing::{LineSplitter, MAX_LINE_LEN};
pub use tcp::{TcpLineReader, TcpLineStream, TcpLineWriter};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockLineReader, MockLineStream, MockLineWriter, MockPeer, mock_pair};

/// Default receive timeout for blocking line reads
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Transport layer error
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot resolve host '{host}'")]
    Resolve { host: String },

    /// No complete line arrived within the read timeout; not fatal
    #[error("Read timeout")]
    Timeout,

    /// A line exceeded the framing limit and was discarded; not fatal
    #[error("Line longer than {limit} bytes discarded")]
    LineTooLong { limit: usize },

    /// The peer closed the stream, or it was forced closed locally
    #[error("Stream closed")]
    Closed,
}

impl TransportError {
    /// Whether the stream is unusable after this error.
    ///
    /// The reader thread keeps reading after a non-fatal error and stops
    /// after a fatal one.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Timeout | TransportError::LineTooLong { .. })
    }
}

/// Receiving half: yields complete lines without their terminators.
pub trait LineReader {
    /// Block until one non-empty line arrives, the read timeout elapses
    /// ([`TransportError::Timeout`]), or the stream ends ([`TransportError::Closed`]).
    /// A line over [`MAX_LINE_LEN`] is skipped and reported as
    /// [`TransportError::LineTooLong`].
    fn read_line(&mut self) -> Result<String, TransportError>;
}

/// Sending half.
pub trait LineWriter {
    /// Write one complete line; `line` must already carry its terminator.
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Force the stream closed in both directions, unblocking the reader.
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A connected stream that can be split into independently owned halves.
pub trait SplittableStream {
    type Reader: LineReader + Send + 'static;
    type Writer: LineWriter + Send + 'static;

    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_not_fatal() {
        assert!(!TransportError::Timeout.is_fatal());
        assert!(!TransportError::LineTooLong { limit: 16 }.is_fatal());
        assert!(TransportError::Closed.is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(TransportError::Io(io).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Resolve {
            host: "nowhere.invalid".to_string(),
        };
        assert_eq!(format!("{}", err), "Cannot resolve host 'nowhere.invalid'");

        let err = TransportError::Connect {
            addr: "127.0.0.1:4400".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(format!("{}", err), "Failed to connect to 127.0.0.1:4400: refused");
    }
}
