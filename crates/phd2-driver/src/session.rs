//! Guider session: reader thread plus synchronous RPC
//!
//! Every request carries the same id, so responses are matched positionally:
//! the session holds a call lock for the whole request/response round trip and
//! at most one call is ever outstanding.

use crate::dispatcher::EventDispatcher;
use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::pipeline::reader_loop;
use crate::state::{GuiderContext, GuiderStatus};
use crate::stats::GuideStats;
use parking_lot::Mutex;
use phd2_protocol::RpcRequest;
use phd2_transport::{DEFAULT_READ_TIMEOUT, LineWriter, SplittableStream, TransportError};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// Session tuning
///
/// ```
/// use phd2_driver::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig {
///     read_timeout: Duration::from_millis(200),
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.join_timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Socket read timeout; bounds how long the reader takes to notice shutdown
    pub read_timeout: Duration,
    /// How long shutdown waits for the reader thread
    pub join_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            join_timeout: Duration::from_secs(2),
        }
    }
}

/// One connection to a guider instance
///
/// Dropping the session stops the reader thread and closes the stream.
pub struct GuiderSession {
    ctx: Arc<GuiderContext>,
    writer: Mutex<Box<dyn LineWriter + Send>>,
    call_lock: Mutex<()>,
    reader_thread: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<SessionMetrics>,
    config: SessionConfig,
}

impl GuiderSession {
    /// Split `stream` and start the reader thread.
    pub fn new<S: SplittableStream>(stream: S, config: SessionConfig) -> Result<Self, DriverError> {
        let (reader, writer) = stream.split()?;

        let ctx = Arc::new(GuiderContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(SessionMetrics::new());
        let dispatcher = EventDispatcher::new(ctx.clone());

        let reader_thread = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            thread::Builder::new()
                .name("phd2-reader".into())
                .spawn(move || reader_loop(reader, dispatcher, ctx, is_running, metrics))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        debug!("Guider session started");

        Ok(Self {
            ctx,
            writer: Mutex::new(Box::new(writer)),
            call_lock: Mutex::new(()),
            reader_thread: Some(reader_thread),
            is_running,
            metrics,
            config,
        })
    }

    /// Send one request and block for its response.
    ///
    /// Fails with [`DriverError::Rpc`] when the server reports an error, and
    /// with [`DriverError::Disconnected`] if the stream is (or becomes) closed.
    /// Events that arrive while waiting are applied before the call returns.
    ///
    /// ```no_run
    /// use phd2_driver::{SessionBuilder, DriverError};
    /// use serde_json::Value;
    ///
    /// # fn main() -> Result<(), DriverError> {
    /// let session = SessionBuilder::new().host("localhost").instance(1).build()?;
    /// let state = session.call("get_app_state", Value::Null)?;
    /// println!("{}", state);
    /// # Ok(())
    /// # }
    /// ```
    pub fn call(&self, method: &str, params: Value) -> Result<Value, DriverError> {
        let _call = self.call_lock.lock();

        if !self.ctx.is_connected() {
            return Err(DriverError::Disconnected);
        }

        let line = RpcRequest::new(method, params).to_line()?;
        self.ctx.clear_response();

        {
            let mut writer = self.writer.lock();
            match writer.write_line(&line) {
                Ok(()) => {},
                Err(TransportError::Closed) => return Err(DriverError::Disconnected),
                Err(e) => {
                    error!("Failed to send {}: {}", method, e);
                    return Err(DriverError::Transport(e));
                },
            }
        }
        self.metrics.requests_sent.fetch_add(1, Ordering::Relaxed);
        trace!("-> {}", line.trim_end());

        let response = self.ctx.wait_response()?;
        response.into_result().map_err(|e| {
            debug!("{} failed: {}", method, e.message);
            DriverError::Rpc {
                code: e.code,
                message: e.message,
            }
        })
    }

    pub fn context(&self) -> &Arc<GuiderContext> {
        &self.ctx
    }

    /// Whether the stream is still open
    pub fn is_connected(&self) -> bool {
        self.ctx.is_connected()
    }

    pub fn status(&self) -> GuiderStatus {
        self.ctx.status()
    }

    pub fn stats(&self) -> GuideStats {
        self.ctx.stats()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for GuiderSession {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);

        // unblocks a read in progress
        if let Err(e) = self.writer.lock().close() {
            warn!("Failed to close guider stream: {}", e);
        }

        let join_timeout = self.config.join_timeout;
        if let Some(handle) = self.reader_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "Reader thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        let m = self.metrics.snapshot();
        info!(
            "Guider session closed ({} lines, {:.1}% malformed)",
            m.lines_received,
            m.malformed_rate()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phd2_protocol::AppState;
    use phd2_transport::mock_pair;
    use serde_json::json;
    use std::time::Instant;

    fn session() -> (GuiderSession, phd2_transport::MockPeer) {
        let (stream, peer) = mock_pair(Duration::from_millis(20));
        let session = GuiderSession::new(stream, SessionConfig::default()).unwrap();
        (session, peer)
    }

    fn request(peer: &phd2_transport::MockPeer) -> Value {
        let line = peer.recv_line_timeout(Duration::from_secs(2)).unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_call_roundtrip() {
        let (session, peer) = session();
        let server = {
            let peer = peer.clone();
            thread::spawn(move || {
                let req = request(&peer);
                peer.send_line(r#"{"jsonrpc":"2.0","result":2.5,"id":1}"#);
                req
            })
        };

        let result = session.call("get_pixel_scale", Value::Null).unwrap();
        assert_eq!(result, json!(2.5));

        let req = server.join().unwrap();
        assert_eq!(req, json!({"method": "get_pixel_scale", "id": 1}));
        assert_eq!(session.metrics().requests_sent, 1);
    }

    #[test]
    fn test_scalar_param_wrapped_on_wire() {
        let (session, peer) = session();
        let server = {
            let peer = peer.clone();
            thread::spawn(move || {
                let req = request(&peer);
                peer.send_line(r#"{"jsonrpc":"2.0","result":0,"id":1}"#);
                req
            })
        };

        session.call("set_paused", json!(true)).unwrap();
        assert_eq!(server.join().unwrap()["params"], json!([true]));
    }

    #[test]
    fn test_rpc_error_passed_through() {
        let (session, peer) = session();
        let server = {
            let peer = peer.clone();
            thread::spawn(move || {
                request(&peer);
                peer.send_line(
                    r#"{"jsonrpc":"2.0","error":{"code":1,"message":"cannot guide while calibrating"},"id":1}"#,
                );
            })
        };

        let err = session.call("guide", json!([])).unwrap_err();
        server.join().unwrap();
        match err {
            DriverError::Rpc { code, message } => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "cannot guide while calibrating");
            },
            other => panic!("expected Rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_events_interleaved_with_response() {
        let (session, peer) = session();
        let server = {
            let peer = peer.clone();
            thread::spawn(move || {
                request(&peer);
                peer.send_line(r#"{"Event":"LoopingExposures","Frame":1}"#);
                peer.send_line(r#"{"jsonrpc":"2.0","result":0,"id":1}"#);
            })
        };

        session.call("loop", Value::Null).unwrap();
        server.join().unwrap();
        assert_eq!(session.status().app_state, AppState::Looping);
    }

    #[test]
    fn test_stream_end_releases_blocked_call() {
        let (session, peer) = session();
        let server = {
            let peer = peer.clone();
            thread::spawn(move || {
                request(&peer);
                thread::sleep(Duration::from_millis(50));
                peer.close();
            })
        };

        let started = Instant::now();
        let err = session.call("get_app_state", Value::Null).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, DriverError::Disconnected));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!session.is_connected());

        // later calls fail fast
        assert!(matches!(
            session.call("get_app_state", Value::Null),
            Err(DriverError::Disconnected)
        ));
    }

    #[test]
    fn test_drop_stops_reader() {
        let (session, peer) = session();
        drop(session);
        assert!(peer.is_aborted());
    }
}
