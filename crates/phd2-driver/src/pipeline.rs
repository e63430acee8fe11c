//! Reader thread loop
//!
//! One thread reads lines, decodes them and hands them to the dispatcher, in
//! arrival order. Undecodable or oversized lines are logged and skipped. The loop ends when
//! the running flag clears or the stream ends; either way the link is marked
//! closed so no caller stays blocked on a response that will never come.

use crate::dispatcher::{Dispatch, EventDispatcher};
use crate::metrics::SessionMetrics;
use crate::state::GuiderContext;
use phd2_protocol::InboundMessage;
use phd2_transport::{LineReader, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, trace, warn};

/// Body of the reader thread. Returns when `is_running` clears or the
/// stream fails fatally, leaving `ctx` marked closed.
pub fn reader_loop(
    mut reader: impl LineReader,
    mut dispatcher: EventDispatcher,
    ctx: Arc<GuiderContext>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<SessionMetrics>,
) {
    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Reader thread: is_running flag is false, exiting");
            break;
        }

        let line = match reader.read_line() {
            Ok(line) => {
                metrics.lines_received.fetch_add(1, Ordering::Relaxed);
                line
            },
            Err(TransportError::Timeout) => {
                metrics.read_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) if !e.is_fatal() => {
                // oversized line, already skipped by the framing layer
                metrics.lines_received.fetch_add(1, Ordering::Relaxed);
                metrics.malformed_lines.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping malformed line: {}", e);
                continue;
            },
            Err(TransportError::Closed) => {
                info!("Guider stream closed");
                break;
            },
            Err(e) => {
                error!("Guider stream read failed: {}", e);
                break;
            },
        };

        trace!("<- {}", line);

        let msg = match InboundMessage::parse(&line) {
            Ok(msg) => msg,
            Err(e) => {
                metrics.malformed_lines.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping malformed line ({}): {}", e, line);
                continue;
            },
        };

        match dispatcher.dispatch(msg) {
            Dispatch::Response => metrics.responses.fetch_add(1, Ordering::Relaxed),
            Dispatch::Applied => metrics.events_dispatched.fetch_add(1, Ordering::Relaxed),
            Dispatch::Ignored => metrics.events_ignored.fetch_add(1, Ordering::Relaxed),
        };
    }

    ctx.mark_closed();
    // reader (and its half of the transport) dropped here
}

#[cfg(test)]
mod tests {
    use super::*;
    use phd2_protocol::AppState;
    use phd2_transport::{MAX_LINE_LEN, mock_pair};
    use phd2_transport::SplittableStream;
    use std::thread;
    use std::time::Duration;

    struct Harness {
        ctx: Arc<GuiderContext>,
        is_running: Arc<AtomicBool>,
        metrics: Arc<SessionMetrics>,
    }

    fn spawn(reader: impl LineReader + Send + 'static) -> (Harness, thread::JoinHandle<()>) {
        let ctx = Arc::new(GuiderContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(SessionMetrics::new());
        let dispatcher = EventDispatcher::new(ctx.clone());

        let handle = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            thread::spawn(move || reader_loop(reader, dispatcher, ctx, is_running, metrics))
        };
        (
            Harness {
                ctx,
                is_running,
                metrics,
            },
            handle,
        )
    }

    #[test]
    fn test_events_applied_in_order_and_malformed_skipped() {
        let (stream, peer) = mock_pair(Duration::from_millis(10));
        let (rx, _tx) = stream.split().unwrap();
        let (h, handle) = spawn(rx);

        peer.send_line(r#"{"Event":"AppState","State":"Looping"}"#);
        peer.send_line("garbage");
        peer.send_line(r#"{"Event":"SomethingNew"}"#);
        peer.send_line(r#"{"Event":"StartCalibration"}"#);
        peer.close();
        handle.join().unwrap();

        assert_eq!(h.ctx.app_state(), AppState::Calibrating);
        assert!(!h.ctx.is_connected());

        let m = h.metrics.snapshot();
        assert_eq!(m.lines_received, 4);
        assert_eq!(m.malformed_lines, 1);
        assert_eq!(m.events_dispatched, 2);
        assert_eq!(m.events_ignored, 1);
    }

    #[test]
    fn test_oversized_line_counted_as_malformed() {
        let (stream, peer) = mock_pair(Duration::from_millis(10));
        let (rx, _tx) = stream.split().unwrap();
        let (h, handle) = spawn(rx);

        let huge = format!(r#"{{"Event":"Alert","Msg":"{}"}}"#, "x".repeat(MAX_LINE_LEN));
        peer.send_line(&huge);
        peer.send_line(r#"{"Event":"AppState","State":"Guiding"}"#);
        peer.close();
        handle.join().unwrap();

        assert_eq!(h.ctx.app_state(), AppState::Guiding);
        let m = h.metrics.snapshot();
        assert_eq!(m.lines_received, 2);
        assert_eq!(m.malformed_lines, 1);
        assert_eq!(m.events_dispatched, 1);
    }

    #[test]
    fn test_running_flag_stops_loop() {
        let (stream, _peer) = mock_pair(Duration::from_millis(10));
        let (rx, _tx) = stream.split().unwrap();
        let (h, handle) = spawn(rx);

        thread::sleep(Duration::from_millis(50));
        h.is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert!(!h.ctx.is_connected());
        assert!(h.metrics.snapshot().read_timeouts > 0);
    }

    #[test]
    fn test_response_published() {
        let (stream, peer) = mock_pair(Duration::from_millis(10));
        let (rx, _tx) = stream.split().unwrap();
        let (h, handle) = spawn(rx);

        peer.send_line(r#"{"jsonrpc":"2.0","result":"Stopped","id":1}"#);
        let resp = h.ctx.wait_response().unwrap();
        assert_eq!(resp.result, serde_json::json!("Stopped"));

        peer.close();
        handle.join().unwrap();
        assert_eq!(h.metrics.snapshot().responses, 1);
    }
}
