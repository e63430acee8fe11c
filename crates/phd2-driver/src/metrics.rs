//! Session counters
//!
//! Atomic counters updated by the reader thread and callers, readable from any
//! thread without taking the shared state lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the reader thread and the session
///
/// ```
/// use phd2_driver::SessionMetrics;
/// use std::sync::atomic::Ordering;
///
/// let m = SessionMetrics::new();
/// m.lines_received.fetch_add(4, Ordering::Relaxed);
/// m.malformed_lines.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(m.snapshot().malformed_rate(), 25.0);
/// ```
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Non-empty lines read from the stream
    pub lines_received: AtomicU64,
    /// Lines classified as RPC responses
    pub responses: AtomicU64,
    /// Events that changed state
    pub events_dispatched: AtomicU64,
    /// Events with no effect (unknown names included)
    pub events_ignored: AtomicU64,
    /// Lines dropped as undecodable or oversized
    pub malformed_lines: AtomicU64,
    pub requests_sent: AtomicU64,
    /// Read timeouts; expected while the server is idle
    pub read_timeouts: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            responses: self.responses.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            malformed_lines: self.malformed_lines.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of [`SessionMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lines_received: u64,
    pub responses: u64,
    pub events_dispatched: u64,
    pub events_ignored: u64,
    pub malformed_lines: u64,
    pub requests_sent: u64,
    pub read_timeouts: u64,
}

impl MetricsSnapshot {
    /// Share of received lines that could not be decoded, in percent
    pub fn malformed_rate(&self) -> f64 {
        if self.lines_received == 0 {
            return 0.0;
        }
        (self.malformed_lines as f64 / self.lines_received as f64) * 100.0
    }
}
