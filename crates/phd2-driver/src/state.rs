//! Shared session state
//!
//! Everything the reader thread publishes and caller threads read sits in one
//! [`SharedState`] behind a single `parking_lot::Mutex`, paired with one
//! `Condvar` that wakes callers waiting for an RPC response or for the link
//! to close. Nothing here is touched without holding the lock.

use crate::error::DriverError;
use crate::stats::{GuideStats, StatsSnapshot};
use parking_lot::{Condvar, Mutex};
use phd2_protocol::{AppState, RpcResponse};

/// Progress of the settle that follows a guide or dither command
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettleProgress {
    pub done: bool,
    /// Current guide error (pixels)
    pub distance: f64,
    /// Settle threshold requested by the originating call (pixels)
    pub settle_px: f64,
    /// Seconds spent below the threshold so far
    pub time: f64,
    /// Seconds required below the threshold
    pub settle_time: f64,
    /// Final status; 0 is success. Only meaningful once `done`.
    pub status: i32,
    pub error: Option<String>,
}

impl SettleProgress {
    /// Tentative progress published before a guide/dither call is sent
    pub fn pending(distance: f64, settle_px: f64) -> Self {
        Self {
            distance,
            settle_px,
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.done && self.status == 0
    }
}

/// Settle state displaced by [`GuiderContext::try_begin_settle`]
#[derive(Debug, Clone, PartialEq)]
#[must_use = "pass to rollback_settle if the command fails"]
pub struct SettleRollback {
    previous: Option<SettleProgress>,
    settle_px: f64,
}

/// Server version as reported on connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub phd_version: String,
    pub phd_subver: String,
    pub msg_version: u32,
}

/// Outcome of `capture_single_frame`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleFrameResult {
    pub success: bool,
    pub error: Option<String>,
    pub path: Option<String>,
}

/// Application state and last guide distance, read together
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuiderStatus {
    pub app_state: AppState,
    pub avg_dist: f64,
}

#[derive(Debug)]
pub struct SharedState {
    pub app_state: AppState,
    pub avg_dist: f64,
    pub stats: StatsSnapshot,
    pub settle: Option<SettleProgress>,
    /// Threshold of the last guide/dither call, stamped onto progress events
    pub settle_px: f64,
    pub version: Option<VersionInfo>,
    pub single_frame: Option<SingleFrameResult>,
    /// At most one unconsumed response
    pub response: Option<RpcResponse>,
    pub link_open: bool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            app_state: AppState::Unknown,
            avg_dist: 0.0,
            stats: StatsSnapshot::default(),
            settle: None,
            settle_px: 0.0,
            version: None,
            single_frame: None,
            response: None,
            link_open: true,
        }
    }
}

/// State block shared between the reader thread and callers
///
/// The reader thread writes through [`with_state`](Self::with_state) and
/// [`publish_response`](Self::publish_response); callers read snapshots.
///
/// # Example
///
/// ```
/// use phd2_driver::{GuiderContext, SettleProgress};
/// use phd2_protocol::AppState;
///
/// let ctx = GuiderContext::new();
/// assert_eq!(ctx.app_state(), AppState::Unknown);
///
/// let rollback = ctx.try_begin_settle(SettleProgress::pending(0.0, 1.5)).unwrap();
/// // a second command is refused while the first is settling
/// assert!(ctx.try_begin_settle(SettleProgress::pending(0.0, 1.5)).is_none());
///
/// // the command failed: state is as before
/// ctx.rollback_settle(rollback);
/// assert!(!ctx.has_settle());
/// ```
#[derive(Debug, Default)]
pub struct GuiderContext {
    state: Mutex<SharedState>,
    changed: Condvar,
}

impl GuiderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the state locked.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> R {
        let mut guard = self.state.lock();
        f(&mut guard)
    }

    /// Application state and last guide distance, read under one lock
    pub fn status(&self) -> GuiderStatus {
        let s = self.state.lock();
        GuiderStatus {
            app_state: s.app_state,
            avg_dist: s.avg_dist,
        }
    }

    pub fn app_state(&self) -> AppState {
        self.state.lock().app_state
    }

    /// Overwrite the application state from a direct query.
    pub fn set_app_state(&self, app_state: AppState) {
        self.state.lock().app_state = app_state;
    }

    /// Guide statistics with `rms_tot` derived from the per-axis figures
    pub fn stats(&self) -> GuideStats {
        GuideStats::from(self.state.lock().stats)
    }

    pub fn version(&self) -> Option<VersionInfo> {
        self.state.lock().version.clone()
    }

    // ---- settle tracking ----

    /// Install `pending` unless a settle is already in flight.
    ///
    /// Returns `None`, leaving the existing progress untouched, if one is.
    /// Otherwise returns what was displaced, for
    /// [`rollback_settle`](Self::rollback_settle) should the command fail.
    pub fn try_begin_settle(&self, pending: SettleProgress) -> Option<SettleRollback> {
        let mut s = self.state.lock();
        if matches!(&s.settle, Some(p) if !p.done) {
            return None;
        }
        let rollback = SettleRollback {
            previous: s.settle.take(),
            settle_px: s.settle_px,
        };
        s.settle_px = pending.settle_px;
        s.settle = Some(pending);
        Some(rollback)
    }

    /// Undo [`try_begin_settle`](Self::try_begin_settle) after a failed call.
    ///
    /// A finished settle that had not been read yet comes back, and progress
    /// events are stamped with the previous threshold again.
    pub fn rollback_settle(&self, rollback: SettleRollback) {
        let mut s = self.state.lock();
        s.settle = rollback.previous;
        s.settle_px = rollback.settle_px;
    }

    /// Whether any settle is tracked, finished or not
    pub fn has_settle(&self) -> bool {
        self.state.lock().settle.is_some()
    }

    /// Install `progress` only if nothing is tracked.
    pub fn seed_settle_if_absent(&self, progress: SettleProgress) {
        let mut s = self.state.lock();
        if s.settle.is_none() {
            s.settle = Some(progress);
        }
    }

    /// Current settle progress; a finished settle is handed out once and cleared.
    pub fn check_settle(&self) -> Option<SettleProgress> {
        let mut s = self.state.lock();
        let done = s.settle.as_ref()?.done;
        if done { s.settle.take() } else { s.settle.clone() }
    }

    // ---- single frame ----

    pub fn clear_single_frame(&self) {
        self.state.lock().single_frame = None;
    }

    /// Result of the last single frame capture, handed out once
    pub fn take_single_frame(&self) -> Option<SingleFrameResult> {
        self.state.lock().single_frame.take()
    }

    // ---- response slot / link ----

    /// False once the reader thread has exited
    pub fn is_connected(&self) -> bool {
        self.state.lock().link_open
    }

    /// Drop any response nobody waited for.
    pub fn clear_response(&self) {
        self.state.lock().response = None;
    }

    /// Fill the response slot and wake the caller blocked in `call`.
    pub fn publish_response(&self, response: RpcResponse) {
        let mut s = self.state.lock();
        s.response = Some(response);
        self.changed.notify_all();
    }

    /// Block until a response is published or the link closes.
    ///
    /// A response that arrived before the link closed is still delivered.
    pub fn wait_response(&self) -> Result<RpcResponse, DriverError> {
        let mut s = self.state.lock();
        loop {
            if let Some(resp) = s.response.take() {
                return Ok(resp);
            }
            if !s.link_open {
                return Err(DriverError::Disconnected);
            }
            self.changed.wait(&mut s);
        }
    }

    /// Mark the stream as ended and release every waiter.
    pub fn mark_closed(&self) {
        let mut s = self.state.lock();
        s.link_open = false;
        self.changed.notify_all();
    }
}
