//! Event interpretation
//!
//! The dispatcher turns decoded inbound messages into shared state changes.
//! It owns the two axis accumulators outright; they never leave the reader
//! thread, only the [`StatsSnapshot`] derived from them is published.
//!
//! Accumulation is suspended between `SettleBegin` and `SettleDone` so the
//! settling phase never pollutes the statistics.

use crate::state::{GuiderContext, SettleProgress, SingleFrameResult, VersionInfo};
use crate::stats::{StatAccumulator, StatsSnapshot};
use phd2_protocol::{AppState, GuiderEvent, InboundMessage};
use std::sync::Arc;
use tracing::{debug, trace};

/// What a dispatched message did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Published to the response slot
    Response,
    /// Event changed shared state
    Applied,
    /// Event had no effect
    Ignored,
}

/// Applies decoded messages to a [`GuiderContext`].
///
/// Owns the per-axis accumulators, so it lives on the reader thread; callers
/// only ever see the published snapshot.
///
/// ```
/// use phd2_driver::{EventDispatcher, GuiderContext};
/// use phd2_protocol::{AppState, GuiderEvent};
/// use std::sync::Arc;
///
/// let ctx = Arc::new(GuiderContext::new());
/// let mut dispatcher = EventDispatcher::new(ctx.clone());
/// dispatcher.handle_event(GuiderEvent::StartCalibration);
/// assert_eq!(ctx.app_state(), AppState::Calibrating);
/// ```
pub struct EventDispatcher {
    ctx: Arc<GuiderContext>,
    accumulating: bool,
    ra: StatAccumulator,
    dec: StatAccumulator,
}

impl EventDispatcher {
    pub fn new(ctx: Arc<GuiderContext>) -> Self {
        Self {
            ctx,
            accumulating: false,
            ra: StatAccumulator::new(),
            dec: StatAccumulator::new(),
        }
    }

    /// Route a response to the waiting caller, or apply an event.
    pub fn dispatch(&mut self, msg: InboundMessage) -> Dispatch {
        match msg {
            InboundMessage::Response(resp) => {
                trace!("RPC response: {:?}", resp);
                self.ctx.publish_response(resp);
                Dispatch::Response
            },
            InboundMessage::Event(ev) => self.handle_event(ev),
        }
    }

    /// Apply one event to shared state and the accumulators.
    pub fn handle_event(&mut self, ev: GuiderEvent) -> Dispatch {
        debug!("Event: {}", ev.name());

        match ev {
            GuiderEvent::AppState { state } => self.ctx.with_state(|s| {
                s.app_state = state;
                if state.is_guiding() {
                    // until the next GuideStep
                    s.avg_dist = 0.0;
                }
            }),

            GuiderEvent::Version {
                phd_version,
                phd_subver,
                msg_version,
            } => self.ctx.with_state(|s| {
                s.version = Some(VersionInfo {
                    phd_version,
                    phd_subver,
                    msg_version,
                })
            }),

            GuiderEvent::StartGuiding => {
                self.restart_accumulation();
            },

            GuiderEvent::GuideStep {
                avg_dist,
                ra_distance_raw,
                dec_distance_raw,
                ..
            } => {
                let snapshot = if self.accumulating {
                    self.ra.add(ra_distance_raw);
                    self.dec.add(dec_distance_raw);
                    Some(StatsSnapshot::from_accumulators(&self.ra, &self.dec))
                } else {
                    None
                };

                self.ctx.with_state(|s| {
                    s.app_state = AppState::Guiding;
                    s.avg_dist = avg_dist;
                    if let Some(snapshot) = snapshot {
                        s.stats = snapshot;
                    }
                });
            },

            GuiderEvent::SettleBegin => {
                self.accumulating = false;
            },

            GuiderEvent::Settling {
                distance,
                time,
                settle_time,
                ..
            } => self.ctx.with_state(|s| {
                s.settle = Some(SettleProgress {
                    done: false,
                    distance,
                    settle_px: s.settle_px,
                    time,
                    settle_time,
                    status: 0,
                    error: None,
                });
            }),

            GuiderEvent::SettleDone { status, error } => {
                self.restart_accumulation();
                self.ctx.with_state(|s| {
                    s.settle = Some(SettleProgress {
                        done: true,
                        status,
                        error,
                        ..Default::default()
                    });
                });
            },

            GuiderEvent::Paused => self.ctx.set_app_state(AppState::Paused),

            GuiderEvent::StartCalibration => self.ctx.set_app_state(AppState::Calibrating),

            GuiderEvent::LoopingExposures { .. } => self.ctx.set_app_state(AppState::Looping),

            GuiderEvent::LoopingExposuresStopped | GuiderEvent::GuidingStopped => {
                self.ctx.set_app_state(AppState::Stopped)
            },

            GuiderEvent::StarLost { avg_dist } => self.ctx.with_state(|s| {
                s.app_state = AppState::LostLock;
                s.avg_dist = avg_dist;
            }),

            GuiderEvent::SingleFrameComplete {
                success,
                error,
                path,
            } => self.ctx.with_state(|s| {
                s.single_frame = Some(SingleFrameResult {
                    success,
                    error,
                    path,
                })
            }),

            GuiderEvent::Other => return Dispatch::Ignored,
        }

        Dispatch::Applied
    }

    /// Samples recorded per axis since the last restart
    pub fn sample_counts(&self) -> (u64, u64) {
        (self.ra.count(), self.dec.count())
    }

    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }

    fn restart_accumulation(&mut self) {
        self.accumulating = true;
        self.ra.reset();
        self.dec.reset();
        let snapshot = StatsSnapshot::from_accumulators(&self.ra, &self.dec);
        self.ctx.with_state(|s| s.stats = snapshot);
    }
}
