//! # PHD2 Driver
//!
//! Connection management for a PHD2 guider:
//! - background reader thread decoding the inbound stream
//! - event state machine maintaining application state, guide statistics and
//!   settle progress
//! - synchronous RPC correlated through a single response slot
//!
//! Most users want the higher-level `phd2-client` crate instead.

mod builder;
pub mod dispatcher;
mod error;
pub mod metrics;
pub mod pipeline;
mod session;
pub mod state;
pub mod stats;

pub use builder::{DEFAULT_BASE_PORT, SessionBuilder};
pub use dispatcher::{Dispatch, EventDispatcher};
pub use error::DriverError;
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use pipeline::reader_loop;
pub use session::{GuiderSession, SessionConfig};
pub use state::{
    GuiderContext, GuiderStatus, SettleProgress, SettleRollback, SharedState, SingleFrameResult,
    VersionInfo,
};
pub use stats::{GuideStats, StatAccumulator, StatsSnapshot};
