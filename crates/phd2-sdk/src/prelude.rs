//! Common imports
//!
//! ```rust
//! use phd2_sdk::prelude::*;
//! ```

pub use crate::client::{
    Guider, GuiderConfig, GuideStats, GuiderStatus, SettleProgress, SingleFrameParams,
    SingleFrameResult, Subframe, VersionInfo,
};
pub use crate::protocol::AppState;

pub use crate::client::GuiderError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::transport::TransportError;
