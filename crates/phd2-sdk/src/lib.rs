//! PHD2 SDK - Rust client for the PHD2 autoguiding server
//!
//! # Layers
//!
//! - **transport** ([`transport`]): line-oriented TCP stream, mock stream for tests
//! - **protocol** ([`protocol`]): JSON-RPC requests, event vocabulary
//! - **driver** ([`driver`]): reader thread, shared state, synchronous calls
//! - **client** ([`client`]): guiding, dithering, settling, equipment profiles
//!
//! # Quick start
//!
//! ```no_run
//! use phd2_sdk::prelude::*;
//!
//! phd2_sdk::logging::init_logger("phd2=info").ok();
//!
//! let mut guider = Guider::new("localhost", 1);
//! guider.connect()?;
//! guider.guide(1.5, 10.0, 100.0)?;
//! # Ok::<(), GuiderError>(())
//! ```

pub use phd2_client as client;
pub use phd2_driver as driver;
pub use phd2_protocol as protocol;
pub use phd2_transport as transport;

pub mod logging;
pub mod prelude;

pub use client::{Guider, GuiderConfig, GuiderError};
pub use driver::DriverError;
pub use protocol::{AppState, ProtocolError};
pub use transport::TransportError;
