//! # PHD2 Client
//!
//! Blocking client for the PHD2 autoguiding server: guide, dither, track
//! settling, read guide statistics, stop and start capture, and switch
//! equipment profiles.
//!
//! ```no_run
//! use phd2_client::Guider;
//!
//! let mut guider = Guider::new("localhost", 1);
//! guider.connect()?;
//! guider.connect_equipment("Simulator")?;
//! guider.loop_exposures()?;
//! println!("{:?}", guider.get_status()?);
//! # Ok::<(), phd2_client::GuiderError>(())
//! ```

pub mod config;
pub mod error;
pub mod guider;
pub mod single_frame;

pub use config::GuiderConfig;
pub use error::GuiderError;
pub use guider::Guider;
pub use single_frame::{SingleFrameParams, Subframe};

pub use phd2_driver::{GuideStats, GuiderStatus, SettleProgress, SingleFrameResult, VersionInfo};
pub use phd2_protocol::AppState;
