//! Asynchronous event notifications
//!
//! Every inbound line without a `jsonrpc` marker is an event object of the form
//! `{"Event": <name>, ...fields}`. Only the names and fields the client acts on
//! are modelled; everything else decodes to [`GuiderEvent::Other`] so new server
//! versions never break the reader.
//!
//! Numeric fields default to zero and string fields to empty when absent.

use crate::AppState;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "Event")]
pub enum GuiderEvent {
    /// Full state report, sent on connect and on some transitions
    AppState {
        #[serde(rename = "State", default)]
        state: AppState,
    },

    /// Server version, sent once on connect
    Version {
        #[serde(rename = "PHDVersion", default)]
        phd_version: String,
        #[serde(rename = "PHDSubver", default)]
        phd_subver: String,
        #[serde(rename = "MsgVersion", default)]
        msg_version: u32,
    },

    StartGuiding,

    /// One guide frame while guiding
    GuideStep {
        #[serde(rename = "Frame", default)]
        frame: u64,
        #[serde(rename = "AvgDist", default)]
        avg_dist: f64,
        #[serde(rename = "RADistanceRaw", default)]
        ra_distance_raw: f64,
        #[serde(rename = "DECDistanceRaw", default)]
        dec_distance_raw: f64,
    },

    SettleBegin,

    /// Settling progress after guide or dither
    Settling {
        #[serde(rename = "Distance", default)]
        distance: f64,
        #[serde(rename = "Time", default)]
        time: f64,
        #[serde(rename = "SettleTime", default)]
        settle_time: f64,
        #[serde(rename = "StarLocked", default)]
        star_locked: bool,
    },

    /// Settling finished; `status == 0` means success
    SettleDone {
        #[serde(rename = "Status", default)]
        status: i32,
        #[serde(rename = "Error", default)]
        error: Option<String>,
    },

    Paused,

    StartCalibration,

    LoopingExposures {
        #[serde(rename = "Frame", default)]
        frame: u64,
    },

    LoopingExposuresStopped,

    GuidingStopped,

    StarLost {
        #[serde(rename = "AvgDist", default)]
        avg_dist: f64,
    },

    /// Completion of a `capture_single_frame` request
    SingleFrameComplete {
        #[serde(rename = "Success", default)]
        success: bool,
        #[serde(rename = "Error", default)]
        error: Option<String>,
        #[serde(rename = "Path", default)]
        path: Option<String>,
    },

    /// Any event name not listed above
    #[serde(other)]
    Other,
}

impl GuiderEvent {
    /// Event name as it appears on the wire (`"Other"` for unrecognised events)
    pub fn name(&self) -> &'static str {
        match self {
            GuiderEvent::AppState { .. } => "AppState",
            GuiderEvent::Version { .. } => "Version",
            GuiderEvent::StartGuiding => "StartGuiding",
            GuiderEvent::GuideStep { .. } => "GuideStep",
            GuiderEvent::SettleBegin => "SettleBegin",
            GuiderEvent::Settling { .. } => "Settling",
            GuiderEvent::SettleDone { .. } => "SettleDone",
            GuiderEvent::Paused => "Paused",
            GuiderEvent::StartCalibration => "StartCalibration",
            GuiderEvent::LoopingExposures { .. } => "LoopingExposures",
            GuiderEvent::LoopingExposuresStopped => "LoopingExposuresStopped",
            GuiderEvent::GuidingStopped => "GuidingStopped",
            GuiderEvent::StarLost { .. } => "StarLost",
            GuiderEvent::SingleFrameComplete { .. } => "SingleFrameComplete",
            GuiderEvent::Other => "Other",
        }
    }
}
