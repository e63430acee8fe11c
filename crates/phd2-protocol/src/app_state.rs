//! Server application state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level operating mode reported by the server.
///
/// Any state name this crate does not know decodes to [`AppState::Unknown`],
/// which is also the state before the server has reported anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AppState {
    Stopped,
    Selected,
    Calibrating,
    Guiding,
    LostLock,
    Paused,
    Looping,
    #[default]
    #[serde(other)]
    Unknown,
}

impl AppState {
    /// Guiding, including the transient lost-lock state.
    pub fn is_guiding(self) -> bool {
        matches!(self, AppState::Guiding | AppState::LostLock)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppState::Stopped => "Stopped",
            AppState::Selected => "Selected",
            AppState::Calibrating => "Calibrating",
            AppState::Guiding => "Guiding",
            AppState::LostLock => "LostLock",
            AppState::Paused => "Paused",
            AppState::Looping => "Looping",
            AppState::Unknown => "Unknown",
        }
    }
}

impl FromStr for AppState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Stopped" => AppState::Stopped,
            "Selected" => AppState::Selected,
            "Calibrating" => AppState::Calibrating,
            "Guiding" => AppState::Guiding,
            "LostLock" => AppState::LostLock,
            "Paused" => AppState::Paused,
            "Looping" => AppState::Looping,
            _ => AppState::Unknown,
        })
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
