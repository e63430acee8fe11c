//! Settle parameters for `guide` and `dither`

use serde::Serialize;
use serde_json::{Value, json};

/// Settling criteria: the guide error must stay below `pixels` for `time`
/// seconds, giving up after `timeout` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SettleParams {
    pub pixels: f64,
    pub time: f64,
    pub timeout: f64,
}

impl SettleParams {
    pub fn new(pixels: f64, time: f64, timeout: f64) -> Self {
        Self { pixels, time, timeout }
    }

    fn to_value(self) -> Value {
        json!({
            "pixels": self.pixels,
            "time": self.time,
            "timeout": self.timeout,
        })
    }
}

/// `guide` params: `[settle, recalibrate]`
pub fn guide_params(settle: SettleParams, recalibrate: bool) -> Value {
    json!([settle.to_value(), recalibrate])
}

/// `dither` params: `[amount, ra_only, settle]`
pub fn dither_params(amount: f64, ra_only: bool, settle: SettleParams) -> Value {
    json!([amount, ra_only, settle.to_value()])
}
