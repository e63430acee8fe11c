//! `capture_single_frame` parameters

use crate::error::GuiderError;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Region of interest on the guide camera sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subframe {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Optional settings for a single exposure; unset fields use the server's
/// current camera settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SingleFrameParams {
    pub exposure: Option<Duration>,
    pub binning: Option<u32>,
    pub gain: Option<u32>,
    pub subframe: Option<Subframe>,
    /// Where to save the frame; requires `save` unset or true
    pub path: Option<String>,
    pub save: Option<bool>,
}

impl SingleFrameParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exposure(mut self, exposure: Duration) -> Self {
        self.exposure = Some(exposure);
        self
    }

    pub fn binning(mut self, binning: u32) -> Self {
        self.binning = Some(binning);
        self
    }

    pub fn gain(mut self, gain: u32) -> Self {
        self.gain = Some(gain);
        self
    }

    pub fn subframe(mut self, subframe: Subframe) -> Self {
        self.subframe = Some(subframe);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn save(mut self, save: bool) -> Self {
        self.save = Some(save);
        self
    }

    /// Reject contradictory settings before anything is sent.
    pub fn validate(&self) -> Result<(), GuiderError> {
        if self.path.is_some() && self.save == Some(false) {
            return Err(GuiderError::InvalidArgument(
                "when save is false, the path argument should be omitted".to_string(),
            ));
        }
        Ok(())
    }

    /// RPC params object; exposure is sent in milliseconds
    pub fn to_params(&self) -> Value {
        let mut params = Map::new();
        if let Some(exposure) = self.exposure {
            params.insert("exposure".into(), json!(exposure.as_millis() as u64));
        }
        if let Some(binning) = self.binning {
            params.insert("binning".into(), json!(binning));
        }
        if let Some(gain) = self.gain {
            params.insert("gain".into(), json!(gain));
        }
        if let Some(r) = self.subframe {
            params.insert("subframe".into(), json!([r.x, r.y, r.width, r.height]));
        }
        if let Some(path) = &self.path {
            params.insert("path".into(), json!(path));
        }
        if let Some(save) = self.save {
            params.insert("save".into(), json!(save));
        }
        Value::Object(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params_is_empty_object() {
        assert_eq!(SingleFrameParams::new().to_params(), json!({}));
    }

    #[test]
    fn test_full_params() {
        let p = SingleFrameParams::new()
            .exposure(Duration::from_millis(5432))
            .binning(2)
            .gain(40)
            .subframe(Subframe {
                x: 10,
                y: 20,
                width: 100,
                height: 80,
            })
            .path("/tmp/frame.fits");
        assert!(p.validate().is_ok());
        assert_eq!(
            p.to_params(),
            json!({
                "exposure": 5432,
                "binning": 2,
                "gain": 40,
                "subframe": [10, 20, 100, 80],
                "path": "/tmp/frame.fits"
            })
        );
    }

    #[test]
    fn test_path_without_save_rejected() {
        let p = SingleFrameParams::new().path("/tmp/x.fits").save(false);
        assert!(matches!(p.validate(), Err(GuiderError::InvalidArgument(_))));

        let p = SingleFrameParams::new().path("/tmp/x.fits").save(true);
        assert!(p.validate().is_ok());
        let p = SingleFrameParams::new().save(false);
        assert!(p.validate().is_ok());
    }
}
