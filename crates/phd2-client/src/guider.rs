//! High-level guider operations
//!
//! [`Guider`] sequences RPCs and reads the session's derived state. Two
//! operations, `stop_capture` and `loop_exposures`, have no acknowledgement
//! event and instead poll the application state at a fixed interval up to a
//! deadline.

use crate::config::GuiderConfig;
use crate::error::GuiderError;
use crate::single_frame::SingleFrameParams;
use phd2_driver::{
    GuideStats, GuiderContext, GuiderSession, GuiderStatus, MetricsSnapshot, SettleProgress,
    SingleFrameResult, VersionInfo,
};
use phd2_protocol::{AppState, Profile, SettleParams, dither_params, guide_params, methods};
use phd2_transport::SplittableStream;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of polls that fit in `timeout`, at least one.
fn poll_count(timeout: Duration, interval: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    let polls = timeout.as_millis() / interval_ms;
    u32::try_from(polls).unwrap_or(u32::MAX).max(1)
}

/// Client for one guider instance.
///
/// # Example
///
/// ```no_run
/// use phd2_client::Guider;
///
/// let mut guider = Guider::new("localhost", 1);
/// guider.connect()?;
/// guider.guide(1.5, 10.0, 100.0)?;
/// while guider.is_settling()? {
///     std::thread::sleep(std::time::Duration::from_secs(1));
///     let progress = guider.check_settling()?;
///     if progress.done {
///         break;
///     }
/// }
/// # Ok::<(), phd2_client::GuiderError>(())
/// ```
pub struct Guider {
    config: GuiderConfig,
    session: Option<GuiderSession>,
}

impl Guider {
    /// Client for instance `instance` on `host` with default timeouts.
    /// Nothing is opened until [`connect`](Self::connect).
    pub fn new(host: impl Into<String>, instance: u32) -> Self {
        Self::with_config(GuiderConfig::new(host, instance))
    }

    /// Client built from a loaded configuration.
    ///
    /// ```no_run
    /// use phd2_client::{Guider, GuiderConfig};
    ///
    /// let config = GuiderConfig::load_from_file("guider.toml")?;
    /// let mut guider = Guider::with_config(config);
    /// guider.connect()?;
    /// # Ok::<(), phd2_client::GuiderError>(())
    /// ```
    pub fn with_config(config: GuiderConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &GuiderConfig {
        &self.config
    }

    // ---- connection ----

    /// Open the TCP connection and start the reader thread.
    ///
    /// Any previous session is closed first.
    pub fn connect(&mut self) -> Result<(), GuiderError> {
        self.disconnect();
        self.config.validate()?;

        let session = self
            .config
            .session_builder()
            .build()
            .map_err(|source| GuiderError::Connection {
                addr: self.config.address(),
                source,
            })?;
        info!("Connected to guider at {}", self.config.address());
        self.session = Some(session);
        Ok(())
    }

    /// Attach to an already connected stream.
    pub fn connect_with<S: SplittableStream>(&mut self, stream: S) -> Result<(), GuiderError> {
        self.disconnect();
        let session = GuiderSession::new(stream, self.config.session_config())?;
        self.session = Some(session);
        Ok(())
    }

    /// Close the connection and join the reader thread. No-op if not connected.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            info!("Disconnected from guider");
        }
    }

    /// Whether a session is open and its stream has not ended
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_connected())
    }

    fn session(&self) -> Result<&GuiderSession, GuiderError> {
        let session = self.session.as_ref().ok_or(GuiderError::NotConnected)?;
        if !session.is_connected() {
            return Err(GuiderError::Disconnected);
        }
        Ok(session)
    }

    /// Shared state of a live session. Snapshots taken after the stream ended
    /// would be frozen, so they fail like calls do.
    fn context(&self) -> Result<&Arc<GuiderContext>, GuiderError> {
        Ok(self.session()?.context())
    }

    /// Raw RPC; the result is returned as JSON.
    pub fn call(&self, method: &str, params: Value) -> Result<Value, GuiderError> {
        Ok(self.session()?.call(method, params)?)
    }

    // ---- guiding and settling ----

    /// Start guiding, then settle within `settle_pixels` for `settle_time`
    /// seconds, giving up after `settle_timeout` seconds.
    ///
    /// Returns once the server accepts the command; track the settle with
    /// [`is_settling`](Self::is_settling) / [`check_settling`](Self::check_settling).
    pub fn guide(
        &self,
        settle_pixels: f64,
        settle_time: f64,
        settle_timeout: f64,
    ) -> Result<(), GuiderError> {
        let settle = SettleParams::new(settle_pixels, settle_time, settle_timeout);
        self.settle_command(
            methods::GUIDE,
            guide_params(settle, false),
            SettleProgress::pending(0.0, settle_pixels),
        )
    }

    /// Dither by `dither_pixels`, then settle as for [`guide`](Self::guide).
    pub fn dither(
        &self,
        dither_pixels: f64,
        settle_pixels: f64,
        settle_time: f64,
        settle_timeout: f64,
    ) -> Result<(), GuiderError> {
        let settle = SettleParams::new(settle_pixels, settle_time, settle_timeout);
        self.settle_command(
            methods::DITHER,
            dither_params(dither_pixels, false, settle),
            SettleProgress::pending(dither_pixels, settle_pixels),
        )
    }

    fn settle_command(
        &self,
        method: &'static str,
        params: Value,
        pending: SettleProgress,
    ) -> Result<(), GuiderError> {
        let session = self.session()?;
        let ctx = session.context();

        let Some(rollback) = ctx.try_begin_settle(pending) else {
            return Err(GuiderError::AlreadySettling);
        };

        if let Err(e) = session.call(method, params) {
            ctx.rollback_settle(rollback);
            return Err(e.into());
        }
        debug!("{} accepted, settling", method);
        Ok(())
    }

    /// Whether a settle is in progress (or finished but not yet checked).
    pub fn is_settling(&self) -> Result<bool, GuiderError> {
        let session = self.session()?;
        let ctx = session.context();
        if ctx.has_settle() {
            return Ok(true);
        }

        // attached to a server that was already settling
        let result = session.call(methods::GET_SETTLING, Value::Null)?;
        let settling = result.as_bool().ok_or(GuiderError::UnexpectedResult {
            method: methods::GET_SETTLING,
            result,
        })?;
        if settling {
            ctx.seed_settle_if_absent(SettleProgress::pending(-1.0, 0.0));
        }
        Ok(settling)
    }

    /// Latest settle progress. A finished settle is returned once, then cleared.
    ///
    /// Fails with [`GuiderError::Disconnected`] once the stream has ended, so
    /// a caller polling for `done` is not left waiting on a settle that can
    /// no longer finish.
    pub fn check_settling(&self) -> Result<SettleProgress, GuiderError> {
        self.context()?.check_settle().ok_or(GuiderError::NotSettling)
    }

    /// Guide error statistics since guiding started or the last settle finished
    pub fn get_stats(&self) -> Result<GuideStats, GuiderError> {
        Ok(self.context()?.stats())
    }

    // ---- capture ----

    /// [`stop_capture_timeout`](Self::stop_capture_timeout) with the configured timeout
    pub fn stop_capture(&self) -> Result<(), GuiderError> {
        self.stop_capture_timeout(self.config.stop_capture_timeout())
    }

    /// Stop looping or guiding and wait for the Stopped state.
    pub fn stop_capture_timeout(&self, timeout: Duration) -> Result<(), GuiderError> {
        self.call(methods::STOP_CAPTURE, Value::Null)?;

        let interval = self.config.poll_interval();
        for _ in 0..poll_count(timeout, interval) {
            if self.session()?.status().app_state == AppState::Stopped {
                return Ok(());
            }
            thread::sleep(interval);
        }

        // the server does not always announce the transition; ask directly
        debug!("StopCapture: no Stopped event, querying app state");
        let state = self.query_app_state()?;
        self.context()?.set_app_state(state);
        if state == AppState::Stopped {
            return Ok(());
        }

        warn!("StopCapture: still {} after {:?}", state, timeout);
        Err(GuiderError::Timeout {
            waiting_for: "guiding to stop looping",
            timeout,
        })
    }

    /// [`loop_exposures_timeout`](Self::loop_exposures_timeout) with the configured timeout
    pub fn loop_exposures(&self) -> Result<(), GuiderError> {
        self.loop_exposures_timeout(self.config.loop_timeout())
    }

    /// Start looping exposures and wait for the Looping state.
    pub fn loop_exposures_timeout(&self, timeout: Duration) -> Result<(), GuiderError> {
        if self.session()?.status().app_state == AppState::Looping {
            return Ok(());
        }

        let exposure = self.get_exposure()?;
        self.call(methods::LOOP, Value::Null)?;
        thread::sleep(exposure);

        let interval = self.config.poll_interval();
        for _ in 0..poll_count(timeout, interval) {
            if self.session()?.status().app_state == AppState::Looping {
                return Ok(());
            }
            thread::sleep(interval);
        }

        warn!("Loop: Looping not reached after {:?}", timeout);
        Err(GuiderError::Timeout {
            waiting_for: "guiding to start looping",
            timeout,
        })
    }

    fn query_app_state(&self) -> Result<AppState, GuiderError> {
        let result = self.call(methods::GET_APP_STATE, Value::Null)?;
        match result.as_str() {
            Some(s) => Ok(s.parse::<AppState>().unwrap_or_default()),
            None => Err(GuiderError::UnexpectedResult {
                method: methods::GET_APP_STATE,
                result,
            }),
        }
    }

    /// Guider image scale in arc-seconds per pixel
    pub fn pixel_scale(&self) -> Result<f64, GuiderError> {
        let result = self.call(methods::GET_PIXEL_SCALE, Value::Null)?;
        result.as_f64().ok_or(GuiderError::UnexpectedResult {
            method: methods::GET_PIXEL_SCALE,
            result,
        })
    }

    /// Current exposure duration
    pub fn get_exposure(&self) -> Result<Duration, GuiderError> {
        let result = self.call(methods::GET_EXPOSURE, Value::Null)?;
        match result.as_u64() {
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Err(GuiderError::UnexpectedResult {
                method: methods::GET_EXPOSURE,
                result,
            }),
        }
    }

    // ---- equipment ----

    fn profiles(&self) -> Result<Vec<Profile>, GuiderError> {
        let result = self.call(methods::GET_PROFILES, Value::Null)?;
        serde_json::from_value(result.clone()).map_err(|_| GuiderError::UnexpectedResult {
            method: methods::GET_PROFILES,
            result,
        })
    }

    /// Names of all equipment profiles, in server order
    pub fn get_equipment_profiles(&self) -> Result<Vec<String>, GuiderError> {
        Ok(self.profiles()?.into_iter().map(|p| p.name).collect())
    }

    /// Make `profile_name` the active profile and connect its equipment.
    ///
    /// If another profile is active, capture is stopped and its equipment
    /// disconnected before switching.
    pub fn connect_equipment(&self, profile_name: &str) -> Result<(), GuiderError> {
        let result = self.call(methods::GET_PROFILE, Value::Null)?;
        let current: Profile =
            serde_json::from_value(result.clone()).map_err(|_| GuiderError::UnexpectedResult {
                method: methods::GET_PROFILE,
                result,
            })?;

        if current.name != profile_name {
            let id = self
                .profiles()?
                .into_iter()
                .find(|p| p.name == profile_name)
                .map_or(-1, |p| p.id);
            if id == -1 {
                return Err(GuiderError::ProfileNotFound(profile_name.to_string()));
            }

            info!("Switching profile {} -> {}", current.name, profile_name);
            self.stop_capture()?;
            self.call(methods::SET_CONNECTED, Value::Bool(false))?;
            self.call(methods::SET_PROFILE, Value::from(id))?;
        }

        self.call(methods::SET_CONNECTED, Value::Bool(true))?;
        Ok(())
    }

    /// Stop capture, then disconnect the active profile's equipment.
    pub fn disconnect_equipment(&self) -> Result<(), GuiderError> {
        self.stop_capture()?;
        self.call(methods::SET_CONNECTED, Value::Bool(false))?;
        Ok(())
    }

    // ---- status ----

    /// Application state and current guide error, read together
    pub fn get_status(&self) -> Result<GuiderStatus, GuiderError> {
        Ok(self.context()?.status())
    }

    pub fn is_guiding(&self) -> Result<bool, GuiderError> {
        Ok(self.get_status()?.app_state.is_guiding())
    }

    /// Server version, once reported
    pub fn version(&self) -> Result<Option<VersionInfo>, GuiderError> {
        Ok(self.context()?.version())
    }

    /// Session counters. Still readable after the stream ends, until
    /// [`disconnect`](Self::disconnect).
    pub fn metrics(&self) -> Result<MetricsSnapshot, GuiderError> {
        self.session
            .as_ref()
            .map(|s| s.metrics())
            .ok_or(GuiderError::NotConnected)
    }

    // ---- misc commands ----

    /// Pause guiding; looping exposures continue.
    pub fn pause(&self) -> Result<(), GuiderError> {
        self.call(methods::SET_PAUSED, Value::Bool(true))?;
        Ok(())
    }

    pub fn unpause(&self) -> Result<(), GuiderError> {
        self.call(methods::SET_PAUSED, Value::Bool(false))?;
        Ok(())
    }

    /// Save the current guide frame as FITS and return its file name.
    ///
    /// The caller owns the file and should remove it when done.
    pub fn save_image(&self) -> Result<String, GuiderError> {
        let result = self.call(methods::SAVE_IMAGE, Value::Null)?;
        match result.get("filename").and_then(Value::as_str) {
            Some(name) => Ok(name.to_string()),
            None => Err(GuiderError::UnexpectedResult {
                method: methods::SAVE_IMAGE,
                result,
            }),
        }
    }

    /// Terminate the guider application.
    pub fn shutdown_server(&self) -> Result<(), GuiderError> {
        self.call(methods::SHUTDOWN, Value::Null)?;
        Ok(())
    }

    /// Start one exposure; poll [`check_single_frame`](Self::check_single_frame)
    /// for the outcome.
    pub fn capture_single_frame(&self, params: &SingleFrameParams) -> Result<(), GuiderError> {
        params.validate()?;
        let session = self.session()?;
        session.context().clear_single_frame();
        session.call(methods::CAPTURE_SINGLE_FRAME, params.to_params())?;
        Ok(())
    }

    /// Outcome of the last single frame capture, once; `None` while pending.
    pub fn check_single_frame(&self) -> Result<Option<SingleFrameResult>, GuiderError> {
        Ok(self.context()?.take_single_frame())
    }
}
