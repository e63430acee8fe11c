//! RPC method names consumed by the client

pub const GUIDE: &str = "guide";
pub const DITHER: &str = "dither";
pub const GET_SETTLING: &str = "get_settling";
pub const STOP_CAPTURE: &str = "stop_capture";
pub const GET_APP_STATE: &str = "get_app_state";
pub const GET_EXPOSURE: &str = "get_exposure";
pub const LOOP: &str = "loop";
pub const GET_PIXEL_SCALE: &str = "get_pixel_scale";
pub const GET_PROFILES: &str = "get_profiles";
pub const GET_PROFILE: &str = "get_profile";
pub const SET_CONNECTED: &str = "set_connected";
pub const SET_PROFILE: &str = "set_profile";
pub const SET_PAUSED: &str = "set_paused";
pub const SAVE_IMAGE: &str = "save_image";
pub const CAPTURE_SINGLE_FRAME: &str = "capture_single_frame";
pub const SHUTDOWN: &str = "shutdown";
