//! # PHD2 Protocol
//!
//! Wire-level types for the PHD2 event monitoring / JSON-RPC connection.
//!
//! The server speaks line-delimited JSON over one TCP stream. Outbound lines are
//! RPC requests; inbound lines are either RPC responses (they carry a `jsonrpc`
//! marker) or asynchronous event notifications (they carry an `Event` name).
//!
//! This crate is pure encoding/decoding: no IO, no threads, no shared state.
//!
//! - [`RpcRequest`]: outbound request builder and line encoder
//! - [`InboundMessage`]: classification of one inbound line
//! - [`GuiderEvent`]: the typed event vocabulary
//! - [`AppState`]: the server's top-level operating mode

pub mod app_state;
pub mod event;
pub mod message;
pub mod methods;
pub mod profile;
pub mod request;
pub mod settle;

pub use app_state::AppState;
pub use event::GuiderEvent;
pub use message::{InboundMessage, RpcErrorBody, RpcResponse};
pub use profile::Profile;
pub use request::{RPC_ID, RpcRequest};
pub use settle::{SettleParams, dither_params, guide_params};

use thiserror::Error;

/// Protocol encode/decode errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The line is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The line is valid JSON but not an object
    #[error("Message is not a JSON object")]
    NotAnObject,

    /// Neither a `jsonrpc` marker nor an `Event` name was present
    #[error("Message has neither a jsonrpc marker nor an Event name")]
    MissingEventName,

    /// A known event carried fields of the wrong type
    #[error("Invalid {name} event: {source}")]
    InvalidEvent {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A response object could not be decoded
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    /// Request serialization failed
    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}
