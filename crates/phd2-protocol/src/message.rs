//! Inbound message classification
//!
//! The server does not frame responses and events differently; the only
//! discriminator is the presence of the `jsonrpc` key. A response that omitted
//! it would be misrouted as an event (and then dropped for lack of an `Event`
//! name), so the marker is checked before anything else.

use crate::{GuiderEvent, ProtocolError};
use serde::Deserialize;
use serde_json::Value;

/// Error object of a failed RPC call
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// One RPC response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Split into the call result or the server-reported error.
    pub fn into_result(self) -> Result<Value, RpcErrorBody> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}

/// One decoded inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Response(RpcResponse),
    Event(GuiderEvent),
}

impl InboundMessage {
    /// Decode and classify one line (without its terminator).
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(line).map_err(ProtocolError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let obj = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        if obj.contains_key("jsonrpc") {
            let response: RpcResponse =
                serde_json::from_value(value).map_err(ProtocolError::InvalidResponse)?;
            return Ok(InboundMessage::Response(response));
        }

        let name = match obj.get("Event").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => return Err(ProtocolError::MissingEventName),
        };

        let event = serde_json::from_value(value)
            .map_err(|source| ProtocolError::InvalidEvent { name, source })?;
        Ok(InboundMessage::Event(event))
    }
}
