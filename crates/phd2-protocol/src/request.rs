//! Outbound RPC requests

use crate::ProtocolError;
use serde::Serialize;
use serde_json::Value;

/// Correlation id used for every request.
///
/// The server echoes it back, but with at most one call in flight per
/// connection the response slot needs no per-call matching.
pub const RPC_ID: u64 = 1;

/// One outbound RPC request.
///
/// Parameters are normalised on construction: `null` is omitted from the wire,
/// arrays and objects pass through unchanged, and any other scalar is wrapped
/// in a one-element array.
///
/// # Example
///
/// ```
/// use phd2_protocol::RpcRequest;
/// use serde_json::json;
///
/// let req = RpcRequest::new("set_paused", json!(true));
/// assert_eq!(req.to_line().unwrap(), "{\"method\":\"set_paused\",\"id\":1,\"params\":[true]}\r\n");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => None,
            p @ (Value::Array(_) | Value::Object(_)) => Some(p),
            scalar => Some(Value::Array(vec![scalar])),
        };

        Self {
            method: method.into(),
            id: RPC_ID,
            params,
        }
    }

    /// Encode as one compact JSON line terminated by CR/LF.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = serde_json::to_string(self).map_err(ProtocolError::Encode)?;
        line.push_str("\r\n");
        Ok(line)
    }
}
