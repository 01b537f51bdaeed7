//! Codec trait and the JSON implementation.
//!
//! Peers speak JSON text frames, so a codec here turns values into
//! `String`s ready to be sent as one WebSocket text frame, and bytes
//! read from a peer back into values.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::ProtocolError;

/// A codec that can encode Rust types to text frames and decode bytes
/// back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// room task and connection handler.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Besides the typed encode/decode it knows the two untyped parses the
/// server needs: a peer frame into an arbitrary JSON value, and a
/// control-plane body into a JSON object.
///
/// ```rust
/// use roomcast_protocol::{Codec, JsonCodec, PeerEnvelope, PeerEvent};
///
/// let codec = JsonCodec;
/// let env = PeerEnvelope::event(PeerEvent::Broadcast(serde_json::json!({"move": "e4"})));
/// let frame = codec.encode(&env).unwrap();
/// assert_eq!(frame, r#"{"code":"broadcast","data":{"move":"e4"}}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Parses a raw peer frame as opaque structured data.
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedMessage` if the frame isn't JSON.
    /// Callers drop such frames without telling the peer.
    pub fn parse_frame(&self, data: &[u8]) -> Result<Value, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::MalformedMessage)
    }

    /// Requires `value` to be a JSON object and returns its map.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidPayload` naming what was found
    /// instead.
    pub fn expect_object(
        &self,
        value: Value,
    ) -> Result<Map<String, Value>, ProtocolError> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(ProtocolError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }
}

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
