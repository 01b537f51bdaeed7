//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding roomcast messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into a frame).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization into a typed value failed.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A control-plane body was not the structured data the operation
    /// needs. Surfaced to the caller as an `invalid_data` response.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A peer frame was not JSON. Never surfaced to the peer; the frame
    /// is dropped.
    #[error("malformed peer message: {0}")]
    MalformedMessage(serde_json::Error),
}
