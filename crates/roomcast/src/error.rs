//! Error types for the roomcast server.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roomcast_protocol::{ProtocolError, RoomKey};
use roomcast_room::RoomError;
use roomcast_transport::TransportError;
use serde_json::json;

/// A control-plane call that could not be served.
///
/// Rendered as `{"status":"error","code":...,"message":...}` with a
/// matching HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("missing parameters (game, version, name are required)")]
    MissingParameters,

    #[error("a room named {0} already exists")]
    NameAlreadyExists(RoomKey),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("no room found with uid {0}")]
    NotFound(String),
}

impl ControlError {
    /// The machine-readable `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameters => "missing_parameters",
            Self::NameAlreadyExists(_) => "name_already_exists",
            Self::InvalidData(_) => "invalid_data",
            Self::NotFound(_) => "not_found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameters | Self::InvalidData(_) => StatusCode::BAD_REQUEST,
            Self::NameAlreadyExists(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let body = json!({
            "status": "error",
            "code": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<RoomError> for ControlError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::DuplicateRoom(key) => Self::NameAlreadyExists(key),
            RoomError::NotFound(uid) | RoomError::Unavailable(uid) => {
                Self::NotFound(uid.to_string())
            }
            other => Self::InvalidData(other.to_string()),
        }
    }
}

impl From<ProtocolError> for ControlError {
    fn from(err: ProtocolError) -> Self {
        Self::InvalidData(err.to_string())
    }
}

impl From<JsonRejection> for ControlError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidData(rejection.body_text())
    }
}

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomcastError {
    /// A peer connection failed to send, receive or close.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encoding or decoding a frame failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room operation was refused.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Binding or serving the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
