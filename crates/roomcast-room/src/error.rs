//! Error types for the room layer.

use roomcast_protocol::{ConnectionId, ProtocolError, RoomKey, RoomUid};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A live room already uses this (game, version, name) triple.
    #[error("a room named {0} already exists")]
    DuplicateRoom(RoomKey),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomUid),

    /// The room is at its limit.
    #[error("room {0} is full")]
    RoomFull(RoomUid),

    /// The room was closed by an operator.
    #[error("room {0} is closed")]
    RoomClosed(RoomUid),

    /// The peer is already in this room.
    #[error("peer {0} already in room {1}")]
    AlreadyInRoom(ConnectionId, RoomUid),

    /// The peer is not in this room.
    #[error("peer {0} not in room {1}")]
    NotInRoom(ConnectionId, RoomUid),

    /// The room's actor has stopped, usually because it was torn down
    /// while the command was in flight.
    #[error("room {0} is unavailable")]
    Unavailable(RoomUid),

    /// Encoding or payload validation failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RoomError {
    /// `true` for errors that mean "this room no longer exists" from the
    /// caller's point of view.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }
}
