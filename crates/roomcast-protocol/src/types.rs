//! Core protocol types for roomcast's wire format.
//!
//! Everything in here is serialized and sent either to a peer over its
//! WebSocket or to a control-plane caller as part of an HTTP response.
//! The JSON shapes are fixed by existing clients, so the serde attributes
//! matter as much as the Rust types.

use std::fmt;
use std::str::FromStr;

use roomcast_transport::ConnectionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The globally unique identifier of a room.
///
/// A newtype over a random UUID. It is the path segment peers connect to
/// (`/<uid>`) and the key every control-plane call addresses. It never
/// changes after creation.
///
/// `#[serde(transparent)]` keeps the JSON form a bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomUid(Uuid);

impl RoomUid {
    /// Generates a fresh random uid.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoomUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the textual uid a client sends in a path.
impl FromStr for RoomUid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The (game, version, name) triple that must be unique across live rooms.
///
/// Two rooms may share a name as long as they belong to different games
/// or different versions of the same game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomKey {
    pub game: String,
    pub version: String,
    pub name: String,
}

impl RoomKey {
    pub fn new(
        game: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            game: game.into(),
            version: version.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {} ({})", self.name, self.game, self.version)
    }
}

// ---------------------------------------------------------------------------
// PublicRoom: the externally visible view of a room
// ---------------------------------------------------------------------------

/// One connected peer as listed on a [`PublicRoom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub uid: ConnectionId,
}

/// A snapshot of a room as seen by peers and control-plane callers.
///
/// The room actor produces one of these on demand. It holds no handle to
/// the connection machinery, only plain data.
///
/// `#[serde(rename_all = "camelCase")]` turns `clients_count` into
/// `clientsCount` on the wire. The metadata field is called `data` on
/// the wire for compatibility with existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoom {
    pub uid: RoomUid,
    pub game: String,
    pub version: String,
    pub name: String,
    /// Whether the room currently admits new peers.
    pub open: bool,
    /// Maximum number of peers; 0 means unlimited.
    pub limit: usize,
    /// Arbitrary metadata attached by control-plane callers.
    pub data: Map<String, Value>,
    /// Peers currently connected, in join order.
    pub clients: Vec<ClientRef>,
    /// Number of peers currently connected.
    pub clients_count: usize,
}

impl PublicRoom {
    /// Returns the string form of a top-level scalar field, or `None`
    /// for unknown fields.
    ///
    /// Listing filters arrive as query-string pairs, so every comparison
    /// is done on strings: `open=false` matches a closed room, `limit=2`
    /// matches a room limited to two peers.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "uid" => Some(self.uid.to_string()),
            "game" => Some(self.game.clone()),
            "version" => Some(self.version.clone()),
            "name" => Some(self.name.clone()),
            "open" => Some(self.open.to_string()),
            "limit" => Some(self.limit.to_string()),
            "clientsCount" => Some(self.clients_count.to_string()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Peer envelopes
// ---------------------------------------------------------------------------

/// Outcome marker carried by join responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Everything the server can tell a peer.
///
/// Adjacently tagged: `{"code": "player_join", "data": {"uid": "..."}}`.
/// The `code` strings are the contract with client SDKs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", content = "data", rename_all = "snake_case")]
pub enum PeerEvent {
    /// The peer was admitted. Sent once, before anything else.
    Connected { room: PublicRoom, uid: ConnectionId },

    /// Join rejected: the room reached its limit.
    RoomFull { room: PublicRoom },

    /// Join rejected: the room was closed by an administrator.
    RoomClosed { room: PublicRoom },

    /// Join rejected: the room went away between routing and admission.
    NotFound { room: Option<PublicRoom> },

    /// Another peer joined the room.
    PlayerJoin { uid: ConnectionId },

    /// Another peer left the room.
    PlayerLeave { uid: ConnectionId },

    /// A payload relayed from another peer, untouched.
    Broadcast(Value),

    /// Acknowledgement to the sender of a relayed payload. `cnt` is the
    /// number of peers the payload was handed to.
    MsgSent { msg: Value, cnt: usize },
}

/// The top-level frame sent to a peer.
///
/// Join outcomes carry a `status` next to the code; relay and lifecycle
/// events do not:
///
/// ```text
/// {"status":"success","code":"connected","data":{"room":{...},"uid":"..."}}
/// {"code":"broadcast","data":{"move":"e4"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(flatten)]
    pub event: PeerEvent,
}

impl PeerEnvelope {
    /// Successful admission.
    pub fn connected(room: PublicRoom, uid: ConnectionId) -> Self {
        Self {
            status: Some(Status::Success),
            event: PeerEvent::Connected { room, uid },
        }
    }

    /// A rejected join. `event` should be one of the rejection variants.
    pub fn rejected(event: PeerEvent) -> Self {
        Self {
            status: Some(Status::Error),
            event,
        }
    }

    /// A plain event without a status.
    pub fn event(event: PeerEvent) -> Self {
        Self {
            status: None,
            event,
        }
    }

    /// Returns the wire `code` of the wrapped event.
    pub fn code(&self) -> &'static str {
        match self.event {
            PeerEvent::Connected { .. } => "connected",
            PeerEvent::RoomFull { .. } => "room_full",
            PeerEvent::RoomClosed { .. } => "room_closed",
            PeerEvent::NotFound { .. } => "not_found",
            PeerEvent::PlayerJoin { .. } => "player_join",
            PeerEvent::PlayerLeave { .. } => "player_leave",
            PeerEvent::Broadcast(_) => "broadcast",
            PeerEvent::MsgSent { .. } => "msg_sent",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
