//! Wire protocol for roomcast.
//!
//! This crate defines what travels between the server and its clients:
//!
//! - **Types** ([`RoomUid`], [`RoomKey`], [`PublicRoom`], [`PeerEnvelope`],
//!   [`PeerEvent`]): identities, the public view of a room, and every
//!   frame a peer can receive.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values become
//!   text frames and how inbound bytes are parsed.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about rooms as running things; it
//! only describes them.
//!
//! ```text
//! Transport (frames) → Protocol (envelopes) → Room (actors)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use roomcast_transport::ConnectionId;
pub use types::{
    ClientRef, PeerEnvelope, PeerEvent, PublicRoom, RoomKey, RoomUid, Status,
};
