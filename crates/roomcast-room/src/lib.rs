//! Room registry and broadcast engine for roomcast.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! peers, admission state and metadata. The [`RoomRegistry`] indexes live
//! rooms by uid and by (game, version, name) and is the only way to
//! create, find or remove them.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, finds and removes rooms
//! - [`RoomHandle`]: sends commands to a running room actor
//! - [`BroadcastChannel`]: encodes once, fans out to every peer but one
//! - [`AdmissionState`] / [`Population`]: the room's two state machines
//! - [`Metadata`]: the opaque JSON attached to a room
//! - [`RoomConfig`]: queue sizes shared by every room

pub mod admission;
mod broadcast;
mod config;
mod connections;
mod error;
mod metadata;
mod registry;
mod room;

pub use broadcast::BroadcastChannel;
pub use config::{AdmissionState, CloseReason, Population, RoomConfig};
pub use connections::{ConnectionSet, Frame, PeerSender};
pub use error::RoomError;
pub use metadata::{MergeMode, Metadata};
pub use registry::{RoomFilter, RoomRegistry};
pub use room::{LeaveOutcome, RoomHandle};
