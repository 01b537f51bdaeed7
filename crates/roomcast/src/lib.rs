//! # roomcast
//!
//! Many independent real-time rooms behind one listener.
//!
//! Rooms are created and managed over an HTTP control plane under
//! `/api/...`. Peers join a room by opening a WebSocket to `/<uid>`; every
//! JSON frame a peer sends is relayed to everyone else in that room.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomcast::prelude::*;
//!
//! # async fn example() -> Result<(), RoomcastError> {
//! let server = RoomcastServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .room_config(RoomConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod api;
mod config;
mod control;
mod error;
mod handler;
mod router;
mod server;

pub use config::ServerConfig;
pub use error::{ControlError, RoomcastError};
pub use router::UpgradeRouter;
pub use server::{RoomcastServer, RoomcastServerBuilder, app};

/// Re-exports for embedding the server.
pub mod prelude {
    pub use crate::{RoomcastError, RoomcastServer, RoomcastServerBuilder, ServerConfig};
    pub use roomcast_protocol::{PeerEnvelope, PeerEvent, PublicRoom, RoomKey, RoomUid};
    pub use roomcast_room::{MergeMode, RoomConfig, RoomFilter, RoomHandle, RoomRegistry};
}
