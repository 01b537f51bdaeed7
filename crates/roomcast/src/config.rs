//! Command-line and environment configuration for the `roomcast` binary.

use clap::Parser;
use roomcast_room::RoomConfig;

/// Multiplexed WebSocket rooms with an HTTP control plane.
#[derive(Debug, Clone, Parser)]
#[command(name = "roomcast")]
#[command(version)]
pub struct ServerConfig {
    /// Interface to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for both the control plane and peer upgrades
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Frames buffered per peer before frames to that peer are dropped
    #[arg(long, env = "ROOMCAST_PEER_QUEUE", default_value_t = 256)]
    pub peer_queue: usize,

    /// Log filter, e.g. `info` or `roomcast_room=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log: String,
}

impl ServerConfig {
    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            peer_queue_capacity: self.peer_queue.max(1),
            ..RoomConfig::default()
        }
    }
}
