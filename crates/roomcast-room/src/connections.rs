//! The set of peers connected to one room.

use std::sync::Arc;

use roomcast_protocol::{ClientRef, ConnectionId};
use tokio::sync::mpsc;

/// One pre-encoded text frame. Cloning is a refcount bump, so a frame
/// encoded once can be queued to every peer.
pub type Frame = Arc<str>;

/// Bounded channel feeding a peer's writer task.
pub type PeerSender = mpsc::Sender<Frame>;

#[derive(Debug)]
struct Peer {
    id: ConnectionId,
    sender: PeerSender,
}

/// Active peers of a room, kept in join order.
///
/// Rooms are small, so a vector beats a map here and keeps the `clients`
/// listing stable.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    peers: Vec<Peer>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer. Returns `false` (and keeps the old sender) if the id
    /// is already present.
    pub fn insert(&mut self, id: ConnectionId, sender: PeerSender) -> bool {
        if self.contains(id) {
            return false;
        }
        self.peers.push(Peer { id, sender });
        true
    }

    /// Removes a peer, returning its sender.
    pub fn remove(&mut self, id: ConnectionId) -> Option<PeerSender> {
        let index = self.peers.iter().position(|p| p.id == id)?;
        Some(self.peers.remove(index).sender)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.peers.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&PeerSender> {
        self.peers.iter().find(|p| p.id == id).map(|p| &p.sender)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Iterates `(id, sender)` pairs in join order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, &PeerSender)> {
        self.peers.iter().map(|p| (p.id, &p.sender))
    }

    /// The public listing of connected peers.
    pub fn clients(&self) -> Vec<ClientRef> {
        self.peers.iter().map(|p| ClientRef { uid: p.id }).collect()
    }

    /// Drops every sender, which ends each peer's writer task.
    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
