//! Fan-out of encoded frames to a room's peers.

use roomcast_protocol::{ClientRef, Codec, ConnectionId, JsonCodec, PeerEnvelope, ProtocolError};
use tokio::sync::mpsc::error::TrySendError;

use crate::{ConnectionSet, Frame, PeerSender};

/// Owns a room's [`ConnectionSet`] and delivers envelopes to it.
///
/// Every envelope is encoded exactly once and the resulting [`Frame`] is
/// queued to each recipient with `try_send`. Delivery never waits: a peer
/// whose queue is full or whose writer has gone away simply misses that
/// frame and is not counted.
#[derive(Debug, Default)]
pub struct BroadcastChannel {
    connections: ConnectionSet,
    codec: JsonCodec,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer; `false` if it was already present.
    pub fn add(&mut self, peer: ConnectionId, sender: PeerSender) -> bool {
        self.connections.insert(peer, sender)
    }

    /// Removes a peer; `false` if it wasn't present.
    pub fn remove(&mut self, peer: ConnectionId) -> bool {
        self.connections.remove(peer).is_some()
    }

    pub fn contains(&self, peer: ConnectionId) -> bool {
        self.connections.contains(peer)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn clients(&self) -> Vec<ClientRef> {
        self.connections.clients()
    }

    /// Delivers `envelope` to every peer except `sender` and returns how
    /// many peers accepted it.
    ///
    /// `sender` does not have to be a member; after a leave the departed
    /// peer's id is passed so everyone remaining is addressed.
    pub fn broadcast(
        &self,
        sender: ConnectionId,
        envelope: &PeerEnvelope,
    ) -> Result<usize, ProtocolError> {
        let frame = self.encode(envelope)?;
        let delivered = self
            .connections
            .iter()
            .filter(|(id, _)| *id != sender)
            .filter(|(id, tx)| deliver(*id, tx, &frame))
            .count();
        Ok(delivered)
    }

    /// Delivers `envelope` to a single member. Returns `false` if the peer
    /// is unknown or did not accept the frame.
    pub fn send_to(
        &self,
        peer: ConnectionId,
        envelope: &PeerEnvelope,
    ) -> Result<bool, ProtocolError> {
        let Some(tx) = self.connections.get(peer) else {
            return Ok(false);
        };
        let frame = self.encode(envelope)?;
        Ok(deliver(peer, tx, &frame))
    }

    /// Encodes an envelope into a shareable frame.
    pub fn encode(&self, envelope: &PeerEnvelope) -> Result<Frame, ProtocolError> {
        self.codec.encode(envelope).map(Frame::from)
    }

    /// Disconnects everyone by dropping their senders.
    pub fn close_all(&mut self) {
        self.connections.clear();
    }
}

/// Queues one frame to one peer without waiting.
pub(crate) fn deliver(peer: ConnectionId, tx: &PeerSender, frame: &Frame) -> bool {
    match tx.try_send(Frame::clone(frame)) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!(%peer, "peer queue full, frame dropped");
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(%peer, "peer writer gone, frame dropped");
            false
        }
    }
}
