//! Room actor: one Tokio task per room owning its peers, admission state
//! and metadata.
//!
//! Control-plane calls and connection events reach a room from different
//! tasks. They all become [`RoomCommand`]s on the room's channel and are
//! applied one at a time by the actor, so no room state is ever shared or
//! locked.

use std::sync::{Arc, Weak};

use roomcast_protocol::{ConnectionId, JsonCodec, PeerEnvelope, PeerEvent, PublicRoom, RoomKey, RoomUid};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use crate::admission::{self, Admission};
use crate::broadcast::deliver;
use crate::registry::RegistryInner;
use crate::{AdmissionState, BroadcastChannel, MergeMode, Metadata, PeerSender, Population, RoomError};

/// What happened to the room after a peer left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Peers remain; the room lives on.
    Remaining(usize),
    /// That was the last peer. The room has been removed from the
    /// registry and its actor has stopped.
    TornDown,
}

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` expect a reply; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        peer: ConnectionId,
        sender: PeerSender,
        reply: oneshot::Sender<Result<PublicRoom, RoomError>>,
    },
    Leave {
        peer: ConnectionId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },
    Message {
        sender: ConnectionId,
        payload: Vec<u8>,
    },
    SetOpen {
        open: bool,
        reply: oneshot::Sender<PublicRoom>,
    },
    UpdateMetadata {
        patch: Map<String, Value>,
        mode: MergeMode,
        reply: oneshot::Sender<PublicRoom>,
    },
    GetMetadata {
        reply: oneshot::Sender<Map<String, Value>>,
    },
    Snapshot {
        reply: oneshot::Sender<PublicRoom>,
    },
    /// Disconnect everyone and stop. Sent by the registry on removal.
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone: an `mpsc::Sender` plus the room's immutable identity.
/// The registry holds one per live room and hands out clones.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    uid: RoomUid,
    key: Arc<RoomKey>,
    seq: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn uid(&self) -> RoomUid {
        self.uid
    }

    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    /// Creation order within the registry.
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// Asks the room to admit `peer`.
    ///
    /// `sender` is the peer's outbound queue. On success the room keeps it
    /// and has already queued the `connected` envelope. On rejection the
    /// room queues the rejection envelope and drops the sender, which ends
    /// the peer's writer once the frame is flushed.
    pub async fn join(
        &self,
        peer: ConnectionId,
        sender: PeerSender,
    ) -> Result<PublicRoom, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::Join {
            peer,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.uid))?
    }

    /// Removes `peer` from the room.
    pub async fn leave(
        &self,
        peer: ConnectionId,
    ) -> Result<LeaveOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::Leave {
            peer,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.uid))?
    }

    /// Relays a raw peer frame (fire-and-forget).
    pub async fn send_message(
        &self,
        sender: ConnectionId,
        payload: Vec<u8>,
    ) -> Result<(), RoomError> {
        self.request(RoomCommand::Message { sender, payload }).await
    }

    /// Administrative open/close toggle.
    pub async fn set_open(&self, open: bool) -> Result<PublicRoom, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::SetOpen {
            open,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.uid))
    }

    /// Merges or replaces metadata and returns the updated room.
    pub async fn update_metadata(
        &self,
        patch: Map<String, Value>,
        mode: MergeMode,
    ) -> Result<PublicRoom, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::UpdateMetadata {
            patch,
            mode,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.uid))
    }

    pub async fn metadata(&self) -> Result<Map<String, Value>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::GetMetadata { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.uid))
    }

    /// Returns the room's current public view.
    pub async fn snapshot(&self) -> Result<PublicRoom, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(RoomCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable(self.uid))
    }

    /// Tells the room to disconnect everyone and stop.
    pub(crate) async fn shutdown(&self) -> Result<(), RoomError> {
        self.request(RoomCommand::Shutdown).await
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.uid))
    }
}

/// Everything needed to start a room.
pub(crate) struct RoomInit {
    pub(crate) uid: RoomUid,
    pub(crate) key: RoomKey,
    pub(crate) seq: u64,
    pub(crate) limit: usize,
    pub(crate) metadata: Map<String, Value>,
    pub(crate) channel_size: usize,
}

/// The internal room state. Lives inside the actor task.
struct RoomActor {
    uid: RoomUid,
    key: Arc<RoomKey>,
    limit: usize,
    admission: AdmissionState,
    population: Population,
    metadata: Metadata,
    channel: BroadcastChannel,
    codec: JsonCodec,
    registry: Weak<RegistryInner>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Processes commands until the room is torn down, shut down, or
    /// every handle is dropped.
    async fn run(mut self) {
        tracing::debug!(room_uid = %self.uid, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    peer,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(peer, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { peer, reply } => {
                    let result = self.handle_leave(peer);
                    let _ = reply.send(result);
                    if self.population.is_torn_down() {
                        break;
                    }
                }
                RoomCommand::Message { sender, payload } => {
                    self.handle_message(sender, &payload);
                }
                RoomCommand::SetOpen { open, reply } => {
                    self.admission = self.admission.set_open(open);
                    tracing::info!(
                        room_uid = %self.uid,
                        admission = %self.admission,
                        "admission toggled"
                    );
                    let _ = reply.send(self.public_room());
                }
                RoomCommand::UpdateMetadata { patch, mode, reply } => {
                    self.metadata.apply(patch, mode);
                    tracing::debug!(room_uid = %self.uid, ?mode, "metadata updated");
                    let _ = reply.send(self.public_room());
                }
                RoomCommand::GetMetadata { reply } => {
                    let _ = reply.send(self.metadata.as_map().clone());
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.public_room());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(
                        room_uid = %self.uid,
                        peers = self.channel.len(),
                        "room shut down"
                    );
                    self.channel.close_all();
                    self.population = Population::TornDown;
                    break;
                }
            }
        }

        tracing::debug!(room_uid = %self.uid, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        peer: ConnectionId,
        sender: PeerSender,
    ) -> Result<PublicRoom, RoomError> {
        if self.channel.contains(peer) {
            return Err(RoomError::AlreadyInRoom(peer, self.uid));
        }

        match admission::check(
            self.admission.is_open(),
            self.channel.len(),
            self.limit,
        ) {
            Admission::Admit => {}
            Admission::Full => {
                let room = self.public_room();
                self.reject(peer, &sender, PeerEvent::RoomFull { room });
                return Err(RoomError::RoomFull(self.uid));
            }
            Admission::Closed => {
                let room = self.public_room();
                self.reject(peer, &sender, PeerEvent::RoomClosed { room });
                return Err(RoomError::RoomClosed(self.uid));
            }
        }

        self.channel.add(peer, sender);
        self.population = self.population.joined();

        if admission::is_full(self.channel.len(), self.limit) {
            self.admission = self.admission.close_at_capacity();
            tracing::info!(room_uid = %self.uid, limit = self.limit, "room full, closed");
        }

        tracing::info!(
            room_uid = %self.uid,
            %peer,
            peers = self.channel.len(),
            "peer joined"
        );

        let room = self.public_room();
        if let Err(e) = self
            .channel
            .send_to(peer, &PeerEnvelope::connected(room.clone(), peer))
        {
            tracing::warn!(room_uid = %self.uid, error = %e, "connected not sent");
        }
        if let Err(e) = self.channel.broadcast(
            peer,
            &PeerEnvelope::event(PeerEvent::PlayerJoin { uid: peer }),
        ) {
            tracing::warn!(room_uid = %self.uid, error = %e, "player_join not sent");
        }

        Ok(room)
    }

    fn handle_leave(
        &mut self,
        peer: ConnectionId,
    ) -> Result<LeaveOutcome, RoomError> {
        if !self.channel.remove(peer) {
            return Err(RoomError::NotInRoom(peer, self.uid));
        }

        let remaining = self.channel.len();
        if self.limit > 0 && remaining < self.limit {
            let before = self.admission;
            self.admission = self.admission.reopen_below_capacity();
            if before != self.admission {
                tracing::info!(room_uid = %self.uid, "room below limit, reopened");
            }
        }

        tracing::info!(room_uid = %self.uid, %peer, peers = remaining, "peer left");

        if let Err(e) = self.channel.broadcast(
            peer,
            &PeerEnvelope::event(PeerEvent::PlayerLeave { uid: peer }),
        ) {
            tracing::warn!(room_uid = %self.uid, error = %e, "player_leave not sent");
        }

        self.population = self.population.left(remaining);
        if self.population.is_torn_down() {
            self.tear_down();
            return Ok(LeaveOutcome::TornDown);
        }
        Ok(LeaveOutcome::Remaining(remaining))
    }

    fn handle_message(&mut self, sender: ConnectionId, payload: &[u8]) {
        if !self.channel.contains(sender) {
            tracing::warn!(
                room_uid = %self.uid,
                %sender,
                "message from non-member, ignoring"
            );
            return;
        }

        let msg = match self.codec.parse_frame(payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(room_uid = %self.uid, %sender, error = %e, "dropping frame");
                return;
            }
        };

        let relay = PeerEnvelope::event(PeerEvent::Broadcast(msg.clone()));
        let cnt = match self.channel.broadcast(sender, &relay) {
            Ok(cnt) => cnt,
            Err(e) => {
                tracing::warn!(room_uid = %self.uid, error = %e, "relay encode failed");
                return;
            }
        };

        tracing::debug!(room_uid = %self.uid, %sender, cnt, "message relayed");

        let ack = PeerEnvelope::event(PeerEvent::MsgSent { msg, cnt });
        if let Err(e) = self.channel.send_to(sender, &ack) {
            tracing::warn!(room_uid = %self.uid, error = %e, "ack encode failed");
        }
    }

    /// Queues a rejection to a peer that was never added.
    fn reject(&self, peer: ConnectionId, sender: &PeerSender, event: PeerEvent) {
        let envelope = PeerEnvelope::rejected(event);
        tracing::info!(room_uid = %self.uid, %peer, code = envelope.code(), "join rejected");
        match self.channel.encode(&envelope) {
            Ok(frame) => {
                deliver(peer, sender, &frame);
            }
            Err(e) => {
                tracing::warn!(room_uid = %self.uid, error = %e, "rejection encode failed");
            }
        }
    }

    /// Removes this room from the registry. After this returns, lookups
    /// no longer find the room.
    fn tear_down(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.uid);
        }
        tracing::info!(room_uid = %self.uid, key = %self.key, "room torn down");
    }

    /// The listing view. `open` reports whether a join would be admitted,
    /// so a full room reads as closed even after an operator reopens it.
    fn public_room(&self) -> PublicRoom {
        let open = admission::is_admissible(
            self.admission.is_open(),
            self.channel.len(),
            self.limit,
        );
        PublicRoom {
            uid: self.uid,
            game: self.key.game.clone(),
            version: self.key.version.clone(),
            name: self.key.name.clone(),
            open,
            limit: self.limit,
            data: self.metadata.as_map().clone(),
            clients: self.channel.clients(),
            clients_count: self.channel.len(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    init: RoomInit,
    registry: Weak<RegistryInner>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(init.channel_size);
    let key = Arc::new(init.key);

    let actor = RoomActor {
        uid: init.uid,
        key: Arc::clone(&key),
        limit: init.limit,
        admission: AdmissionState::Open,
        population: Population::Empty,
        metadata: Metadata::new(init.metadata),
        channel: BroadcastChannel::new(),
        codec: JsonCodec,
        registry,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        uid: init.uid,
        key,
        seq: init.seq,
        sender: tx,
    }
}
