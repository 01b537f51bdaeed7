//! Per-peer handler: admission, outbound writer and inbound frame pump.
//!
//! Each upgraded connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Spawn a writer that drains the peer's bounded frame queue
//!   2. Ask the room to admit the peer (the room queues the outcome)
//!   3. Loop: forward every inbound frame to the room
//!   4. Leave the room when the loop ends, however it ends

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use roomcast_protocol::{Codec, ConnectionId, JsonCodec, PeerEnvelope, PeerEvent};
use roomcast_room::{Frame, PeerSender, RoomHandle};
use roomcast_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RoomcastError;

/// Drop guard that removes the peer from its room when the handler exits.
///
/// Since `Drop` is synchronous, the leave is a fire-and-forget task.
struct PeerGuard {
    peer: ConnectionId,
    room: RoomHandle,
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        let peer = self.peer;
        let room = self.room.clone();
        tokio::spawn(async move {
            if let Err(e) = room.leave(peer).await {
                tracing::debug!(room_uid = %room.uid(), %peer, error = %e, "leave skipped");
            }
        });
    }
}

/// Handles one peer from upgrade to close.
pub(crate) async fn handle_peer(
    socket: WebSocket,
    room: RoomHandle,
    queue_capacity: usize,
) -> Result<(), RoomcastError> {
    let conn = Arc::new(WebSocketConnection::new(socket));
    let peer = conn.id();
    let room_uid = room.uid();

    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let mut writer = tokio::spawn(write_frames(Arc::clone(&conn), rx));

    let admitted = admit(&room, peer, tx).await;
    if !matches!(admitted, Ok(true)) {
        // Every sender is gone, so the writer flushes the notice and closes.
        let _ = writer.await;
        return admitted.map(|_| ());
    }

    let _guard = PeerGuard {
        peer,
        room: room.clone(),
    };

    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(payload)) => {
                    if let Err(e) = room.send_message(peer, payload).await {
                        tracing::debug!(%room_uid, %peer, error = %e, "room stopped");
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!(%room_uid, %peer, "peer closed connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%room_uid, %peer, error = %e, "recv error");
                    break;
                }
            },
            _ = &mut writer => {
                // The room dropped our queue: removed or shut down.
                tracing::debug!(%room_uid, %peer, "writer finished, disconnecting");
                break;
            }
        }
    }

    // _guard drops here and the leave fires.
    Ok(())
}

/// Asks `room` to admit `peer`. On refusal the room has already queued
/// the rejection frame; a room that vanished since routing is reported
/// here as `not_found`. Returns whether the peer is now a member.
async fn admit(
    room: &RoomHandle,
    peer: ConnectionId,
    sender: PeerSender,
) -> Result<bool, RoomcastError> {
    // Kept until admission is decided, so a room that vanished can still
    // be reported.
    let notices = sender.clone();
    match room.join(peer, sender).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_gone() => {
            tracing::info!(room_uid = %room.uid(), %peer, "room vanished before admission");
            send_not_found(peer, &notices)?;
            Ok(false)
        }
        Err(e) => {
            tracing::debug!(room_uid = %room.uid(), %peer, reason = %e, "peer not admitted");
            Ok(false)
        }
    }
}

/// Drains the peer's queue onto the socket, then closes it.
async fn write_frames(conn: Arc<WebSocketConnection>, mut frames: mpsc::Receiver<Frame>) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(peer = %conn.id(), error = %e, "send failed");
            break;
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(peer = %conn.id(), error = %e, "close failed");
    }
}

fn send_not_found(peer: ConnectionId, notices: &PeerSender) -> Result<(), RoomcastError> {
    let envelope = PeerEnvelope::rejected(PeerEvent::NotFound { room: None });
    let text = JsonCodec.encode(&envelope)?;
    if notices.try_send(Frame::from(text)).is_err() {
        tracing::debug!(%peer, "not_found notice dropped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_protocol::RoomKey;
    use roomcast_room::RoomRegistry;
    use serde_json::{Map, Value, json};

    fn parse(frame: &Frame) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn test_admit_joins_open_room() {
        let registry = RoomRegistry::new();
        let room = registry
            .create(RoomKey::new("chess", "1", "a"), 0, Map::new())
            .unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        assert!(admit(&room, ConnectionId::generate(), tx).await.unwrap());
        assert_eq!(parse(&rx.recv().await.unwrap())["code"], "connected");
    }

    #[tokio::test]
    async fn test_admit_refused_when_full() {
        let registry = RoomRegistry::new();
        let room = registry
            .create(RoomKey::new("chess", "1", "solo"), 1, Map::new())
            .unwrap();
        let (first, _first_rx) = mpsc::channel(4);
        assert!(admit(&room, ConnectionId::generate(), first).await.unwrap());

        let (tx, mut rx) = mpsc::channel(4);
        assert!(!admit(&room, ConnectionId::generate(), tx).await.unwrap());
        assert_eq!(parse(&rx.recv().await.unwrap())["code"], "room_full");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_vanished_room_reports_not_found() {
        let registry = RoomRegistry::new();
        let room = registry
            .create(RoomKey::new("chess", "1", "a"), 0, Map::new())
            .unwrap();
        let first = ConnectionId::generate();
        let (tx, _first_rx) = mpsc::channel(4);
        assert!(admit(&room, first, tx).await.unwrap());
        room.leave(first).await.unwrap();

        // The handle was resolved before the last peer left.
        let (tx, mut rx) = mpsc::channel(4);
        assert!(!admit(&room, ConnectionId::generate(), tx).await.unwrap());

        let frame = rx.recv().await.expect("not_found notice");
        assert_eq!(
            parse(&frame),
            json!({"status": "error", "code": "not_found", "data": {"room": null}})
        );
        // No sender is left, so the writer would close the socket next.
        assert!(rx.recv().await.is_none());
    }
}
