//! Maps an inbound upgrade path to a live room.

use axum::extract::{State, WebSocketUpgrade};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use roomcast_protocol::RoomUid;
use roomcast_room::{RoomHandle, RoomRegistry};

use crate::ControlError;
use crate::handler::handle_peer;
use crate::server::AppState;

/// Resolves `/<uid>` paths to rooms.
#[derive(Clone)]
pub struct UpgradeRouter {
    registry: RoomRegistry,
}

impl UpgradeRouter {
    pub fn new(registry: RoomRegistry) -> Self {
        Self { registry }
    }

    /// Returns the room named by the first path segment, if it is a
    /// well-formed uid of a live room.
    pub fn route(&self, path: &str) -> Option<RoomHandle> {
        let segment = path.trim_start_matches('/').split('/').next()?;
        let uid: RoomUid = segment.parse().ok()?;
        self.registry.find_by_uid(uid)
    }
}

/// `GET /:uid`. Unknown rooms are refused before any handshake.
pub(crate) async fn upgrade(
    State(state): State<AppState>,
    uri: Uri,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(room) = state.router.route(uri.path()) else {
        tracing::debug!(path = uri.path(), "upgrade refused, no such room");
        let uid = uri.path().trim_start_matches('/').to_owned();
        return ControlError::NotFound(uid).into_response();
    };
    let Some(ws) = ws else {
        return (StatusCode::BAD_REQUEST, "expected a WebSocket upgrade").into_response();
    };

    let queue = state.registry.config().peer_queue_capacity;
    ws.on_upgrade(move |socket| async move {
        let room_uid = room.uid();
        if let Err(e) = handle_peer(socket, room, queue).await {
            tracing::debug!(%room_uid, error = %e, "peer connection ended with error");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_protocol::RoomKey;
    use serde_json::Map;

    #[tokio::test]
    async fn test_route_resolves_live_rooms() {
        let registry = RoomRegistry::new();
        let room = registry
            .create(RoomKey::new("chess", "1", "a"), 0, Map::new())
            .unwrap();
        let router = UpgradeRouter::new(registry);

        let path = format!("/{}", room.uid());
        assert_eq!(router.route(&path).unwrap().uid(), room.uid());

        let nested = format!("/{}/extra", room.uid());
        assert_eq!(router.route(&nested).unwrap().uid(), room.uid());
    }

    #[tokio::test]
    async fn test_route_rejects_unknown_and_malformed() {
        let router = UpgradeRouter::new(RoomRegistry::new());
        assert!(router.route(&format!("/{}", RoomUid::generate())).is_none());
        assert!(router.route("/not-a-uid").is_none());
        assert!(router.route("/").is_none());
        assert!(router.route("").is_none());
    }
}
