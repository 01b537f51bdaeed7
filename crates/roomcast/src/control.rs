//! Control-plane HTTP handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use roomcast_protocol::{RoomUid, Status};
use roomcast_room::{MergeMode, RoomFilter, RoomHandle};

use crate::api::{
    CloseRequest, CreateRoomRequest, MetadataResponse, RoomListResponse, RoomResponse,
    UpdateDataRequest,
};
use crate::server::AppState;
use crate::ControlError;

/// `POST /api/room`
pub(crate) async fn create_room(
    State(state): State<AppState>,
    body: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<Json<RoomResponse>, ControlError> {
    let Json(request) = body?;
    let key = request.key()?;
    let metadata = request.metadata()?;

    let room = state.registry.create(key, request.limit(), metadata)?;
    let view = room.snapshot().await?;
    Ok(Json(RoomResponse::success(view)))
}

/// `GET /api/room?field=value&...`
pub(crate) async fn list_rooms(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<RoomListResponse> {
    let filter: RoomFilter = params.into_iter().collect();
    tracing::debug!(?filter, "listing rooms");
    let servers = state.registry.find_all(|room| filter.matches(room)).await;
    Json(RoomListResponse {
        status: Status::Success,
        servers,
    })
}

/// `GET /api/room/data/:uid`
pub(crate) async fn get_data(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<MetadataResponse>, ControlError> {
    let room = lookup(&state, &uid)?;
    let data = room.metadata().await?;
    Ok(Json(MetadataResponse {
        status: Status::Success,
        data,
    }))
}

/// `POST /api/room/data/:uid`
pub(crate) async fn update_data(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    body: Result<Json<UpdateDataRequest>, JsonRejection>,
) -> Result<Json<RoomResponse>, ControlError> {
    let room = lookup(&state, &uid)?;
    let Json(request) = body?;
    let patch = request.patch()?;

    let view = room
        .update_metadata(patch, MergeMode::from_flag(request.merge()))
        .await?;
    Ok(Json(RoomResponse::success(view)))
}

/// `POST /api/room/close/:uid`
pub(crate) async fn close_room(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    body: Result<Json<CloseRequest>, JsonRejection>,
) -> Result<Json<RoomResponse>, ControlError> {
    let room = lookup(&state, &uid)?;
    // No usable body means "open".
    let close = body.map(|Json(request)| request.close()).unwrap_or(false);

    let view = room.set_open(!close).await?;
    Ok(Json(RoomResponse::success(view)))
}

/// `GET /api/health`
pub(crate) async fn health() -> &'static str {
    "OK"
}

fn lookup(state: &AppState, uid: &str) -> Result<RoomHandle, ControlError> {
    uid.parse::<RoomUid>()
        .ok()
        .and_then(|uid| state.registry.find_by_uid(uid))
        .ok_or_else(|| ControlError::NotFound(uid.to_owned()))
}
