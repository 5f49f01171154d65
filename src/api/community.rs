//! Events, chat rooms and messages

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::infrastructure::AppState;
use crate::services::community_service::{
    self, CreateEventInput, CreateRoomInput, SendMessageInput,
};
use crate::services::read_with_retry;

pub async fn list_events(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| community_service::list_events(state.db(), auth.user_id)).await {
        Ok(events) => Json(json!({ "events": events })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateEventInput>,
) -> impl IntoResponse {
    match community_service::create_event(state.db(), auth.user_id, payload).await {
        Ok(event) => (StatusCode::CREATED, Json(json!({ "event": event }))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn join_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match community_service::join_event(state.db(), auth.user_id, id).await {
        Ok(participant) => {
            state.cache.invalidate_user(auth.user_id);
            Json(json!({
                "message": "Joined event",
                "participant": participant,
            }))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn leave_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match community_service::leave_event(state.db(), auth.user_id, id).await {
        Ok(()) => Json(json!({ "message": "Left event" })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_rooms(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| community_service::list_rooms(state.db(), auth.user_id)).await {
        Ok(rooms) => Json(json!({ "rooms": rooms })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateRoomInput>,
) -> impl IntoResponse {
    match community_service::create_room(state.db(), auth.user_id, payload).await {
        Ok(room) => (StatusCode::CREATED, Json(json!({ "room": room }))).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn join_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match community_service::join_room(state.db(), auth.user_id, id).await {
        Ok(()) => Json(json!({ "message": "Joined room" })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<u64>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<MessagesQuery>,
) -> impl IntoResponse {
    match read_with_retry(|| {
        community_service::list_messages(state.db(), auth.user_id, id, query.limit)
    })
    .await
    {
        Ok(messages) => Json(json!({ "messages": messages })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<SendMessageInput>,
) -> impl IntoResponse {
    match community_service::send_message(state.db(), auth.user_id, id, payload).await {
        Ok(message) => (StatusCode::CREATED, Json(json!({ "message": message }))).into_response(),
        Err(e) => error_response(e),
    }
}
