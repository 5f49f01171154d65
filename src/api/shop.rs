use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::infrastructure::AppState;
use crate::services::{read_with_retry, shop_service};

pub async fn list_items(State(state): State<AppState>, _auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| shop_service::list_items(state.db())).await {
        Ok(items) => Json(json!({ "items": items })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn list_purchases(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let now = Utc::now();
    match read_with_retry(|| shop_service::list_purchases(state.db(), auth.user_id, now)).await {
        Ok(purchases) => Json(json!({ "purchases": purchases })).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/shop/items/{id}/purchase",
    params(("id" = i32, Path, description = "Shop item id")),
    responses(
        (status = 200, description = "Purchase recorded"),
        (status = 402, description = "Not enough points"),
        (status = 404, description = "Item not found or unavailable"),
        (status = 409, description = "Permanent item already owned")
    )
)]
pub async fn purchase_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match shop_service::purchase_item(state.db(), auth.user_id, id, Utc::now()).await {
        Ok(receipt) => {
            state.cache.invalidate_user(auth.user_id);
            Json(receipt).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub item_ids: Vec<i32>,
}

pub async fn checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> impl IntoResponse {
    match shop_service::checkout(state.db(), auth.user_id, &payload.item_ids, Utc::now()).await {
        Ok(receipt) => {
            state.cache.invalidate_user(auth.user_id);
            Json(receipt).into_response()
        }
        Err(e) => error_response(e),
    }
}
