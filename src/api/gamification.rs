//! Levels, achievements and the leaderboard

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::infrastructure::AppState;
use crate::infrastructure::cache::CacheKey;
use crate::services::{achievement_service, level_service, read_with_retry};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn get_level(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| level_service::get_level(state.db(), auth.user_id, today())).await {
        Ok(level) => Json(level).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    pub points: i64,
}

pub async fn add_points(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AddPointsRequest>,
) -> impl IntoResponse {
    match level_service::add_points(state.db(), auth.user_id, payload.points, today()).await {
        Ok(level) => {
            state.cache.invalidate_user(auth.user_id);
            Json(level).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn list_achievements(State(state): State<AppState>, _auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| achievement_service::list_catalog(state.db())).await {
        Ok(achievements) => Json(json!({ "achievements": achievements })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn my_achievements(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| achievement_service::list_unlocked(state.db(), auth.user_id)).await {
        Ok(achievements) => Json(json!({ "achievements": achievements })).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn check_achievements(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match achievement_service::check_achievements(state.db(), auth.user_id, today()).await {
        Ok(unlocked) => {
            if !unlocked.is_empty() {
                state.cache.invalidate_user(auth.user_id);
            }
            Json(json!({ "unlocked": unlocked })).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u64>,
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<LeaderboardQuery>,
) -> impl IntoResponse {
    let limit = level_service::clamp_limit(query.limit);
    let key = CacheKey::Leaderboard(limit);

    if let Some(cached) = state.cache.get(&key) {
        return Json(cached).into_response();
    }

    let generation = state.cache.generation();
    match read_with_retry(|| level_service::leaderboard(state.db(), limit, today())).await {
        Ok(entries) => {
            let body = json!({ "leaderboard": entries });
            state.cache.insert_unless_invalidated(key, body.clone(), generation);
            Json(body).into_response()
        }
        Err(e) => error_response(e),
    }
}
