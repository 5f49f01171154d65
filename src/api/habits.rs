//! Habit API handlers using repository pattern

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::domain::{CreateHabitInput, HabitFilter, UpdateHabitInput};
use crate::infrastructure::AppState;
use crate::services::habit_service::{self, ToggleRequest};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn list_habits(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<HabitFilter>,
) -> impl IntoResponse {
    match habit_service::list_habits(state.habit_repo.as_ref(), auth.user_id, filter).await {
        Ok(habits) => Json(json!({
            "total": habits.len(),
            "habits": habits,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_habit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match habit_service::get_habit(state.habit_repo.as_ref(), auth.user_id, id).await {
        Ok(habit) => Json(json!({ "habit": habit })).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/habits",
    responses(
        (status = 201, description = "Habit created"),
        (status = 400, description = "Invalid title, description or target count")
    )
)]
pub async fn create_habit(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateHabitInput>,
) -> impl IntoResponse {
    match habit_service::create_habit(
        state.db(),
        state.habit_repo.as_ref(),
        auth.user_id,
        payload,
        today(),
    )
    .await
    {
        Ok(created) => {
            state.cache.invalidate_user(auth.user_id);
            (
                StatusCode::CREATED,
                Json(json!({
                    "habit": created.habit,
                    "unlocked_achievements": created.unlocked_achievements,
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn update_habit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateHabitInput>,
) -> impl IntoResponse {
    match habit_service::update_habit(state.habit_repo.as_ref(), auth.user_id, id, payload).await {
        Ok(habit) => {
            state.cache.invalidate_user(auth.user_id);
            Json(json!({ "habit": habit })).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn delete_habit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match habit_service::delete_habit(
        state.db(),
        state.habit_repo.as_ref(),
        auth.user_id,
        id,
        today(),
    )
    .await
    {
        Ok(()) => {
            state.cache.invalidate_user(auth.user_id);
            Json(json!({ "message": "Habit deleted successfully" })).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub completed: bool,
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/habits/{id}/toggle",
    params(("id" = i32, Path, description = "Habit id")),
    responses(
        (status = 200, description = "Entry written, points and streak updated"),
        (status = 404, description = "Habit not found")
    )
)]
pub async fn toggle_habit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ToggleBody>,
) -> impl IntoResponse {
    let today = today();
    let request = ToggleRequest {
        habit_id: id,
        date: payload.date.unwrap_or(today),
        completed: payload.completed,
        notes: payload.notes,
    };

    match habit_service::toggle_entry(state.db(), auth.user_id, request, today).await {
        Ok(outcome) => {
            state.cache.invalidate_user(auth.user_id);
            Json(outcome).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn get_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match habit_service::habit_stats(state.habit_repo.as_ref(), auth.user_id, id, today()).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_summary(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match habit_service::summary(
        state.habit_repo.as_ref(),
        &state.cache,
        auth.user_id,
        today(),
    )
    .await
    {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_today(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let today = today();
    match habit_service::today(state.habit_repo.as_ref(), auth.user_id, today).await {
        Ok(habits) => Json(json!({
            "date": today,
            "habits": habits,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}
