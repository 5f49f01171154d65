use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::infrastructure::AppState;
use crate::services::backup_service;

fn attachment_headers(content_type: &'static str, filename: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers
}

pub async fn export_data(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match backup_service::export(
        state.habit_repo.as_ref(),
        state.kv_store.as_ref(),
        auth.user_id,
    )
    .await
    {
        Ok(backup) => {
            let filename = format!(
                "habit_tracker_backup_{}.json",
                chrono::Utc::now().format("%Y-%m-%d")
            );
            (
                StatusCode::OK,
                attachment_headers("application/json", &filename),
                Json(backup),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn export_entries_csv(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match backup_service::export_entries_csv(state.habit_repo.as_ref(), auth.user_id).await {
        Ok(csv) => (
            StatusCode::OK,
            attachment_headers("text/csv; charset=utf-8", "habit_entries.csv"),
            csv,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn import_data(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(document): Json<Value>,
) -> impl IntoResponse {
    match backup_service::import(state.db(), state.kv_store.as_ref(), auth.user_id, document).await
    {
        Ok(summary) => {
            state.cache.invalidate_user(auth.user_id);
            Json(json!({
                "message": "Backup imported",
                "summary": summary,
            }))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}
