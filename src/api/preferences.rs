use axum::{Json, extract::State, response::IntoResponse};
use serde_json::{Value, json};

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::infrastructure::storage::PREFERENCES_KEY;
use crate::services::read_with_retry;

pub async fn get_preferences(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match read_with_retry(|| state.kv_store.get(auth.user_id, PREFERENCES_KEY)).await {
        Ok(preferences) => Json(json!({
            "preferences": preferences.unwrap_or_else(|| json!({}))
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// Replace the stored preferences with the given JSON object.
pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(preferences): Json<Value>,
) -> impl IntoResponse {
    if !preferences.is_object() {
        return error_response(DomainError::validation("preferences must be a JSON object"));
    }

    match state
        .kv_store
        .set(auth.user_id, PREFERENCES_KEY, preferences.clone())
        .await
    {
        Ok(()) => Json(json!({ "preferences": preferences })).into_response(),
        Err(e) => error_response(e),
    }
}
