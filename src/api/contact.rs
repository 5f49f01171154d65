use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::api::error_response;
use crate::auth::AuthUser;
use crate::infrastructure::AppState;
use crate::services::contact_service::{self, ContactForm};

/// Contact form. A bearer token is optional; when present the message is
/// linked to the account.
pub async fn submit_contact(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(form): Json<ContactForm>,
) -> impl IntoResponse {
    let user_id = auth.map(|a| a.user_id);
    match contact_service::submit(state.db(), user_id, form).await {
        Ok(saved) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Thanks, we will get back to you soon",
                "id": saved.id,
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
