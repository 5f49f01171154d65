pub mod auth;
pub mod community;
pub mod contact;
pub mod export;
pub mod gamification;
pub mod habits;
pub mod health;
pub mod preferences;
pub mod shop;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::domain::DomainError;
use crate::infrastructure::AppState;

/// Map a domain failure onto an HTTP status and `{"error": ...}` body.
pub fn error_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        DomainError::AlreadyOwned => StatusCode::CONFLICT,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::warn!("Request rejected: {}", err);
    }

    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

pub fn api_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::get_me))
        // Habits
        .route("/habits", get(habits::list_habits).post(habits::create_habit))
        .route("/habits/summary", get(habits::get_summary))
        .route("/habits/today", get(habits::get_today))
        .route(
            "/habits/:id",
            get(habits::get_habit)
                .put(habits::update_habit)
                .delete(habits::delete_habit),
        )
        .route("/habits/:id/toggle", post(habits::toggle_habit))
        .route("/habits/:id/stats", get(habits::get_stats))
        // Levels and achievements
        .route("/user/level", get(gamification::get_level))
        .route("/user/points", post(gamification::add_points))
        .route("/achievements", get(gamification::list_achievements))
        .route("/achievements/mine", get(gamification::my_achievements))
        .route("/achievements/check", post(gamification::check_achievements))
        .route("/leaderboard", get(gamification::get_leaderboard))
        // Shop
        .route("/shop/items", get(shop::list_items))
        .route("/shop/purchases", get(shop::list_purchases))
        .route("/shop/items/:id/purchase", post(shop::purchase_item))
        .route("/shop/checkout", post(shop::checkout))
        // Community
        .route(
            "/events",
            get(community::list_events).post(community::create_event),
        )
        .route("/events/:id/join", post(community::join_event))
        .route("/events/:id/leave", post(community::leave_event))
        .route("/rooms", get(community::list_rooms).post(community::create_room))
        .route("/rooms/:id/join", post(community::join_room))
        .route(
            "/rooms/:id/messages",
            get(community::list_messages).post(community::send_message),
        )
        // Contact
        .route("/contact", post(contact::submit_contact))
        // Preferences
        .route(
            "/preferences",
            get(preferences::get_preferences).put(preferences::update_preferences),
        )
        // Backup
        .route("/export", get(export::export_data))
        .route("/export/entries.csv", get(export::export_entries_csv))
        .route("/import", post(export::import_data))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn status_and_body(err: DomainError) -> (StatusCode, serde_json::Value) {
        let response = error_response(err);
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn maps_every_error_kind() {
        let cases = [
            (DomainError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (DomainError::NotFound, StatusCode::NOT_FOUND),
            (DomainError::InsufficientFunds, StatusCode::PAYMENT_REQUIRED),
            (DomainError::AlreadyOwned, StatusCode::CONFLICT),
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (
                DomainError::TransientStore("gone".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::Internal("broken".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, _) = status_and_body(err).await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn body_carries_message() {
        let (_, body) = status_and_body(DomainError::InsufficientFunds).await;
        assert_eq!(body["error"], "Insufficient points");
    }
}
