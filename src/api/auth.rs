use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use crate::api::error_response;
use crate::auth::{AuthUser, create_jwt, hash_password, verify_password};
use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::models::user;
use crate::services::level_service;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

pub fn validate_username(username: &str) -> Result<(), DomainError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(DomainError::validation("username must be 3 to 32 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

fn issue_token(state: &AppState, user: &user::Model) -> Result<String, DomainError> {
    create_jwt(
        user.id,
        &user.username,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )
    .map_err(DomainError::Internal)
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let username = payload.username.trim().to_string();
    if let Err(e) = validate_username(&username) {
        return error_response(e);
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return error_response(DomainError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if let Some(email) = payload.email.as_deref()
        && !crate::services::contact_service::is_valid_email(email)
    {
        return error_response(DomainError::validation("email is not valid"));
    }

    match user::Entity::find()
        .filter(user::Column::Username.eq(&username))
        .one(state.db())
        .await
    {
        Ok(Some(_)) => {
            tracing::warn!("Registration for taken username: {}", username);
            return error_response(DomainError::validation("username already taken"));
        }
        Ok(None) => {}
        Err(e) => return error_response(e.into()),
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => return error_response(DomainError::Internal(e)),
    };

    let now = chrono::Utc::now().to_rfc3339();
    let new_user = user::ActiveModel {
        username: Set(username),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let user = match new_user.insert(state.db()).await {
        Ok(user) => user,
        Err(e) => return error_response(e.into()),
    };

    if let Err(e) = level_service::get_or_create(state.db(), user.id).await {
        return error_response(e);
    }

    tracing::info!("Registered user {} ({})", user.username, user.id);
    match issue_token(&state, &user) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(json!({ "token": token, "user": user })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    tracing::info!("Login attempt for user: {}", payload.username);

    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        )
            .into_response()
    };

    let user = match user::Entity::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .one(state.db())
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            tracing::warn!("User not found: {}", payload.username);
            return invalid();
        }
        Err(e) => return error_response(e.into()),
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            tracing::info!("Password verified successfully for user: {}", user.username);
            match issue_token(&state, &user) {
                Ok(token) => {
                    (StatusCode::OK, Json(json!({ "token": token, "user": user }))).into_response()
                }
                Err(e) => error_response(e),
            }
        }
        _ => {
            tracing::warn!("Password verification failed for user: {}", user.username);
            invalid()
        }
    }
}

pub async fn get_me(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let user = match user::Entity::find_by_id(auth.user_id).one(state.db()).await {
        Ok(Some(user)) => user,
        // Token for a deleted account
        Ok(None) => return error_response(DomainError::NotAuthenticated),
        Err(e) => return error_response(e.into()),
    };

    let today = chrono::Utc::now().date_naive();
    match level_service::get_level(state.db(), auth.user_id, today).await {
        Ok(level) => Json(json!({ "user": user, "level": level })).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
    }
}
