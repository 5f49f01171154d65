// Server module - Builds the HTTP application and runs it

use axum::Router;
use axum::http::HeaderValue;
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::api_docs::ApiDoc;
use crate::infrastructure::AppState;
use crate::infrastructure::config::Config;

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let mut allowed = Vec::with_capacity(origins.len());
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(v) => allowed.push(v),
            Err(e) => tracing::error!("Failed to parse CORS origin '{}': {}", origin, e),
        }
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application: API under `/api`, Swagger UI, CORS and
/// request tracing.
pub fn build_router(db: DatabaseConnection, config: Config) -> Router {
    let cors = cors_layer(&config.cors_allowed_origins);
    let state = AppState::new(db, config);

    Router::new()
        .merge(SwaggerUi::new("/api/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api::api_router_with_state(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(db: DatabaseConnection, config: Config) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = build_router(db, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Habit tracker listening on {}", addr);

    axum::serve(listener, app).await
}
