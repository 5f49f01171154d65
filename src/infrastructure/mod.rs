//! Infrastructure layer
//!
//! Everything that touches sqlite, HTTP or the process environment:
//! schema migrations, the axum server, env configuration, JWT auth,
//! the SeaORM habit repository, the response cache, per-user key-value
//! storage and catalog seeding. `AppState` ties them together.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod repositories;
pub mod seed;
pub mod server;
pub mod state;
pub mod storage;

pub use repositories::*;
pub use state::AppState;
