//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::HabitRepository;
use crate::infrastructure::SeaOrmHabitRepository;
use crate::infrastructure::cache::ResponseCache;
use crate::infrastructure::config::Config;
use crate::infrastructure::storage::{KeyValueStore, SeaOrmKeyValueStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Habit repository
    pub habit_repo: Arc<dyn HabitRepository>,
    /// Per-user JSON documents (preferences, sync markers)
    pub kv_store: Arc<dyn KeyValueStore>,
    /// Cached summaries and leaderboards
    pub cache: Arc<ResponseCache>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let habit_repo = Arc::new(SeaOrmHabitRepository::new(db.clone()));
        let kv_store = Arc::new(SeaOrmKeyValueStore::new(db.clone()));
        let cache = Arc::new(ResponseCache::new(
            config.cache_ttl,
            config.cache_max_entries,
        ));

        Self {
            db,
            habit_repo,
            kv_store,
            cache,
            config: Arc::new(config),
        }
    }

    /// Replace the key-value backend
    pub fn with_kv_store(mut self, kv_store: Arc<dyn KeyValueStore>) -> Self {
        self.kv_store = kv_store;
        self
    }

    /// Get the database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl AsRef<DatabaseConnection> for AppState {
    fn as_ref(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
