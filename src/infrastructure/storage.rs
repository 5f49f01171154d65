//! Per-user key-value persistence for small JSON documents
//! (preferences, sync markers).

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use serde_json::Value;

use crate::domain::DomainError;
use crate::models::key_value::{self, Column, Entity as KeyValueEntity};

pub const PREFERENCES_KEY: &str = "preferences";
pub const LAST_SYNC_KEY: &str = "last_sync";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, user_id: i32, key: &str) -> Result<Option<Value>, DomainError>;

    /// Insert or replace the value under `key`.
    async fn set(&self, user_id: i32, key: &str, value: Value) -> Result<(), DomainError>;

    async fn remove(&self, user_id: i32, key: &str) -> Result<(), DomainError>;

    /// All keys of one user, sorted.
    async fn list(&self, user_id: i32) -> Result<BTreeMap<String, Value>, DomainError>;
}

pub struct SeaOrmKeyValueStore {
    db: DatabaseConnection,
}

impl SeaOrmKeyValueStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn decode(row: &key_value::Model) -> Result<Value, DomainError> {
    serde_json::from_str(&row.value).map_err(|e| {
        DomainError::Internal(format!("stored value for '{}' is not JSON: {}", row.storage_key, e))
    })
}

#[async_trait]
impl KeyValueStore for SeaOrmKeyValueStore {
    async fn get(&self, user_id: i32, key: &str) -> Result<Option<Value>, DomainError> {
        let row = KeyValueEntity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::StorageKey.eq(key))
            .one(&self.db)
            .await?;

        row.as_ref().map(decode).transpose()
    }

    async fn set(&self, user_id: i32, key: &str, value: Value) -> Result<(), DomainError> {
        let row = key_value::ActiveModel {
            user_id: Set(user_id),
            storage_key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        KeyValueEntity::insert(row)
            .on_conflict(
                OnConflict::columns([Column::UserId, Column::StorageKey])
                    .update_columns([Column::Value, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: i32, key: &str) -> Result<(), DomainError> {
        KeyValueEntity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::StorageKey.eq(key))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn list(&self, user_id: i32) -> Result<BTreeMap<String, Value>, DomainError> {
        let rows = KeyValueEntity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::StorageKey)
            .all(&self.db)
            .await?;

        rows.iter()
            .map(|row| Ok((row.storage_key.clone(), decode(row)?)))
            .collect()
    }
}

/// Process-local store, used in tests and when no database is wanted.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    values: DashMap<(i32, String), Value>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, user_id: i32, key: &str) -> Result<Option<Value>, DomainError> {
        Ok(self
            .values
            .get(&(user_id, key.to_string()))
            .map(|v| v.value().clone()))
    }

    async fn set(&self, user_id: i32, key: &str, value: Value) -> Result<(), DomainError> {
        self.values.insert((user_id, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, user_id: i32, key: &str) -> Result<(), DomainError> {
        self.values.remove(&(user_id, key.to_string()));
        Ok(())
    }

    async fn list(&self, user_id: i32) -> Result<BTreeMap<String, Value>, DomainError> {
        Ok(self
            .values
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect())
    }
}
