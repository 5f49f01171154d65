//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use sea_orm::DatabaseTransaction;
use serde::{Deserialize, Serialize};

use super::DomainError;
use crate::models::Frequency;
use crate::models::{habit, habit_entry};

/// Which habits a listing includes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitStatus {
    #[default]
    All,
    Active,
    Archived,
}

/// Filter criteria for habit queries
#[derive(Debug, Default, Clone, Deserialize)]
pub struct HabitFilter {
    #[serde(default)]
    pub status: HabitStatus,
    /// Case-insensitive match on title or description
    pub query: Option<String>,
}

/// A habit together with all of its entries, oldest entry first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitWithEntries {
    #[serde(flatten)]
    pub habit: habit::Model,
    pub entries: Vec<habit_entry::Model>,
}

/// Input for creating a habit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateHabitInput {
    pub title: String,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub target_count: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Input for updating a habit. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHabitInput {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub target_count: Option<i32>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository trait for Habit entity. Every method is scoped to the
/// owning user; habits of other users behave as if absent.
#[async_trait]
pub trait HabitRepository: Send + Sync {
    /// Find the user's habits matching the filter, newest first
    async fn find_all(
        &self,
        user_id: i32,
        filter: HabitFilter,
    ) -> Result<Vec<HabitWithEntries>, DomainError>;

    /// Find a single habit by ID
    async fn find_by_id(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<Option<HabitWithEntries>, DomainError>;

    /// Create a new habit inside the caller's transaction
    async fn create(
        &self,
        txn: &DatabaseTransaction,
        user_id: i32,
        input: CreateHabitInput,
    ) -> Result<habit::Model, DomainError>;

    /// Update an existing habit
    async fn update(
        &self,
        user_id: i32,
        id: i32,
        input: UpdateHabitInput,
    ) -> Result<habit::Model, DomainError>;

    /// Delete a habit and its entries inside the caller's transaction
    async fn delete(
        &self,
        txn: &DatabaseTransaction,
        user_id: i32,
        id: i32,
    ) -> Result<(), DomainError>;
}
