//! SeaORM implementation of HabitRepository

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{
    CreateHabitInput, DomainError, HabitFilter, HabitRepository, HabitStatus, HabitWithEntries,
    UpdateHabitInput,
};
use crate::models::habit::{ActiveModel, Column, Entity as HabitEntity};
use crate::models::{Frequency, habit, habit_entry};

pub const DEFAULT_COLOR: &str = "#3B82F6";
pub const DEFAULT_ICON: &str = "✅";

/// SeaORM-based implementation of HabitRepository
pub struct SeaOrmHabitRepository {
    db: DatabaseConnection,
}

impl SeaOrmHabitRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn owned<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
        id: i32,
    ) -> Result<habit::Model, DomainError> {
        HabitEntity::find_by_id(id)
            .filter(Column::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or(DomainError::NotFound)
    }

    async fn attach_entries(
        &self,
        habits: Vec<habit::Model>,
    ) -> Result<Vec<HabitWithEntries>, DomainError> {
        if habits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = habits.iter().map(|h| h.id).collect();
        let entries = habit_entry::Entity::find()
            .filter(habit_entry::Column::HabitId.is_in(ids))
            .order_by_asc(habit_entry::Column::EntryDate)
            .all(&self.db)
            .await?;

        let mut by_habit: HashMap<i32, Vec<habit_entry::Model>> = HashMap::new();
        for entry in entries {
            by_habit.entry(entry.habit_id).or_default().push(entry);
        }

        Ok(habits
            .into_iter()
            .map(|habit| HabitWithEntries {
                entries: by_habit.remove(&habit.id).unwrap_or_default(),
                habit,
            })
            .collect())
    }
}

#[async_trait]
impl HabitRepository for SeaOrmHabitRepository {
    async fn find_all(
        &self,
        user_id: i32,
        filter: HabitFilter,
    ) -> Result<Vec<HabitWithEntries>, DomainError> {
        let mut query = HabitEntity::find().filter(Column::UserId.eq(user_id));

        match filter.status {
            HabitStatus::All => {}
            HabitStatus::Active => query = query.filter(Column::IsActive.eq(true)),
            HabitStatus::Archived => query = query.filter(Column::IsActive.eq(false)),
        }

        if let Some(q) = &filter.query
            && !q.trim().is_empty()
        {
            let q = q.trim();
            let cond = Condition::any()
                .add(Column::Title.contains(q))
                .add(Column::Description.contains(q));
            query = query.filter(cond);
        }

        let habits = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?;

        self.attach_entries(habits).await
    }

    async fn find_by_id(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<Option<HabitWithEntries>, DomainError> {
        let habit = HabitEntity::find_by_id(id)
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        match habit {
            Some(habit) => Ok(self.attach_entries(vec![habit]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        txn: &DatabaseTransaction,
        user_id: i32,
        input: CreateHabitInput,
    ) -> Result<habit::Model, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();

        let new_habit = ActiveModel {
            user_id: Set(user_id),
            title: Set(input.title.trim().to_string()),
            description: Set(input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())),
            frequency: Set(input.frequency.unwrap_or(Frequency::Daily)),
            target_count: Set(input.target_count.unwrap_or(1)),
            color: Set(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
            icon: Set(input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(new_habit.insert(txn).await?)
    }

    async fn update(
        &self,
        user_id: i32,
        id: i32,
        input: UpdateHabitInput,
    ) -> Result<habit::Model, DomainError> {
        let existing = Self::owned(&self.db, user_id, id).await?;
        let mut active: ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()));
        }
        if let Some(frequency) = input.frequency {
            active.frequency = Set(frequency);
        }
        if let Some(target_count) = input.target_count {
            active.target_count = Set(target_count);
        }
        if let Some(color) = input.color {
            active.color = Set(color);
        }
        if let Some(icon) = input.icon {
            active.icon = Set(icon);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(active.update(&self.db).await?)
    }

    async fn delete(
        &self,
        txn: &DatabaseTransaction,
        user_id: i32,
        id: i32,
    ) -> Result<(), DomainError> {
        let habit = Self::owned(txn, user_id, id).await?;

        habit_entry::Entity::delete_many()
            .filter(habit_entry::Column::HabitId.eq(habit.id))
            .exec(txn)
            .await?;
        HabitEntity::delete_by_id(habit.id).exec(txn).await?;

        Ok(())
    }
}
