//! Backup Service - JSON export/import and CSV export of a user's habits

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CreateHabitInput, DomainError, HabitFilter, HabitRepository};
use crate::infrastructure::repositories::habit_repository::{DEFAULT_COLOR, DEFAULT_ICON};
use crate::infrastructure::storage::{KeyValueStore, LAST_SYNC_KEY, PREFERENCES_KEY};
use crate::models::{Frequency, habit, habit_entry};

use super::{habit_service, level_service};

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub date: NaiveDate,
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupHabit {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default = "default_target")]
    pub target_count: i32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub entries: Vec<BackupEntry>,
}

fn default_target() -> i32 {
    1
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: String,
    pub habits: Vec<BackupHabit>,
    #[serde(default)]
    pub preferences: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub habits_created: u32,
    pub entries_imported: u32,
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    habit_id: i32,
    habit_title: &'a str,
    entry_date: NaiveDate,
    completed: bool,
    notes: &'a str,
}

pub async fn export(
    repo: &dyn HabitRepository,
    kv: &dyn KeyValueStore,
    user_id: i32,
) -> Result<BackupDocument, DomainError> {
    let habits = habit_service::list_habits(repo, user_id, HabitFilter::default()).await?;
    let preferences = kv.get(user_id, PREFERENCES_KEY).await?;

    let habits = habits
        .into_iter()
        .map(|h| BackupHabit {
            title: h.habit.title,
            description: h.habit.description,
            frequency: h.habit.frequency,
            target_count: h.habit.target_count,
            color: Some(h.habit.color),
            icon: Some(h.habit.icon),
            is_active: h.habit.is_active,
            entries: h
                .entries
                .into_iter()
                .map(|e| BackupEntry {
                    date: e.entry_date,
                    completed: e.completed,
                    notes: e.notes,
                })
                .collect(),
        })
        .collect();

    Ok(BackupDocument {
        version: BACKUP_VERSION.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        habits,
        preferences,
    })
}

/// One line per entry: `habit_id,habit_title,entry_date,completed,notes`.
pub async fn export_entries_csv(
    repo: &dyn HabitRepository,
    user_id: i32,
) -> Result<String, DomainError> {
    let habits = habit_service::list_habits(repo, user_id, HabitFilter::default()).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for h in &habits {
        for e in &h.entries {
            writer
                .serialize(CsvRow {
                    habit_id: h.habit.id,
                    habit_title: &h.habit.title,
                    entry_date: e.entry_date,
                    completed: e.completed,
                    notes: e.notes.as_deref().unwrap_or(""),
                })
                .map_err(|e| DomainError::Internal(format!("CSV write error: {}", e)))?;
        }
    }

    // Headers are only written with the first row
    if habits.iter().all(|h| h.entries.is_empty()) {
        writer
            .write_record(["habit_id", "habit_title", "entry_date", "completed", "notes"])
            .map_err(|e| DomainError::Internal(format!("CSV write error: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DomainError::Internal(format!("CSV write error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| DomainError::Internal(e.to_string()))
}

pub fn parse_document(raw: Value) -> Result<BackupDocument, DomainError> {
    let doc: BackupDocument = serde_json::from_value(raw)
        .map_err(|e| DomainError::validation(format!("malformed backup: {}", e)))?;

    if doc.version.split('.').next() != Some("1") {
        return Err(DomainError::validation(format!(
            "unsupported backup version {}",
            doc.version
        )));
    }
    for habit in &doc.habits {
        habit_service::validate_create(&CreateHabitInput {
            title: habit.title.clone(),
            description: habit.description.clone(),
            frequency: Some(habit.frequency),
            target_count: Some(habit.target_count),
            color: habit.color.clone(),
            icon: habit.icon.clone(),
        })?;
    }
    Ok(doc)
}

/// Restore a backup into the user's account. Habits are always created
/// anew; imported entries never award points.
pub async fn import(
    db: &DatabaseConnection,
    kv: &dyn KeyValueStore,
    user_id: i32,
    raw: Value,
) -> Result<ImportSummary, DomainError> {
    let doc = parse_document(raw)?;
    let now = Utc::now();
    let now_str = now.to_rfc3339();
    let mut summary = ImportSummary {
        habits_created: 0,
        entries_imported: 0,
    };

    let txn = db.begin().await?;

    for backup in &doc.habits {
        let created = habit::ActiveModel {
            user_id: Set(user_id),
            title: Set(backup.title.trim().to_string()),
            description: Set(backup.description.clone()),
            frequency: Set(backup.frequency),
            target_count: Set(backup.target_count),
            color: Set(backup
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR.to_string())),
            icon: Set(backup.icon.clone().unwrap_or_else(|| DEFAULT_ICON.to_string())),
            is_active: Set(backup.is_active),
            created_at: Set(now_str.clone()),
            updated_at: Set(now_str.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        summary.habits_created += 1;

        for entry in &backup.entries {
            let row = habit_entry::ActiveModel {
                habit_id: Set(created.id),
                entry_date: Set(entry.date),
                completed: Set(entry.completed),
                notes: Set(entry.notes.clone()),
                // Marked as rewarded so re-toggling history mints nothing
                points_awarded: Set(entry.completed),
                created_at: Set(now_str.clone()),
                updated_at: Set(now_str.clone()),
                ..Default::default()
            };
            habit_entry::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        habit_entry::Column::HabitId,
                        habit_entry::Column::EntryDate,
                    ])
                    .update_columns([
                        habit_entry::Column::Completed,
                        habit_entry::Column::Notes,
                        habit_entry::Column::UpdatedAt,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
            summary.entries_imported += 1;
        }
    }

    level_service::refresh_streaks(&txn, user_id, now.date_naive()).await?;
    txn.commit().await?;

    if let Some(preferences) = doc.preferences {
        kv.set(user_id, PREFERENCES_KEY, preferences).await?;
    }
    kv.set(user_id, LAST_SYNC_KEY, Value::String(now_str)).await?;

    tracing::info!(
        "User {} imported {} habits and {} entries",
        user_id,
        summary.habits_created,
        summary.entries_imported
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_document() {
        let doc = parse_document(json!({
            "version": "1.0",
            "timestamp": "2024-01-01T00:00:00Z",
            "habits": [
                {"title": "Read", "entries": [{"date": "2024-01-01", "completed": true}]}
            ]
        }))
        .unwrap();

        assert_eq!(doc.habits.len(), 1);
        assert_eq!(doc.habits[0].target_count, 1);
        assert!(doc.habits[0].is_active);
        assert_eq!(doc.habits[0].entries[0].notes, None);
    }

    #[test]
    fn rejects_malformed_document() {
        let err = parse_document(json!({"habits": "nope"})).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_version() {
        let err = parse_document(json!({
            "version": "2.0",
            "timestamp": "2024-01-01T00:00:00Z",
            "habits": []
        }))
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rejects_invalid_habit() {
        let err = parse_document(json!({
            "version": "1.0",
            "timestamp": "2024-01-01T00:00:00Z",
            "habits": [{"title": ""}]
        }))
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
