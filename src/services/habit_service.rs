//! Habit Service - habit lifecycle, daily check-off and derived statistics

use chrono::NaiveDate;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde::Serialize;

use crate::domain::{
    CreateHabitInput, DomainError, HabitFilter, HabitRepository, HabitWithEntries,
    UpdateHabitInput,
};
use crate::infrastructure::cache::{CacheKey, ResponseCache};
use crate::models::{achievement, habit, habit_entry};
use crate::progress::{self, EntryRecord, HabitSnapshot, HabitStats, HabitSummary};

use super::{achievement_service, level_service, read_with_retry};

pub const MAX_TITLE_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 200;

fn validate_title(title: &str) -> Result<(), DomainError> {
    let len = title.trim().chars().count();
    if len == 0 {
        return Err(DomainError::validation("title is required"));
    }
    if len > MAX_TITLE_LEN {
        return Err(DomainError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), DomainError> {
    match description {
        Some(d) if d.trim().chars().count() > MAX_DESCRIPTION_LEN => {
            Err(DomainError::validation(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )))
        }
        _ => Ok(()),
    }
}

fn validate_target(target_count: Option<i32>) -> Result<(), DomainError> {
    match target_count {
        Some(n) if n < 1 => Err(DomainError::validation("target_count must be at least 1")),
        _ => Ok(()),
    }
}

pub fn validate_create(input: &CreateHabitInput) -> Result<(), DomainError> {
    validate_title(&input.title)?;
    validate_description(input.description.as_deref())?;
    validate_target(input.target_count)
}

pub fn validate_update(input: &UpdateHabitInput) -> Result<(), DomainError> {
    if let Some(title) = &input.title {
        validate_title(title)?;
    }
    if let Some(description) = &input.description {
        validate_description(description.as_deref())?;
    }
    validate_target(input.target_count)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedHabit {
    pub habit: habit::Model,
    pub unlocked_achievements: Vec<achievement::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleOutcome {
    pub entry: habit_entry::Model,
    /// Points credited by this request, 0 if the day was already rewarded
    pub points_awarded: i64,
    pub current_streak: i32,
    pub unlocked_achievements: Vec<achievement::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayHabit {
    #[serde(flatten)]
    pub habit: habit::Model,
    pub completed_today: bool,
    pub entry: Option<habit_entry::Model>,
}

fn records(entries: &[habit_entry::Model]) -> Vec<EntryRecord> {
    entries.iter().map(EntryRecord::from).collect()
}

pub async fn list_habits(
    repo: &dyn HabitRepository,
    user_id: i32,
    filter: HabitFilter,
) -> Result<Vec<HabitWithEntries>, DomainError> {
    read_with_retry(|| repo.find_all(user_id, filter.clone())).await
}

pub async fn get_habit(
    repo: &dyn HabitRepository,
    user_id: i32,
    id: i32,
) -> Result<HabitWithEntries, DomainError> {
    read_with_retry(|| repo.find_by_id(user_id, id))
        .await?
        .ok_or(DomainError::NotFound)
}

pub async fn create_habit(
    db: &DatabaseConnection,
    repo: &dyn HabitRepository,
    user_id: i32,
    input: CreateHabitInput,
    today: NaiveDate,
) -> Result<CreatedHabit, DomainError> {
    validate_create(&input)?;

    let txn = db.begin().await?;
    let habit = repo.create(&txn, user_id, input).await?;
    level_service::record_habit_created(&txn, user_id).await?;
    let unlocked_achievements =
        achievement_service::check_and_unlock(&txn, user_id, today).await?;
    txn.commit().await?;

    tracing::info!("User {} created habit {} '{}'", user_id, habit.id, habit.title);
    Ok(CreatedHabit {
        habit,
        unlocked_achievements,
    })
}

pub async fn update_habit(
    repo: &dyn HabitRepository,
    user_id: i32,
    id: i32,
    input: UpdateHabitInput,
) -> Result<habit::Model, DomainError> {
    validate_update(&input)?;
    repo.update(user_id, id, input).await
}

pub async fn delete_habit(
    db: &DatabaseConnection,
    repo: &dyn HabitRepository,
    user_id: i32,
    id: i32,
    today: NaiveDate,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    repo.delete(&txn, user_id, id).await?;
    level_service::refresh_streaks(&txn, user_id, today).await?;
    txn.commit().await?;
    tracing::info!("User {} deleted habit {}", user_id, id);
    Ok(())
}

/// Request to mark one habit done (or not) for one date.
#[derive(Debug, Clone)]
pub struct ToggleRequest {
    pub habit_id: i32,
    pub date: NaiveDate,
    pub completed: bool,
    pub notes: Option<String>,
}

/// Write the entry for (habit, date), award points on the first completion
/// of that date, refresh streaks and unlock achievements. All or nothing.
pub async fn toggle_entry(
    db: &DatabaseConnection,
    user_id: i32,
    request: ToggleRequest,
    today: NaiveDate,
) -> Result<ToggleOutcome, DomainError> {
    if request.date > today {
        return Err(DomainError::validation("cannot log a future date"));
    }

    let notes = request
        .notes
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| {
            if request.completed {
                "Completed".to_string()
            } else {
                "Incomplete".to_string()
            }
        });

    let txn = db.begin().await?;

    habit::Entity::find_by_id(request.habit_id)
        .filter(habit::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    let now = chrono::Utc::now().to_rfc3339();
    let existing = find_entry(&txn, request.habit_id, request.date).await?;

    let entry = match existing {
        Some(entry) => {
            let mut active: habit_entry::ActiveModel = entry.into();
            active.completed = Set(request.completed);
            active.notes = Set(Some(notes));
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            let row = habit_entry::ActiveModel {
                habit_id: Set(request.habit_id),
                entry_date: Set(request.date),
                completed: Set(request.completed),
                notes: Set(Some(notes)),
                points_awarded: Set(false),
                created_at: Set(now.clone()),
                updated_at: Set(now),
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

            find_entry(&txn, request.habit_id, request.date)
                .await?
                .ok_or_else(|| DomainError::Internal("entry missing after upsert".into()))?
        }
    };

    let mut points_awarded = 0;
    let entry = if entry.completed && !entry.points_awarded {
        let mut active: habit_entry::ActiveModel = entry.into();
        active.points_awarded = Set(true);
        let entry = active.update(&txn).await?;

        level_service::record_completion(&txn, user_id).await?;
        points_awarded = progress::POINTS_PER_COMPLETION;
        entry
    } else {
        entry
    };

    let level = level_service::refresh_streaks(&txn, user_id, today).await?;
    let unlocked_achievements = achievement_service::check_and_unlock(&txn, user_id, today).await?;

    txn.commit().await?;

    tracing::debug!(
        "Habit {} on {} set to {} (+{} points)",
        request.habit_id,
        request.date,
        entry.completed,
        points_awarded
    );

    Ok(ToggleOutcome {
        entry,
        points_awarded,
        current_streak: level.current_streak,
        unlocked_achievements,
    })
}

async fn find_entry<C: ConnectionTrait>(
    conn: &C,
    habit_id: i32,
    date: NaiveDate,
) -> Result<Option<habit_entry::Model>, DomainError> {
    Ok(habit_entry::Entity::find()
        .filter(habit_entry::Column::HabitId.eq(habit_id))
        .filter(habit_entry::Column::EntryDate.eq(date))
        .one(conn)
        .await?)
}

pub async fn habit_stats(
    repo: &dyn HabitRepository,
    user_id: i32,
    id: i32,
    today: NaiveDate,
) -> Result<HabitStats, DomainError> {
    let habit = get_habit(repo, user_id, id).await?;
    Ok(progress::habit_stats(&records(&habit.entries), today))
}

/// Summary across all of the user's habits, served from the cache when
/// fresh.
pub async fn summary(
    repo: &dyn HabitRepository,
    cache: &ResponseCache,
    user_id: i32,
    today: NaiveDate,
) -> Result<HabitSummary, DomainError> {
    let key = CacheKey::HabitsSummary(user_id);
    if let Some(hit) = cache.get(&key)
        && let Ok(summary) = serde_json::from_value::<HabitSummary>(hit)
    {
        return Ok(summary);
    }

    let generation = cache.generation();
    let habits = list_habits(repo, user_id, HabitFilter::default()).await?;
    let snapshots: Vec<HabitSnapshot> = habits
        .iter()
        .map(|h| HabitSnapshot {
            is_active: h.habit.is_active,
            entries: records(&h.entries),
        })
        .collect();

    let summary = progress::summarize(&snapshots, today);
    if let Ok(value) = serde_json::to_value(summary) {
        cache.insert_unless_invalidated(key, value, generation);
    }
    Ok(summary)
}

/// Active habits with their entry for `today`, if any.
pub async fn today(
    repo: &dyn HabitRepository,
    user_id: i32,
    today: NaiveDate,
) -> Result<Vec<TodayHabit>, DomainError> {
    let habits = list_habits(
        repo,
        user_id,
        HabitFilter {
            status: crate::domain::HabitStatus::Active,
            query: None,
        },
    )
    .await?;

    Ok(habits
        .into_iter()
        .map(|h| {
            let entry = h.entries.into_iter().find(|e| e.entry_date == today);
            TodayHabit {
                completed_today: entry.as_ref().is_some_and(|e| e.completed),
                habit: h.habit,
                entry,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> CreateHabitInput {
        CreateHabitInput {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn title_is_required_and_bounded() {
        assert!(validate_create(&input("Read")).is_ok());
        assert!(validate_create(&input("   ")).is_err());
        assert!(validate_create(&input(&"x".repeat(50))).is_ok());
        assert!(validate_create(&input(&"x".repeat(51))).is_err());
    }

    #[test]
    fn description_is_bounded() {
        let mut habit = input("Read");
        habit.description = Some("d".repeat(200));
        assert!(validate_create(&habit).is_ok());
        habit.description = Some("d".repeat(201));
        assert!(validate_create(&habit).is_err());
    }

    #[test]
    fn target_count_must_be_positive() {
        let mut habit = input("Read");
        habit.target_count = Some(0);
        assert_eq!(
            validate_create(&habit),
            Err(DomainError::validation("target_count must be at least 1"))
        );
    }

    #[test]
    fn update_checks_only_provided_fields() {
        assert!(validate_update(&UpdateHabitInput::default()).is_ok());

        let update = UpdateHabitInput {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_update(&update).is_err());
    }
}
