//! Level Service - points, experience and streak bookkeeping

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict, Order};
use sea_orm::*;
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::{habit, habit_entry, user, user_level};
use crate::progress::{self, EntryRecord, LevelProgress};

/// UserLevel row plus the level derived from experience.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelReport {
    pub user_id: i32,
    pub points: i64,
    pub experience: i64,
    pub level: u32,
    pub points_into_level: u64,
    pub points_required_for_next_level: u64,
    pub progress_percent: u8,
    pub total_habits_created: i32,
    pub total_habits_completed: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<NaiveDate>,
}

impl LevelReport {
    /// Report the row as seen on `today`; a lapsed streak reads as 0.
    pub fn as_of(row: &user_level::Model, today: NaiveDate) -> Self {
        let level: LevelProgress = progress::compute_level(row.experience);

        Self {
            user_id: row.user_id,
            points: row.points,
            experience: row.experience,
            level: level.level,
            points_into_level: level.points_into_level,
            points_required_for_next_level: level.points_required_for_next_level,
            progress_percent: level.percent(),
            total_habits_created: row.total_habits_created,
            total_habits_completed: row.total_habits_completed,
            current_streak: progress::streak_as_of(
                row.current_streak,
                row.last_activity_date,
                today,
            ),
            longest_streak: row.longest_streak,
            last_activity_date: row.last_activity_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub points: i64,
    pub experience: i64,
    pub level: u32,
    pub current_streak: i32,
}

pub const DEFAULT_LEADERBOARD_LIMIT: u64 = 10;
pub const MAX_LEADERBOARD_LIMIT: u64 = 100;

/// Fetch the user's level row, creating a zeroed one on first access.
pub async fn get_or_create<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<user_level::Model, DomainError> {
    if let Some(row) = find(conn, user_id).await? {
        return Ok(row);
    }

    let now = chrono::Utc::now().to_rfc3339();
    let row = user_level::ActiveModel {
        user_id: Set(user_id),
        points: Set(0),
        experience: Set(0),
        total_habits_created: Set(0),
        total_habits_completed: Set(0),
        current_streak: Set(0),
        longest_streak: Set(0),
        last_activity_date: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    // A concurrent first access may have created it already
    user_level::Entity::insert(row)
        .on_conflict(
            OnConflict::column(user_level::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    tracing::debug!("Created level record for user {}", user_id);
    find(conn, user_id)
        .await?
        .ok_or_else(|| DomainError::Internal(format!("level record missing for user {}", user_id)))
}

async fn find<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<user_level::Model>, DomainError> {
    Ok(user_level::Entity::find()
        .filter(user_level::Column::UserId.eq(user_id))
        .one(conn)
        .await?)
}

pub async fn get_level(
    db: &DatabaseConnection,
    user_id: i32,
    today: NaiveDate,
) -> Result<LevelReport, DomainError> {
    let row = get_or_create(db, user_id).await?;
    Ok(LevelReport::as_of(&row, today))
}

/// Add `amount` to both the spendable balance and cumulative experience.
pub async fn credit<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    amount: i64,
) -> Result<user_level::Model, DomainError> {
    let row = get_or_create(conn, user_id).await?;
    let points = row.points + amount;
    let experience = row.experience + amount;

    let mut active: user_level::ActiveModel = row.into();
    active.points = Set(points);
    active.experience = Set(experience);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(conn).await?)
}

/// Spend `amount` from the balance. Experience is untouched, so the level
/// never drops.
pub async fn debit<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    amount: i64,
) -> Result<user_level::Model, DomainError> {
    let row = get_or_create(conn, user_id).await?;
    if row.points < amount {
        return Err(DomainError::InsufficientFunds);
    }
    set_balance(conn, row.clone(), row.points - amount).await
}

pub async fn set_balance<C: ConnectionTrait>(
    conn: &C,
    row: user_level::Model,
    balance: i64,
) -> Result<user_level::Model, DomainError> {
    let mut active: user_level::ActiveModel = row.into();
    active.points = Set(balance);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(conn).await?)
}

/// Manually award points. Rewards from newly met achievements are applied
/// in the same transaction.
pub async fn add_points(
    db: &DatabaseConnection,
    user_id: i32,
    amount: i64,
    today: NaiveDate,
) -> Result<LevelReport, DomainError> {
    if amount <= 0 {
        return Err(DomainError::validation("points must be positive"));
    }

    let txn = db.begin().await?;
    credit(&txn, user_id, amount).await?;
    super::achievement_service::check_and_unlock(&txn, user_id, today).await?;
    let row = get_or_create(&txn, user_id).await?;
    txn.commit().await?;

    tracing::info!("Awarded {} points to user {}", amount, user_id);
    Ok(LevelReport::as_of(&row, today))
}

pub async fn record_habit_created<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<user_level::Model, DomainError> {
    let row = get_or_create(conn, user_id).await?;
    let created = row.total_habits_created + 1;

    let mut active: user_level::ActiveModel = row.into();
    active.total_habits_created = Set(created);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(conn).await?)
}

pub async fn record_completion<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<user_level::Model, DomainError> {
    let row = credit(conn, user_id, progress::POINTS_PER_COMPLETION).await?;
    let completed = row.total_habits_completed + 1;

    let mut active: user_level::ActiveModel = row.into();
    active.total_habits_completed = Set(completed);
    Ok(active.update(conn).await?)
}

/// Recompute streak counters from every entry of every habit the user
/// owns. A day counts once any habit was completed on it.
pub async fn refresh_streaks<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    today: NaiveDate,
) -> Result<user_level::Model, DomainError> {
    let habit_ids: Vec<i32> = habit::Entity::find()
        .filter(habit::Column::UserId.eq(user_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|h| h.id)
        .collect();

    let entries: Vec<EntryRecord> = if habit_ids.is_empty() {
        Vec::new()
    } else {
        habit_entry::Entity::find()
            .filter(habit_entry::Column::HabitId.is_in(habit_ids))
            .filter(habit_entry::Column::Completed.eq(true))
            .all(conn)
            .await?
            .iter()
            .map(EntryRecord::from)
            .collect()
    };

    let current = progress::compute_streak(&entries, today) as i32;
    let longest = progress::longest_streak(&entries) as i32;
    let last_activity = entries.iter().map(|e| e.date).filter(|d| *d <= today).max();

    let row = get_or_create(conn, user_id).await?;
    let longest = longest.max(row.longest_streak).max(current);

    let mut active: user_level::ActiveModel = row.into();
    active.current_streak = Set(current);
    active.longest_streak = Set(longest);
    active.last_activity_date = Set(last_activity);
    active.updated_at = Set(chrono::Utc::now().to_rfc3339());
    Ok(active.update(conn).await?)
}

pub fn clamp_limit(limit: Option<u64>) -> u64 {
    limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT)
}

/// Users ranked by experience, then current streak as of `today`, then id.
pub async fn leaderboard(
    db: &DatabaseConnection,
    limit: u64,
    today: NaiveDate,
) -> Result<Vec<LeaderboardEntry>, DomainError> {
    // Same rule as progress::streak_as_of, so lapsed streaks rank as 0
    let running_streak = Expr::cust_with_values(
        "CASE WHEN user_levels.last_activity_date >= ? THEN user_levels.current_streak ELSE 0 END",
        [today - chrono::Duration::days(1)],
    );

    let rows = user_level::Entity::find()
        .find_also_related(user::Entity)
        .order_by_desc(user_level::Column::Experience)
        .order_by(running_streak, Order::Desc)
        .order_by_asc(user_level::Column::UserId)
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(level, user)| user.map(|u| (level, u)))
        .enumerate()
        .map(|(i, (level, user))| LeaderboardEntry {
            rank: i as u32 + 1,
            user_id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            points: level.points,
            experience: level.experience,
            level: progress::compute_level(level.experience).level,
            current_streak: progress::streak_as_of(
                level.current_streak,
                level.last_activity_date,
                today,
            ),
        })
        .collect())
}
