//! Achievement Service - unlocks catalog achievements and credits rewards

use std::collections::HashSet;

use chrono::NaiveDate;

use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde::Serialize;

use crate::domain::DomainError;
use crate::models::{achievement, user_achievement};
use crate::progress::{self, UserStats};

use super::level_service;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlockedAchievement {
    #[serde(flatten)]
    pub achievement: achievement::Model,
    pub earned_at: String,
}

pub async fn list_catalog(db: &DatabaseConnection) -> Result<Vec<achievement::Model>, DomainError> {
    Ok(achievement::Entity::find()
        .order_by_asc(achievement::Column::RequirementType)
        .order_by_asc(achievement::Column::RequirementValue)
        .all(db)
        .await?)
}

pub async fn list_unlocked(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<UnlockedAchievement>, DomainError> {
    let rows = user_achievement::Entity::find()
        .filter(user_achievement::Column::UserId.eq(user_id))
        .find_also_related(achievement::Entity)
        .order_by_asc(user_achievement::Column::EarnedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(earned, achievement)| {
            achievement.map(|achievement| UnlockedAchievement {
                achievement,
                earned_at: earned.earned_at,
            })
        })
        .collect())
}

async fn unlocked_ids<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<HashSet<i32>, DomainError> {
    Ok(user_achievement::Entity::find()
        .filter(user_achievement::Column::UserId.eq(user_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|ua| ua.achievement_id)
        .collect())
}

/// Unlock every achievement the user now meets and credit its reward.
/// Rewards can raise the level enough to meet a level achievement, so
/// evaluation repeats until nothing new unlocks.
pub async fn check_and_unlock<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    today: NaiveDate,
) -> Result<Vec<achievement::Model>, DomainError> {
    let catalog = achievement::Entity::find().all(conn).await?;
    let mut unlocked = unlocked_ids(conn, user_id).await?;
    let mut newly = Vec::new();

    loop {
        let level = level_service::get_or_create(conn, user_id).await?;
        let stats = UserStats {
            current_streak: i64::from(progress::streak_as_of(
                level.current_streak,
                level.last_activity_date,
                today,
            )),
            habits_created: i64::from(level.total_habits_created),
            completions: i64::from(level.total_habits_completed),
            level: i64::from(progress::compute_level(level.experience).level),
        };

        let met: Vec<achievement::Model> = progress::evaluate(&catalog, &stats, &unlocked)
            .into_iter()
            .cloned()
            .collect();
        if met.is_empty() {
            break;
        }

        for achievement in met {
            unlocked.insert(achievement.id);

            let row = user_achievement::ActiveModel {
                user_id: Set(user_id),
                achievement_id: Set(achievement.id),
                earned_at: Set(chrono::Utc::now().to_rfc3339()),
                ..Default::default()
            };
            let inserted = user_achievement::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        user_achievement::Column::UserId,
                        user_achievement::Column::AchievementId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(conn)
                .await?;

            // Zero rows means someone else unlocked it first
            if inserted == 0 {
                continue;
            }

            if achievement.points_reward > 0 {
                level_service::credit(conn, user_id, achievement.points_reward).await?;
            }
            tracing::info!("User {} unlocked achievement '{}'", user_id, achievement.code);
            newly.push(achievement);
        }
    }

    Ok(newly)
}

pub async fn check_achievements(
    db: &DatabaseConnection,
    user_id: i32,
    today: NaiveDate,
) -> Result<Vec<achievement::Model>, DomainError> {
    let txn = db.begin().await?;
    let newly = check_and_unlock(&txn, user_id, today).await?;
    txn.commit().await?;
    Ok(newly)
}
