//! Achievement requirement checks.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::RequirementType;
use crate::models::achievement;

/// Counters an achievement requirement can refer to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub current_streak: i64,
    pub habits_created: i64,
    pub completions: i64,
    pub level: i64,
}

impl UserStats {
    fn value_for(&self, requirement: RequirementType) -> i64 {
        match requirement {
            RequirementType::Streak => self.current_streak,
            RequirementType::HabitsCreated => self.habits_created,
            RequirementType::Completions => self.completions,
            RequirementType::Level => self.level,
        }
    }
}

pub fn meets(achievement: &achievement::Model, stats: &UserStats) -> bool {
    stats.value_for(achievement.requirement_type) >= achievement.requirement_value
}

/// Catalog entries met by `stats` and not yet in `unlocked`.
pub fn evaluate<'a>(
    catalog: &'a [achievement::Model],
    stats: &UserStats,
    unlocked: &HashSet<i32>,
) -> Vec<&'a achievement::Model> {
    catalog
        .iter()
        .filter(|a| !unlocked.contains(&a.id))
        .filter(|a| meets(a, stats))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rarity;

    fn rule(id: i32, requirement_type: RequirementType, value: i64) -> achievement::Model {
        achievement::Model {
            id,
            code: format!("rule_{}", id),
            name: format!("Rule {}", id),
            description: String::new(),
            icon: "🏆".to_string(),
            points_reward: 50,
            requirement_type,
            requirement_value: value,
            rarity: Rarity::Common,
        }
    }

    #[test]
    fn picks_met_requirements_only() {
        let catalog = vec![
            rule(1, RequirementType::HabitsCreated, 1),
            rule(2, RequirementType::Streak, 7),
            rule(3, RequirementType::Completions, 10),
            rule(4, RequirementType::Level, 2),
        ];
        let stats = UserStats {
            current_streak: 3,
            habits_created: 1,
            completions: 12,
            level: 1,
        };

        let ids: Vec<i32> = evaluate(&catalog, &stats, &HashSet::new())
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn already_unlocked_are_skipped() {
        let catalog = vec![rule(1, RequirementType::HabitsCreated, 1)];
        let stats = UserStats {
            habits_created: 5,
            ..Default::default()
        };
        let unlocked: HashSet<i32> = [1].into_iter().collect();
        assert!(evaluate(&catalog, &stats, &unlocked).is_empty());
    }
}
