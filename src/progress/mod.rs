//! Progress computations
//!
//! Pure functions over small in-memory lists: streaks, completion rates,
//! the level curve, purchase decisions and achievement checks. Nothing in
//! here touches the database; coordinators in `services` load the records
//! and hand them over.

pub mod achievements;
pub mod aggregate;
pub mod level;
pub mod purchase;
pub mod streak;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use achievements::{UserStats, evaluate};
pub use aggregate::{
    HabitSnapshot, HabitStats, HabitSummary, completion_rate, habit_stats, summarize, todays_entries,
};
pub use level::{LEVEL_BASE_POINTS, LevelProgress, compute_level};
pub use purchase::{PurchaseOutcome, attempt_purchase, cart_total};
pub use streak::{compute_streak, longest_streak, streak_as_of};

/// Points credited the first time a habit is completed for a given date.
pub const POINTS_PER_COMPLETION: i64 = 10;

/// The two fields of an entry that every computation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub date: NaiveDate,
    pub completed: bool,
}

impl EntryRecord {
    pub fn new(date: NaiveDate, completed: bool) -> Self {
        Self { date, completed }
    }
}
