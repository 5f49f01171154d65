//! Summary numbers for display: completion rates and per-user totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EntryRecord;
use super::streak::{compute_streak, longest_streak};

/// Percentage of entries marked completed, rounded half up.
///
/// Returns 0 for an empty list.
pub fn completion_rate(entries: &[EntryRecord]) -> u8 {
    let total = entries.len() as u64;
    let completed = entries.iter().filter(|e| e.completed).count() as u64;
    rate(completed, total)
}

fn rate(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed * 200 + total) / (total * 2);
    pct.min(100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HabitStats {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completion_rate: u8,
    pub total_completions: u32,
}

pub fn habit_stats(entries: &[EntryRecord], today: NaiveDate) -> HabitStats {
    HabitStats {
        current_streak: compute_streak(entries, today),
        longest_streak: longest_streak(entries),
        completion_rate: completion_rate(entries),
        total_completions: entries.iter().filter(|e| e.completed).count() as u32,
    }
}

/// One habit as seen by the summary: its active flag and its entries.
#[derive(Debug, Clone)]
pub struct HabitSnapshot {
    pub is_active: bool,
    pub entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitSummary {
    pub total_habits: u32,
    pub active_habits: u32,
    pub completed_today: u32,
    /// Completion rate over every entry of every habit
    pub success_rate: u8,
}

pub fn summarize(habits: &[HabitSnapshot], today: NaiveDate) -> HabitSummary {
    let mut completed = 0u64;
    let mut total = 0u64;
    let mut completed_today = 0u32;

    for habit in habits {
        total += habit.entries.len() as u64;
        completed += habit.entries.iter().filter(|e| e.completed).count() as u64;

        if habit
            .entries
            .iter()
            .any(|e| e.date == today && e.completed)
        {
            completed_today += 1;
        }
    }

    HabitSummary {
        total_habits: habits.len() as u32,
        active_habits: habits.iter().filter(|h| h.is_active).count() as u32,
        completed_today,
        success_rate: rate(completed, total),
    }
}

/// Entries dated `today`.
pub fn todays_entries(entries: &[EntryRecord], today: NaiveDate) -> Vec<EntryRecord> {
    entries.iter().filter(|e| e.date == today).copied().collect()
}
