//! Consecutive-day streaks over completion records.

use chrono::NaiveDate;

use super::EntryRecord;

/// Current streak: consecutive days with a completed entry, walking back
/// from `today`.
///
/// The first match may be today or yesterday; every later match must be
/// exactly one day before the previous one. Same-day duplicates and dates
/// after `today` are skipped, and the first gap of two days or more ends the
/// walk.
pub fn compute_streak(entries: &[EntryRecord], today: NaiveDate) -> u32 {
    let mut completed: Vec<NaiveDate> = entries
        .iter()
        .filter(|e| e.completed)
        .map(|e| e.date)
        .collect();

    if completed.is_empty() {
        return 0;
    }

    completed.sort_unstable_by(|a, b| b.cmp(a));

    let mut streak = 0u32;
    let mut cursor = today;

    for date in completed {
        let diff = (cursor - date).num_days();

        if diff == 1 || (streak == 0 && diff == 0) {
            streak += 1;
            cursor = date;
        } else if diff > 1 {
            break;
        }
    }

    streak
}

/// Longest run of consecutive completed days anywhere in the history.
pub fn longest_streak(entries: &[EntryRecord]) -> u32 {
    let mut completed: Vec<NaiveDate> = entries
        .iter()
        .filter(|e| e.completed)
        .map(|e| e.date)
        .collect();

    completed.sort_unstable();
    completed.dedup();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for date in completed {
        run = match previous {
            Some(prev) if (date - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    longest
}

/// A streak recorded when the user last completed something, seen from
/// `today`. A run whose last day is before yesterday has ended.
pub fn streak_as_of(stored: i32, last_completed: Option<NaiveDate>, today: NaiveDate) -> i32 {
    match last_completed {
        Some(last) if (today - last).num_days() <= 1 => stored,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn done(s: &str) -> EntryRecord {
        EntryRecord::new(day(s), true)
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(compute_streak(&[], day("2025-01-05")), 0);
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn incomplete_entries_do_not_count() {
        let entries = vec![
            EntryRecord::new(day("2025-01-05"), false),
            EntryRecord::new(day("2025-01-04"), false),
        ];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 0);
        assert_eq!(longest_streak(&entries), 0);
    }

    #[test]
    fn gap_before_third_day_breaks_chain() {
        let entries = vec![done("2025-01-05"), done("2025-01-04"), done("2025-01-02")];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 2);
    }

    #[test]
    fn consecutive_days_ending_today() {
        let entries: Vec<EntryRecord> = (1..=7)
            .map(|d| done(&format!("2025-03-{:02}", d)))
            .collect();
        assert_eq!(compute_streak(&entries, day("2025-03-07")), 7);
        assert_eq!(longest_streak(&entries), 7);
    }

    #[test]
    fn unordered_input_is_sorted_first() {
        let entries = vec![done("2025-01-03"), done("2025-01-05"), done("2025-01-04")];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 3);
    }

    #[test]
    fn streak_still_alive_when_last_completion_was_yesterday() {
        let entries = vec![done("2025-01-04"), done("2025-01-03")];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 2);
    }

    #[test]
    fn streak_lost_after_two_idle_days() {
        let entries = vec![done("2025-01-02"), done("2025-01-01")];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 0);
    }

    #[test]
    fn future_dates_are_not_consecutive_steps() {
        let entries = vec![done("2025-01-09"), done("2025-01-05"), done("2025-01-04")];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 2);
    }

    #[test]
    fn same_day_duplicates_do_not_double_count() {
        let entries = vec![done("2025-01-05"), done("2025-01-05"), done("2025-01-04")];
        assert_eq!(compute_streak(&entries, day("2025-01-05")), 2);
        assert_eq!(longest_streak(&entries), 2);
    }

    #[test]
    fn longest_run_can_be_in_the_past() {
        let entries = vec![
            done("2025-01-01"),
            done("2025-01-02"),
            done("2025-01-03"),
            done("2025-01-04"),
            done("2025-01-10"),
            done("2025-01-11"),
        ];
        assert_eq!(longest_streak(&entries), 4);
        assert_eq!(compute_streak(&entries, day("2025-01-11")), 2);
    }

    #[test]
    fn recorded_streak_survives_until_a_day_is_missed() {
        let last = Some(day("2025-01-05"));
        assert_eq!(streak_as_of(4, last, day("2025-01-05")), 4);
        assert_eq!(streak_as_of(4, last, day("2025-01-06")), 4);
        assert_eq!(streak_as_of(4, last, day("2025-01-07")), 0);
        assert_eq!(streak_as_of(4, None, day("2025-01-05")), 0);
    }
}
