//! Level curve.
//!
//! Inverse-square: reaching level `n` takes `LEVEL_BASE_POINTS * (n - 1)^2`
//! points, so level 2 starts at 100, level 3 at 400, level 4 at 900.

use serde::Serialize;

pub const LEVEL_BASE_POINTS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub points_into_level: u64,
    pub points_required_for_next_level: u64,
}

impl LevelProgress {
    /// Progress toward the next level, 0..100.
    pub fn percent(&self) -> u8 {
        if self.points_required_for_next_level == 0 {
            return 0;
        }
        ((self.points_into_level * 100) / self.points_required_for_next_level).min(100) as u8
    }
}

/// Points needed to stand at the start of `level`.
pub fn level_start(level: u32) -> u64 {
    let steps = u64::from(level.saturating_sub(1));
    LEVEL_BASE_POINTS.saturating_mul(steps.saturating_mul(steps))
}

pub fn compute_level(points: i64) -> LevelProgress {
    let points = u64::try_from(points).unwrap_or(0);

    // floor(sqrt(points / B)) == isqrt(floor(points / B)) for integers
    let steps = (points / LEVEL_BASE_POINTS).isqrt();
    let level = u32::try_from(steps).map_or(u32::MAX, |s| s.saturating_add(1));

    let start = level_start(level);
    let next = level_start(level.saturating_add(1));

    LevelProgress {
        level,
        points_into_level: points - start,
        points_required_for_next_level: next - start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_points_is_level_one() {
        let p = compute_level(0);
        assert_eq!(p.level, 1);
        assert_eq!(p.points_into_level, 0);
        assert_eq!(p.points_required_for_next_level, 100);
    }

    #[test]
    fn two_hundred_fifty_points() {
        let p = compute_level(250);
        assert_eq!(p.level, 2);
        assert_eq!(p.points_into_level, 150);
        assert_eq!(p.points_required_for_next_level, 300);
        assert_eq!(p.percent(), 50);
    }

    #[test]
    fn boundaries_start_a_new_level() {
        assert_eq!(compute_level(99).level, 1);
        assert_eq!(compute_level(100).level, 2);
        assert_eq!(compute_level(399).level, 2);
        assert_eq!(compute_level(400).level, 3);
        assert_eq!(compute_level(900).level, 4);
        assert_eq!(compute_level(900).points_into_level, 0);
    }

    #[test]
    fn negative_points_clamp_to_zero() {
        assert_eq!(compute_level(-50), compute_level(0));
    }

    #[test]
    fn level_is_monotonic_and_progress_in_range() {
        let mut previous = 0;
        for points in (0..20_000).step_by(7) {
            let p = compute_level(points);
            assert!(p.level >= previous);
            assert!(p.level >= 1);
            assert!(p.points_into_level < p.points_required_for_next_level);
            previous = p.level;
        }
    }
}
