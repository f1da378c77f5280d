//! Approximate wait estimates.
//!
//! Estimates assume a fixed admission throughput and are display hints only.

use std::fmt;

use serde::Serialize;

/// Weeks per displayed month.
const WEEKS_PER_MONTH: u32 = 4;

/// Coarse wait bucket shown to a waitlisted account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "unit", content = "count", rename_all = "snake_case")]
pub enum WaitEstimate {
    LessThanAWeek,
    Weeks(u32),
    Months(u32),
}

impl WaitEstimate {
    /// Bucket for `position` given `per_week` admissions.
    ///
    /// Fewer than `per_week` places from the front is under a week; beyond
    /// four weeks the estimate is given in months.
    #[must_use]
    pub fn for_position(position: u32, per_week: u32) -> Self {
        let per_week = per_week.max(1);
        if position < per_week {
            return Self::LessThanAWeek;
        }
        let weeks = estimated_weeks(position, per_week);
        if weeks > WEEKS_PER_MONTH {
            Self::Months(weeks.div_ceil(WEEKS_PER_MONTH))
        } else {
            Self::Weeks(weeks)
        }
    }
}

impl fmt::Display for WaitEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LessThanAWeek => f.write_str("less than 1 week"),
            Self::Weeks(1) => f.write_str("1 week"),
            Self::Weeks(n) => write!(f, "{n} weeks"),
            Self::Months(1) => f.write_str("1 month"),
            Self::Months(n) => write!(f, "{n} months"),
        }
    }
}

/// Whole weeks until admission: `ceil(position / per_week)`.
#[must_use]
pub fn estimated_weeks(position: u32, per_week: u32) -> u32 {
    position.div_ceil(per_week.max(1))
}

/// Fraction of the waitlist ahead of and including `position`, clamped to
/// `[0, 1]`. An empty waitlist reports `1.0`.
#[must_use]
pub fn progress(position: u32, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let fraction = f64::from(position) / total as f64;
    fraction.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets() {
        assert_eq!(WaitEstimate::for_position(1, 10), WaitEstimate::LessThanAWeek);
        assert_eq!(WaitEstimate::for_position(9, 10), WaitEstimate::LessThanAWeek);
        assert_eq!(WaitEstimate::for_position(10, 10), WaitEstimate::Weeks(1));
        assert_eq!(WaitEstimate::for_position(11, 10), WaitEstimate::Weeks(2));
        assert_eq!(WaitEstimate::for_position(40, 10), WaitEstimate::Weeks(4));
        assert_eq!(WaitEstimate::for_position(41, 10), WaitEstimate::Months(2));
        assert_eq!(WaitEstimate::for_position(161, 10), WaitEstimate::Months(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(WaitEstimate::LessThanAWeek.to_string(), "less than 1 week");
        assert_eq!(WaitEstimate::Weeks(1).to_string(), "1 week");
        assert_eq!(WaitEstimate::Weeks(3).to_string(), "3 weeks");
        assert_eq!(WaitEstimate::Months(1).to_string(), "1 month");
        assert_eq!(WaitEstimate::Months(2).to_string(), "2 months");
    }

    #[test]
    fn test_estimated_weeks() {
        assert_eq!(estimated_weeks(7, 10), 1);
        assert_eq!(estimated_weeks(20, 10), 2);
        assert_eq!(estimated_weeks(21, 10), 3);
        // Zero throughput is treated as one per week.
        assert_eq!(estimated_weeks(3, 0), 3);
    }

    #[test]
    fn test_progress_clamped() {
        assert!((progress(7, 50) - 0.14).abs() < 1e-9);
        assert!((progress(80, 50) - 1.0).abs() < f64::EPSILON);
        assert!((progress(3, 0) - 1.0).abs() < f64::EPSILON);
        for position in 1..200 {
            let p = progress(position, 60);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
