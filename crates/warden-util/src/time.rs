//! Time utilities for warden
//!
//! Countdown enforcement (the enforcement timer, session budgets) uses
//! monotonic time so it is immune to wall-clock changes. Calendar rollups
//! (daily/weekly/monthly analytics) use UTC wall-clock bucketing.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use std::time::{Duration, Instant};

/// Represents a point in monotonic time for countdown enforcement.
/// This is immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.duration_since(earlier.0)
    }

    pub fn checked_add(&self, duration: Duration) -> Option<MonotonicInstant> {
        self.0.checked_add(duration).map(MonotonicInstant)
    }

    /// Returns duration until `self`, or zero if `self` is in the past
    pub fn saturating_duration_until(&self, from: MonotonicInstant) -> Duration {
        if self.0 > from.0 {
            self.0.duration_since(from.0)
        } else {
            Duration::ZERO
        }
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// UTC calendar day containing the given timestamp.
pub fn day_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// First day of the ISO week containing the given timestamp (Monday).
pub fn week_start_of(ts: DateTime<Utc>) -> NaiveDate {
    let date = ts.date_naive();
    let offset = date.weekday().num_days_from_monday() as i64;
    date - ChronoDuration::days(offset)
}

/// First day of the calendar month containing the given timestamp.
pub fn month_start_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive().with_day(1).expect("day 1 always valid")
}

/// Format a date as the canonical day key used for persisted day-keyed records.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
