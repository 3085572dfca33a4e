//! Store trait definitions

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use warden_api::{Session, TimerDayEntry, WindowSample};

use crate::StoreResult;

/// Main store trait
pub trait Store: Send + Sync {
    // Session log

    /// Insert or replace a session by id
    fn persist_session(&self, session: &Session) -> StoreResult<()>;

    /// Load sessions ordered by start time, optionally bounded below
    fn load_sessions(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<Session>>;

    // Raw sample log

    /// Append a raw window sample
    fn persist_sample(&self, sample: &WindowSample) -> StoreResult<()>;

    /// Load raw samples ordered by timestamp, optionally bounded below
    fn load_samples(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<WindowSample>>;

    // Enforcement timer history (day-keyed)

    /// Get the timer history entry for a day
    fn get_timer_day(&self, day: NaiveDate) -> StoreResult<Option<TimerDayEntry>>;

    /// Insert or replace the timer history entry for a day
    fn set_timer_day(&self, day: NaiveDate, entry: &TimerDayEntry) -> StoreResult<()>;

    /// Flip `requires_passcode` for one day only. Returns false when the
    /// day has no entry.
    fn set_requires_passcode(&self, day: NaiveDate, requires: bool) -> StoreResult<bool>;

    /// Load the full day-keyed timer history
    fn load_timer_history(&self) -> StoreResult<BTreeMap<NaiveDate, TimerDayEntry>>;

    /// Drop all timer history entries
    fn clear_timer_history(&self) -> StoreResult<()>;

    // Retention

    /// Delete sessions and samples older than the cutoff. Returns the
    /// number of rows removed.
    fn cleanup_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    // Health

    /// Check if the store is reachable
    fn is_healthy(&self) -> bool;
}
