//! Usage session record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_util::SessionId;

/// Maximum number of distinct titles remembered per session
pub const MAX_TITLES_PER_SESSION: usize = 20;

/// A contiguous period of focus on one application, bounded by gaps or
/// app switches.
///
/// Exactly one session per tracking stream is open (`is_active` and
/// `end_time == None`); all others are closed and their `[start, end)`
/// intervals never overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub app_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    /// Accumulated focus time; frozen when the session closes
    pub total_duration: Duration,

    /// Title changes observed within the same app
    pub context_changes: u32,

    /// Ordered unique titles, capped at [`MAX_TITLES_PER_SESSION`]
    pub titles_seen: Vec<String>,

    /// Productivity-status transitions observed
    pub status_changes: u32,

    /// Number of samples folded into this session
    pub window_count: u32,

    pub is_active: bool,
}

impl Session {
    /// Whether this session closed with no measurable duration
    /// (a single sample immediately superseded). Kept for audit, excluded
    /// from duration averages unless explicitly requested.
    pub fn is_zero_duration(&self) -> bool {
        self.total_duration == Duration::ZERO
    }
}
