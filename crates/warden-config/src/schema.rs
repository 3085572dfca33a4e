//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw modes file as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawModesFile {
    /// Config schema version
    pub config_version: u32,

    /// Mode configurations keyed by mode key
    #[serde(default)]
    pub modes: BTreeMap<String, RawModeConfig>,
}

/// One mode configuration as written in the file.
///
/// Durations are plain seconds; bedtimes are "HH:MM" strings. Everything
/// is optional so partial tables stay forward-compatible.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawModeConfig {
    #[serde(default)]
    pub allowed_apps: Vec<String>,

    #[serde(default)]
    pub blocked_apps: Vec<String>,

    #[serde(default)]
    pub minimized_apps: Vec<String>,

    /// Mode duration budget in seconds (0 or absent = unlimited)
    pub duration_seconds: Option<u64>,

    #[serde(default)]
    pub strict_mode: bool,

    #[serde(default = "default_true")]
    pub notifications_enabled: bool,

    #[serde(default)]
    pub notification_intensity: NotificationIntensity,

    /// Daily screen time limit in seconds
    pub screen_time_limit_seconds: Option<u64>,

    /// Status tag that counts toward the productivity score
    pub productivity_target: Option<String>,

    /// Enforcement timer budget in seconds
    pub time_limit_seconds: Option<u64>,

    /// Bedtime window start, "HH:MM"
    pub bedtime_start: Option<String>,

    /// Bedtime window end, "HH:MM"
    pub bedtime_end: Option<String>,

    #[serde(default)]
    pub parental_override_required: bool,

    #[serde(default)]
    pub screen_time_alerts: bool,

    /// Multiplier applied to time in educational apps
    #[serde(default = "default_bonus")]
    pub educational_time_bonus: f64,

    #[serde(default)]
    pub achievement_tracking: bool,
}

fn default_true() -> bool {
    true
}

fn default_bonus() -> f64 {
    1.0
}

/// How loud notifications for this mode should be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationIntensity {
    Low,
    #[default]
    Medium,
    High,
}
