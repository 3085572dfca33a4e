//! Validated mode configuration structures

use chrono::NaiveTime;
use std::collections::BTreeMap;
use std::time::Duration;
use warden_api::Category;
use warden_util::ModeKey;

use crate::schema::{NotificationIntensity, RawModeConfig, RawModesFile};
use crate::CURRENT_CONFIG_VERSION;

/// Validated mode configuration ready for use by the mode state machine.
///
/// App sets are pairwise disjoint (enforced at validation time).
#[derive(Debug, Clone, PartialEq)]
pub struct ModeConfig {
    pub allowed_apps: Vec<String>,
    pub blocked_apps: Vec<String>,
    pub minimized_apps: Vec<String>,

    /// Mode duration budget. None means unlimited.
    pub duration: Option<Duration>,

    /// When set, unclassified apps are blocked instead of allowed
    pub strict_mode: bool,

    pub notifications_enabled: bool,
    pub notification_intensity: NotificationIntensity,

    pub screen_time_limit: Option<Duration>,
    pub productivity_target: Option<Category>,

    /// Enforcement timer budget fed to the timer on mode entry
    pub time_limit: Option<Duration>,

    pub bedtime_start: Option<NaiveTime>,
    pub bedtime_end: Option<NaiveTime>,

    pub parental_override_required: bool,
    pub screen_time_alerts: bool,
    pub educational_time_bonus: f64,
    pub achievement_tracking: bool,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            allowed_apps: Vec::new(),
            blocked_apps: Vec::new(),
            minimized_apps: Vec::new(),
            duration: None,
            strict_mode: false,
            notifications_enabled: true,
            notification_intensity: NotificationIntensity::Medium,
            screen_time_limit: None,
            productivity_target: None,
            time_limit: None,
            bedtime_start: None,
            bedtime_end: None,
            parental_override_required: false,
            screen_time_alerts: false,
            educational_time_bonus: 1.0,
            achievement_tracking: false,
        }
    }
}

impl ModeConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawModeConfig) -> Self {
        Self {
            allowed_apps: raw.allowed_apps,
            blocked_apps: raw.blocked_apps,
            minimized_apps: raw.minimized_apps,
            duration: seconds_opt(raw.duration_seconds),
            strict_mode: raw.strict_mode,
            notifications_enabled: raw.notifications_enabled,
            notification_intensity: raw.notification_intensity,
            screen_time_limit: seconds_opt(raw.screen_time_limit_seconds),
            productivity_target: raw.productivity_target.as_deref().map(Category::parse),
            time_limit: seconds_opt(raw.time_limit_seconds),
            bedtime_start: raw.bedtime_start.as_deref().and_then(parse_clock),
            bedtime_end: raw.bedtime_end.as_deref().and_then(parse_clock),
            parental_override_required: raw.parental_override_required,
            screen_time_alerts: raw.screen_time_alerts,
            educational_time_bonus: raw.educational_time_bonus,
            achievement_tracking: raw.achievement_tracking,
        }
    }

    /// Convert back to the raw file representation for saving
    pub fn to_raw(&self) -> RawModeConfig {
        RawModeConfig {
            allowed_apps: self.allowed_apps.clone(),
            blocked_apps: self.blocked_apps.clone(),
            minimized_apps: self.minimized_apps.clone(),
            duration_seconds: self.duration.map(|d| d.as_secs()),
            strict_mode: self.strict_mode,
            notifications_enabled: self.notifications_enabled,
            notification_intensity: self.notification_intensity,
            screen_time_limit_seconds: self.screen_time_limit.map(|d| d.as_secs()),
            productivity_target: self.productivity_target.map(|c| c.as_str().to_string()),
            time_limit_seconds: self.time_limit.map(|d| d.as_secs()),
            bedtime_start: self.bedtime_start.map(format_clock),
            bedtime_end: self.bedtime_end.map(format_clock),
            parental_override_required: self.parental_override_required,
            screen_time_alerts: self.screen_time_alerts,
            educational_time_bonus: self.educational_time_bonus,
            achievement_tracking: self.achievement_tracking,
        }
    }

    /// Apply field-wise overrides on top of this config
    pub fn with_overrides(&self, overrides: &ModeOverrides) -> Self {
        let mut cfg = self.clone();
        if let Some(apps) = &overrides.allowed_apps {
            cfg.allowed_apps = apps.clone();
        }
        if let Some(apps) = &overrides.blocked_apps {
            cfg.blocked_apps = apps.clone();
        }
        if let Some(apps) = &overrides.minimized_apps {
            cfg.minimized_apps = apps.clone();
        }
        if let Some(d) = overrides.duration {
            cfg.duration = Some(d);
        }
        if let Some(s) = overrides.strict_mode {
            cfg.strict_mode = s;
        }
        if let Some(t) = overrides.time_limit {
            cfg.time_limit = Some(t);
        }
        if let Some(target) = overrides.productivity_target {
            cfg.productivity_target = Some(target);
        }
        cfg
    }
}

/// Caller-supplied per-switch overrides (`custom_settings` on mode switch).
/// Unset fields fall through to the stored config.
#[derive(Debug, Clone, Default)]
pub struct ModeOverrides {
    pub allowed_apps: Option<Vec<String>>,
    pub blocked_apps: Option<Vec<String>>,
    pub minimized_apps: Option<Vec<String>>,
    pub duration: Option<Duration>,
    pub strict_mode: Option<bool>,
    pub time_limit: Option<Duration>,
    pub productivity_target: Option<Category>,
}

/// The full set of validated mode configurations
#[derive(Debug, Clone, Default)]
pub struct ModeSet {
    pub modes: BTreeMap<ModeKey, ModeConfig>,
}

impl ModeSet {
    pub fn from_raw(raw: RawModesFile) -> Self {
        let modes = raw
            .modes
            .into_iter()
            .map(|(key, cfg)| (ModeKey::new(key), ModeConfig::from_raw(cfg)))
            .collect();
        Self { modes }
    }

    pub fn to_raw(&self) -> RawModesFile {
        RawModesFile {
            config_version: CURRENT_CONFIG_VERSION,
            modes: self
                .modes
                .iter()
                .map(|(key, cfg)| (key.as_str().to_string(), cfg.to_raw()))
                .collect(),
        }
    }

    pub fn get(&self, key: &ModeKey) -> Option<&ModeConfig> {
        self.modes.get(key)
    }

    pub fn keys(&self) -> Vec<ModeKey> {
        self.modes.keys().cloned().collect()
    }
}

pub(crate) fn seconds_opt(secs: Option<u64>) -> Option<Duration> {
    match secs {
        None | Some(0) => None,
        Some(s) => Some(Duration::from_secs(s)),
    }
}

pub(crate) fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

pub(crate) fn format_clock(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}
