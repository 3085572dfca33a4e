//! Mode selectors, timer snapshots, and power actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level policy regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeType {
    Standard,
    Kids,
    Focus,
}

impl ModeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeType::Standard => "standard",
            ModeType::Kids => "kids",
            ModeType::Focus => "focus",
        }
    }
}

/// Refinement of [`ModeType::Standard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardSubMode {
    Normal,
    Work,
    Leisure,
}

impl StandardSubMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardSubMode::Normal => "normal",
            StandardSubMode::Work => "work",
            StandardSubMode::Leisure => "leisure",
        }
    }
}

/// Refinement of [`ModeType::Focus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusType {
    Deep,
    Light,
    Custom,
}

impl FocusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusType::Deep => "deep",
            FocusType::Light => "light",
            FocusType::Custom => "custom",
        }
    }
}

/// Device power action dispatched when an enforcement budget expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerAction {
    Sleep,
    Shutdown,
    Reboot,
    Hibernate,
    Logoff,
}

impl PowerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::Sleep => "sleep",
            PowerAction::Shutdown => "shutdown",
            PowerAction::Reboot => "reboot",
            PowerAction::Hibernate => "hibernate",
            PowerAction::Logoff => "logoff",
        }
    }

    /// Parse an action name; defaults to `Sleep` for unknown input, the
    /// least destructive option.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "shutdown" => PowerAction::Shutdown,
            "reboot" => PowerAction::Reboot,
            "hibernate" => PowerAction::Hibernate,
            "logoff" => PowerAction::Logoff,
            _ => PowerAction::Sleep,
        }
    }
}

/// Enforcement decision for one observed sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    Allow,
    Block,
    Minimize,
}

/// Phase of the enforcement timer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Warning,
    Triggered,
}

/// Point-in-time view of the enforcement timer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerStatus {
    pub phase: TimerPhase,
    pub is_timing: bool,
    pub elapsed: Duration,
    pub time_limit: Duration,
    pub action: PowerAction,
    pub is_warning: bool,
}

/// Day-keyed record of an enforcement trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDayEntry {
    pub triggered: bool,
    pub requires_passcode: bool,
}

/// Point-in-time view of the mode state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeStatus {
    pub mode: ModeType,
    pub submode: Option<StandardSubMode>,
    pub focus: Option<FocusType>,
    pub is_active: bool,
    pub session_start: Option<DateTime<Utc>>,
    pub session_duration: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_action_parse_defaults_to_sleep() {
        assert_eq!(PowerAction::parse("shutdown"), PowerAction::Shutdown);
        assert_eq!(PowerAction::parse("REBOOT"), PowerAction::Reboot);
        assert_eq!(PowerAction::parse("unknown"), PowerAction::Sleep);
    }
}
