//! Configuration validation

use std::collections::HashSet;
use thiserror::Error;

use crate::mode::parse_clock;
use crate::schema::{RawModeConfig, RawModesFile};

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Mode '{mode_key}': {message}")]
    ModeError { mode_key: String, message: String },

    #[error("Mode '{mode_key}': app '{app}' appears in both {first} and {second}")]
    OverlappingAppSets {
        mode_key: String,
        app: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("Mode '{mode_key}': invalid time '{value}' (expected HH:MM)")]
    InvalidTimeFormat { mode_key: String, value: String },

    #[error("Mode '{mode_key}': bedtime_start must be before bedtime_end")]
    BedtimeInverted { mode_key: String },
}

/// Validate a raw modes file
pub fn validate_file(file: &RawModesFile) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (key, cfg) in &file.modes {
        errors.extend(validate_mode(key, cfg));
    }
    errors
}

/// Validate a single raw mode configuration
pub fn validate_mode(mode_key: &str, cfg: &RawModeConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // App sets must be pairwise disjoint
    let pairs: [(&'static str, &[String], &'static str, &[String]); 3] = [
        ("allowed_apps", &cfg.allowed_apps, "blocked_apps", &cfg.blocked_apps),
        ("allowed_apps", &cfg.allowed_apps, "minimized_apps", &cfg.minimized_apps),
        ("blocked_apps", &cfg.blocked_apps, "minimized_apps", &cfg.minimized_apps),
    ];
    for (first_name, first, second_name, second) in pairs {
        let seen: HashSet<&str> = first.iter().map(String::as_str).collect();
        for app in second {
            if seen.contains(app.as_str()) {
                errors.push(ValidationError::OverlappingAppSets {
                    mode_key: mode_key.to_string(),
                    app: app.clone(),
                    first: first_name,
                    second: second_name,
                });
            }
        }
    }

    // Bedtime window
    let start = match &cfg.bedtime_start {
        Some(s) => match parse_clock(s) {
            Some(t) => Some(t),
            None => {
                errors.push(ValidationError::InvalidTimeFormat {
                    mode_key: mode_key.to_string(),
                    value: s.clone(),
                });
                None
            }
        },
        None => None,
    };
    let end = match &cfg.bedtime_end {
        Some(s) => match parse_clock(s) {
            Some(t) => Some(t),
            None => {
                errors.push(ValidationError::InvalidTimeFormat {
                    mode_key: mode_key.to_string(),
                    value: s.clone(),
                });
                None
            }
        },
        None => None,
    };
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            errors.push(ValidationError::BedtimeInverted {
                mode_key: mode_key.to_string(),
            });
        }
    }

    if !cfg.educational_time_bonus.is_finite() || cfg.educational_time_bonus < 0.0 {
        errors.push(ValidationError::ModeError {
            mode_key: mode_key.to_string(),
            message: "educational_time_bonus must be a non-negative number".into(),
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_sets_pass() {
        let cfg = RawModeConfig {
            allowed_apps: vec!["Code".into()],
            blocked_apps: vec!["Steam".into()],
            minimized_apps: vec!["Slack".into()],
            ..Default::default()
        };
        assert!(validate_mode("focus_deep", &cfg).is_empty());
    }

    #[test]
    fn overlap_is_rejected() {
        let cfg = RawModeConfig {
            blocked_apps: vec!["Slack".into()],
            minimized_apps: vec!["Slack".into()],
            ..Default::default()
        };
        let errors = validate_mode("focus_deep", &cfg);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::OverlappingAppSets { app, .. }] if app == "Slack"
        ));
    }

    #[test]
    fn inverted_bedtime_is_rejected() {
        let cfg = RawModeConfig {
            bedtime_start: Some("21:00".into()),
            bedtime_end: Some("20:00".into()),
            ..Default::default()
        };
        let errors = validate_mode("kids", &cfg);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::BedtimeInverted { .. }]
        ));
    }

    #[test]
    fn bad_clock_format_is_rejected() {
        let cfg = RawModeConfig {
            bedtime_start: Some("8pm".into()),
            ..Default::default()
        };
        let errors = validate_mode("kids", &cfg);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidTimeFormat { value, .. }] if value == "8pm"
        ));
    }
}
