//! Mode configuration parsing, validation, and storage for warden
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - One `[modes.<key>]` table per mode configuration
//! - Validation with clear error messages
//! - Atomic replace, point-in-time backup, and default restoration

mod mode;
mod schema;
mod store;
mod validation;

pub use mode::*;
pub use schema::*;
pub use store::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use warden_util::ModeKey;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),

    #[error("Mode config not found: {0}")]
    NotFound(ModeKey),

    #[error("Unknown setting field: {0}")]
    UnknownField(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parse and validate a full modes file from a TOML string
pub fn parse_modes(content: &str) -> ConfigResult<ModeSet> {
    let raw: RawModesFile = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_file(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(ModeSet::from_raw(raw))
}

/// Load and validate a modes file from disk
pub fn load_modes(path: impl AsRef<Path>) -> ConfigResult<ModeSet> {
    let content = std::fs::read_to_string(path)?;
    parse_modes(&content)
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_file() {
        let content = r#"
            config_version = 1

            [modes.standard_normal]
            strict_mode = false
        "#;

        let set = parse_modes(content).unwrap();
        assert_eq!(set.modes.len(), 1);
        assert!(set.get(&ModeKey::new("standard_normal")).is_some());
    }

    #[test]
    fn reject_wrong_version() {
        let content = r#"
            config_version = 99

            [modes.kids]
        "#;

        let result = parse_modes(content);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_overlapping_app_sets() {
        let content = r#"
            config_version = 1

            [modes.focus_deep]
            allowed_apps = ["Code"]
            blocked_apps = ["Code", "Steam"]
        "#;

        let result = parse_modes(content);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }
}
