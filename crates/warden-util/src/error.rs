//! Error types for warden

use thiserror::Error;

use crate::ModeKey;

/// Core error type for warden operations.
///
/// Every variant maps to a stable kind string (see [`WardenError::kind`])
/// so the API layer can expose machine-readable failures without leaking
/// internal traces.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Invalid mode combination: {0}")]
    InvalidModeCombination(String),

    #[error("Mode config not found: {0}")]
    ConfigNotFound(ModeKey),

    #[error("Config validation failed: {0}")]
    ConfigValidationFailed(String),

    #[error("Passcode mismatch")]
    PasscodeMismatch,

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Stable machine-readable kind string for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidModeCombination(_) => "invalid_mode_combination",
            Self::ConfigNotFound(_) => "config_not_found",
            Self::ConfigValidationFailed(_) => "config_validation_failed",
            Self::PasscodeMismatch => "passcode_mismatch",
            Self::PersistenceUnavailable(_) => "persistence_unavailable",
            Self::HostError(_) => "host_error",
            Self::Internal(_) => "internal",
        }
    }

    pub fn combination(msg: impl Into<String>) -> Self {
        Self::InvalidModeCombination(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidationFailed(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceUnavailable(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(
            WardenError::combination("focus under kids").kind(),
            "invalid_mode_combination"
        );
        assert_eq!(WardenError::PasscodeMismatch.kind(), "passcode_mismatch");
        assert_eq!(
            WardenError::ConfigNotFound(ModeKey::new("nope")).kind(),
            "config_not_found"
        );
    }
}
