//! Host adapter traits

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use warden_api::{PowerAction, WindowSample};

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Power action failed: {0}")]
    PowerActionFailed(String),

    #[error("App control failed: {0}")]
    AppControlFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Host adapter trait - implemented by platform-specific adapters.
///
/// `snapshot` runs on every observer tick and must not block; the async
/// operations may block internally but callers never await completion of
/// the underlying OS action.
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Sample the currently focused application/window.
    ///
    /// Returns `None` when there is no focused window or inspection fails;
    /// the sampling pipeline tolerates gaps, so failures never propagate
    /// as errors.
    fn snapshot(&self) -> Option<WindowSample>;

    /// Best-effort notification dispatch. Failures are swallowed by
    /// implementations, never propagated.
    fn notify(&self, title: &str, message: &str);

    /// Schedule a device power action after `delay`. Fire-and-forget; the
    /// core does not await completion of the OS action itself.
    async fn execute_power_action(&self, action: PowerAction, delay: Duration) -> HostResult<()>;

    /// Prevent the given app from keeping focus (policy "blocked")
    fn block_app(&self, app: &str) -> HostResult<()>;

    /// Minimize the given app's windows (policy "minimized")
    fn minimize_app(&self, app: &str) -> HostResult<()>;

    /// Whether the adapter can currently reach the OS facilities it needs
    fn is_healthy(&self) -> bool {
        true
    }
}
