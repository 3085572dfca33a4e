//! Mode state machine
//!
//! One controller instance owns the active mode selector, its effective
//! config, and the policy store behind a single mutex. Enforcement is
//! called at observer frequency and must stay cheap: set lookups and
//! non-blocking host calls only.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use warden_api::{
    EnforcementAction, FocusType, ModeStatus, ModeType, StandardSubMode, WindowSample,
};
use warden_config::{ConfigError, ModeConfig, ModeOverrides, PolicyStore};
use warden_host_api::HostAdapter;
use warden_util::{ModeKey, MonotonicInstant, Result, WardenError};

use crate::{mode_key, validate_combination, CoreEvent};

struct ModeState {
    mode: ModeType,
    submode: Option<StandardSubMode>,
    focus: Option<FocusType>,
    effective: ModeConfig,
    is_active: bool,
    window_start: Option<DateTime<Utc>>,
    window_start_mono: Option<MonotonicInstant>,
    productivity_score: u64,
    focus_streak: u32,
}

impl ModeState {
    fn key(&self) -> ModeKey {
        mode_key(self.mode, self.submode, self.focus)
    }

    fn window_duration(&self) -> Option<Duration> {
        self.window_start_mono.map(|start| start.elapsed())
    }
}

struct Inner {
    policy: PolicyStore,
    state: ModeState,
}

/// The mode state machine and policy-store front end
pub struct ModeController {
    inner: Mutex<Inner>,
    host: Arc<dyn HostAdapter>,
}

impl ModeController {
    /// Create a controller starting active in `standard_normal`. A store
    /// without that key falls back to built-in defaults for it.
    pub fn new(policy: PolicyStore, host: Arc<dyn HostAdapter>) -> Self {
        let key = ModeKey::new("standard_normal");
        let effective = policy.get(&key).cloned().unwrap_or_default();

        info!(mode_key = %key, "Mode controller initialized");

        Self {
            inner: Mutex::new(Inner {
                policy,
                state: ModeState {
                    mode: ModeType::Standard,
                    submode: Some(StandardSubMode::Normal),
                    focus: None,
                    effective,
                    is_active: true,
                    window_start: Some(Utc::now()),
                    window_start_mono: Some(MonotonicInstant::now()),
                    productivity_score: 0,
                    focus_streak: 0,
                },
            }),
            host,
        }
    }

    /// Switch the active mode.
    ///
    /// Validates the selector first, resolves the stored config (patched
    /// field-wise by `overrides`), and only then commits: the previous
    /// window is closed and the new one opened. Any failure leaves the
    /// prior state untouched.
    pub fn switch_to_mode(
        &self,
        mode: ModeType,
        submode: Option<StandardSubMode>,
        focus: Option<FocusType>,
        overrides: Option<&ModeOverrides>,
    ) -> Result<CoreEvent> {
        validate_combination(mode, submode, focus)?;

        let key = mode_key(mode, submode, focus);
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;

        let stored = inner
            .policy
            .get(&key)
            .ok_or_else(|| WardenError::ConfigNotFound(key.clone()))?;
        let effective = match overrides {
            Some(ov) => stored.with_overrides(ov),
            None => stored.clone(),
        };

        let from = inner.state.is_active.then(|| inner.state.key());
        let previous_duration = inner.state.window_duration();

        inner.state = ModeState {
            mode,
            submode,
            focus,
            effective,
            is_active: true,
            window_start: Some(Utc::now()),
            window_start_mono: Some(MonotonicInstant::now()),
            productivity_score: 0,
            focus_streak: 0,
        };

        info!(
            from = from.as_ref().map(|k| k.as_str()).unwrap_or("-"),
            to = %key,
            "Mode switched"
        );

        Ok(CoreEvent::ModeSwitched {
            from,
            to: key,
            previous_duration,
        })
    }

    pub fn switch_to_standard_normal(&self) -> Result<CoreEvent> {
        self.switch_to_mode(ModeType::Standard, Some(StandardSubMode::Normal), None, None)
    }

    pub fn switch_to_kids_mode(&self) -> Result<CoreEvent> {
        self.switch_to_mode(ModeType::Kids, None, None, None)
    }

    pub fn switch_to_focus(&self, kind: FocusType) -> Result<CoreEvent> {
        self.switch_to_mode(ModeType::Focus, None, Some(kind), None)
    }

    /// Apply the active policy to one observed sample.
    ///
    /// Looks the app up in the effective config's app sets
    /// (case-insensitive substring match); unlisted apps default to allow,
    /// or to block under strict mode. Side effects go through the host
    /// adapter and failures are swallowed with a log line. A deactivated
    /// controller allows everything.
    pub fn enforce(&self, sample: &WindowSample) -> EnforcementAction {
        let mut inner = match self.inner.lock() {
            Ok(i) => i,
            Err(_) => return EnforcementAction::Allow,
        };

        if !inner.state.is_active {
            return EnforcementAction::Allow;
        }

        let action = decide(&inner.state.effective, &sample.app);

        if inner.state.effective.productivity_target == Some(sample.status) {
            inner.state.productivity_score += 1;
            inner.state.focus_streak += 1;
        } else if inner.state.effective.productivity_target.is_some() {
            inner.state.focus_streak = 0;
        }

        let notify = inner.state.effective.notifications_enabled;
        drop(inner);

        match action {
            EnforcementAction::Allow => {}
            EnforcementAction::Block => {
                if let Err(e) = self.host.block_app(&sample.app) {
                    warn!(app = %sample.app, error = %e, "Failed to block app");
                }
                if notify {
                    self.host
                        .notify("App blocked", &format!("{} is not allowed right now", sample.app));
                }
            }
            EnforcementAction::Minimize => {
                if let Err(e) = self.host.minimize_app(&sample.app) {
                    warn!(app = %sample.app, error = %e, "Failed to minimize app");
                }
            }
        }

        debug!(app = %sample.app, action = ?action, "Enforcement decision");
        action
    }

    /// Point-in-time snapshot of the mode state
    pub fn status(&self) -> ModeStatus {
        let inner = self.inner.lock().expect("mode state lock");
        ModeStatus {
            mode: inner.state.mode,
            submode: inner.state.submode,
            focus: inner.state.focus,
            is_active: inner.state.is_active,
            session_start: inner.state.window_start,
            session_duration: inner.state.window_duration(),
        }
    }

    /// Blocked app set of the effective config
    pub fn blocked_apps(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("mode state lock");
        inner.state.effective.blocked_apps.clone()
    }

    pub fn productivity_score(&self) -> u64 {
        self.inner.lock().expect("mode state lock").state.productivity_score
    }

    pub fn focus_streak(&self) -> u32 {
        self.inner.lock().expect("mode state lock").state.focus_streak
    }

    /// Effective config currently driving enforcement
    pub fn effective_config(&self) -> ModeConfig {
        self.inner.lock().expect("mode state lock").state.effective.clone()
    }

    /// Timer budget of the effective config, if any
    pub fn time_limit(&self) -> Option<Duration> {
        self.inner.lock().expect("mode state lock").state.effective.time_limit
    }

    /// Stop tracking without switching anywhere. Subsequent `enforce`
    /// calls are no-ops until the next switch.
    pub fn deactivate(&self) -> Option<CoreEvent> {
        let mut inner = self.inner.lock().ok()?;
        if !inner.state.is_active {
            return None;
        }

        let key = inner.state.key();
        let duration = inner.state.window_duration().unwrap_or_default();
        inner.state.is_active = false;
        inner.state.window_start = None;
        inner.state.window_start_mono = None;

        info!(mode_key = %key, duration_secs = duration.as_secs(), "Mode deactivated");
        Some(CoreEvent::ModeDeactivated { key, duration })
    }

    // Policy store passthroughs

    pub fn get_mode_config(&self, key: &ModeKey) -> Result<ModeConfig> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        inner
            .policy
            .get(key)
            .cloned()
            .ok_or_else(|| WardenError::ConfigNotFound(key.clone()))
    }

    pub fn list_modes(&self) -> Vec<ModeKey> {
        self.inner.lock().expect("mode state lock").policy.list_modes()
    }

    pub fn list_focus_modes(&self) -> Vec<ModeKey> {
        self.inner.lock().expect("mode state lock").policy.list_focus_modes()
    }

    pub fn create_or_replace_mode(&self, key: ModeKey, config: ModeConfig) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.policy.create_or_replace(key, config).map_err(config_err)
    }

    /// Patch one field of a stored mode config. When the patched key is the
    /// active mode, the effective config is refreshed (per-switch overrides
    /// do not survive a patch).
    pub fn update_mode_setting(
        &self,
        key: &ModeKey,
        field: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.policy.patch(key, field, value).map_err(config_err)?;

        if inner.state.is_active && inner.state.key() == *key {
            if let Some(updated) = inner.policy.get(key).cloned() {
                inner.state.effective = updated;
            }
        }
        Ok(())
    }

    /// Delete a stored mode config. Refused for the active mode.
    pub fn delete_mode(&self, key: &ModeKey) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        if inner.state.is_active && inner.state.key() == *key {
            return Err(WardenError::validation(format!(
                "cannot delete the active mode '{key}'"
            )));
        }
        inner.policy.delete(key).map_err(config_err)
    }

    pub fn backup_mode(&self, key: &ModeKey) -> Result<std::path::PathBuf> {
        let inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.policy.backup(key).map_err(config_err)
    }

    pub fn reset_modes_to_defaults(&self) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| poisoned())?;
        inner.policy.reset_to_defaults().map_err(config_err)?;

        let key = inner.state.key();
        if let Some(updated) = inner.policy.get(&key).cloned() {
            inner.state.effective = updated;
        }
        Ok(())
    }
}

/// Pure allow/block/minimize decision against one config
fn decide(config: &ModeConfig, app: &str) -> EnforcementAction {
    let needle = app.to_lowercase();
    let matches = |set: &[String]| {
        set.iter()
            .any(|entry| needle.contains(&entry.to_lowercase()))
    };

    if matches(&config.blocked_apps) {
        EnforcementAction::Block
    } else if matches(&config.minimized_apps) {
        EnforcementAction::Minimize
    } else if matches(&config.allowed_apps) {
        EnforcementAction::Allow
    } else if config.strict_mode {
        EnforcementAction::Block
    } else {
        EnforcementAction::Allow
    }
}

fn config_err(e: ConfigError) -> WardenError {
    match e {
        ConfigError::NotFound(key) => WardenError::ConfigNotFound(key),
        ConfigError::ValidationFailed { errors } => {
            WardenError::validation(format!("{errors:?}"))
        }
        ConfigError::UnknownField(field) => {
            WardenError::validation(format!("unknown setting field '{field}'"))
        }
        ConfigError::ReadError(e) => WardenError::persistence(e.to_string()),
        ConfigError::ParseError(e) => WardenError::validation(e.to_string()),
        ConfigError::SerializeError(e) => WardenError::persistence(e.to_string()),
        ConfigError::UnsupportedVersion(v) => {
            WardenError::validation(format!("unsupported config version {v}"))
        }
    }
}

fn poisoned() -> WardenError {
    WardenError::internal("mode state lock poisoned")
}
