//! File-backed policy store
//!
//! One TOML file holds every mode configuration. All mutating operations
//! validate first, then rewrite the whole file atomically (temp file +
//! rename), so a failed update never leaves a partially-written config.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use warden_util::ModeKey;

use crate::schema::RawModeConfig;
use crate::{
    parse_modes, validate_mode, ConfigError, ConfigResult, ModeConfig, ModeSet,
};

/// Versioned store of mode configurations
pub struct PolicyStore {
    path: PathBuf,
    set: ModeSet,
}

impl PolicyStore {
    /// Open the store at `path`, creating it with default modes when the
    /// file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        if path.exists() {
            let set = crate::load_modes(&path)?;
            info!(path = %path.display(), mode_count = set.modes.len(), "Policy store loaded");
            Ok(Self { path, set })
        } else {
            let mut store = Self {
                path,
                set: default_mode_set(),
            };
            store.save()?;
            info!(path = %store.path.display(), "Policy store created with defaults");
            Ok(store)
        }
    }

    /// In-memory store seeded with defaults (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            set: default_mode_set(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a mode configuration by key
    pub fn get(&self, key: &ModeKey) -> Option<&ModeConfig> {
        self.set.get(key)
    }

    /// List every known mode key
    pub fn list_modes(&self) -> Vec<ModeKey> {
        self.set.keys()
    }

    /// List the focus-type subset of mode keys
    pub fn list_focus_modes(&self) -> Vec<ModeKey> {
        self.set
            .keys()
            .into_iter()
            .filter(|k| k.as_str().starts_with("focus_"))
            .collect()
    }

    /// Create a new mode configuration or fully replace an existing one
    pub fn create_or_replace(&mut self, key: ModeKey, config: ModeConfig) -> ConfigResult<()> {
        let errors = validate_mode(key.as_str(), &config.to_raw());
        if !errors.is_empty() {
            return Err(ConfigError::ValidationFailed { errors });
        }

        self.set.modes.insert(key.clone(), config);
        self.save()?;
        info!(mode_key = %key, "Mode config replaced");
        Ok(())
    }

    /// Patch a single field of an existing mode configuration.
    ///
    /// The patch is applied to a copy and validated before anything is
    /// committed; on any failure the prior config is retained unchanged.
    pub fn patch(
        &mut self,
        key: &ModeKey,
        field: &str,
        value: serde_json::Value,
    ) -> ConfigResult<()> {
        let current = self
            .set
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.clone()))?;

        let mut raw = current.to_raw();
        apply_field(&mut raw, field, value)?;

        let errors = validate_mode(key.as_str(), &raw);
        if !errors.is_empty() {
            return Err(ConfigError::ValidationFailed { errors });
        }

        self.set.modes.insert(key.clone(), ModeConfig::from_raw(raw));
        self.save()?;
        debug!(mode_key = %key, field, "Mode config patched");
        Ok(())
    }

    /// Delete a mode configuration. The caller is responsible for refusing
    /// deletion of the currently active mode.
    pub fn delete(&mut self, key: &ModeKey) -> ConfigResult<()> {
        if self.set.modes.remove(key).is_none() {
            return Err(ConfigError::NotFound(key.clone()));
        }
        self.save()?;
        info!(mode_key = %key, "Mode config deleted");
        Ok(())
    }

    /// Write a point-in-time backup of one mode's config next to the store
    /// file. Returns the backup path.
    pub fn backup(&self, key: &ModeKey) -> ConfigResult<PathBuf> {
        let config = self
            .set
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.clone()))?;

        let mut single = ModeSet::default();
        single.modes.insert(key.clone(), config.clone());

        let stamp = chrono::Utc::now().timestamp();
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let backup_path = dir.join(format!("backup_{}_{}.toml", key.as_str(), stamp));

        let content = toml::to_string_pretty(&single.to_raw())?;
        std::fs::write(&backup_path, content)?;
        info!(mode_key = %key, path = %backup_path.display(), "Mode config backed up");
        Ok(backup_path)
    }

    /// Restore the built-in default mode set, discarding all custom modes
    pub fn reset_to_defaults(&mut self) -> ConfigResult<()> {
        self.set = default_mode_set();
        self.save()?;
        info!("Mode configs reset to defaults");
        Ok(())
    }

    /// Re-read the store file, discarding unsaved in-memory state
    pub fn reload(&mut self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        self.set = crate::load_modes(&self.path)?;
        debug!(mode_count = self.set.modes.len(), "Policy store reloaded");
        Ok(())
    }

    fn save(&mut self) -> ConfigResult<()> {
        // In-memory stores have nothing to flush
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        let content = toml::to_string_pretty(&self.set.to_raw())?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, &content)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(error = %e, "Atomic config rename failed");
            let _ = std::fs::remove_file(&tmp);
            return Err(ConfigError::ReadError(e));
        }
        Ok(())
    }
}

fn apply_field(
    raw: &mut RawModeConfig,
    field: &str,
    value: serde_json::Value,
) -> ConfigResult<()> {
    use serde_json::Value;

    fn bad(field: &str, value: &Value) -> ConfigError {
        ConfigError::ValidationFailed {
            errors: vec![crate::ValidationError::ModeError {
                mode_key: String::new(),
                message: format!("invalid value {value} for field '{field}'"),
            }],
        }
    }

    fn as_string_list(field: &str, value: Value) -> ConfigResult<Vec<String>> {
        match &value {
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(String::from)
                        .ok_or_else(|| bad(field, &value))
                })
                .collect(),
            _ => Err(bad(field, &value)),
        }
    }

    fn as_secs(field: &str, value: Value) -> ConfigResult<Option<u64>> {
        match &value {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_u64().map(Some).ok_or_else(|| bad(field, &value)),
            _ => Err(bad(field, &value)),
        }
    }

    fn as_bool(field: &str, value: Value) -> ConfigResult<bool> {
        value.as_bool().ok_or_else(|| bad(field, &value))
    }

    fn as_opt_string(field: &str, value: Value) -> ConfigResult<Option<String>> {
        match &value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(bad(field, &value)),
        }
    }

    match field {
        "allowed_apps" => raw.allowed_apps = as_string_list(field, value)?,
        "blocked_apps" => raw.blocked_apps = as_string_list(field, value)?,
        "minimized_apps" => raw.minimized_apps = as_string_list(field, value)?,
        "duration_seconds" => raw.duration_seconds = as_secs(field, value)?,
        "screen_time_limit_seconds" => raw.screen_time_limit_seconds = as_secs(field, value)?,
        "time_limit_seconds" => raw.time_limit_seconds = as_secs(field, value)?,
        "strict_mode" => raw.strict_mode = as_bool(field, value)?,
        "notifications_enabled" => raw.notifications_enabled = as_bool(field, value)?,
        "parental_override_required" => raw.parental_override_required = as_bool(field, value)?,
        "screen_time_alerts" => raw.screen_time_alerts = as_bool(field, value)?,
        "achievement_tracking" => raw.achievement_tracking = as_bool(field, value)?,
        "notification_intensity" => {
            let s = as_opt_string(field, value.clone())?.ok_or_else(|| bad(field, &value))?;
            raw.notification_intensity = match s.as_str() {
                "low" => crate::NotificationIntensity::Low,
                "medium" => crate::NotificationIntensity::Medium,
                "high" => crate::NotificationIntensity::High,
                _ => return Err(bad(field, &value)),
            };
        }
        "productivity_target" => raw.productivity_target = as_opt_string(field, value)?,
        "bedtime_start" => raw.bedtime_start = as_opt_string(field, value)?,
        "bedtime_end" => raw.bedtime_end = as_opt_string(field, value)?,
        "educational_time_bonus" => {
            raw.educational_time_bonus = value.as_f64().ok_or_else(|| bad(field, &value))?;
        }
        _ => return Err(ConfigError::UnknownField(field.to_string())),
    }

    Ok(())
}

/// Built-in default mode configurations, mirroring the shipped product set
pub fn default_mode_set() -> ModeSet {
    use std::time::Duration;
    use warden_api::Category;

    let mut set = ModeSet::default();

    set.modes
        .insert(ModeKey::new("standard_normal"), ModeConfig::default());

    set.modes.insert(
        ModeKey::new("standard_work"),
        ModeConfig {
            minimized_apps: vec!["Steam".into(), "Discord".into()],
            productivity_target: Some(Category::Productive),
            ..Default::default()
        },
    );

    set.modes.insert(
        ModeKey::new("standard_leisure"),
        ModeConfig::default(),
    );

    set.modes.insert(
        ModeKey::new("kids"),
        ModeConfig {
            strict_mode: true,
            allowed_apps: vec!["Scratch".into(), "GCompris".into(), "Tux Paint".into()],
            time_limit: Some(Duration::from_secs(2 * 3600)),
            screen_time_limit: Some(Duration::from_secs(3 * 3600)),
            bedtime_start: crate::mode::parse_clock("20:00"),
            bedtime_end: crate::mode::parse_clock("21:30"),
            parental_override_required: true,
            screen_time_alerts: true,
            educational_time_bonus: 1.5,
            achievement_tracking: true,
            ..Default::default()
        },
    );

    set.modes.insert(
        ModeKey::new("focus_deep"),
        ModeConfig {
            strict_mode: true,
            allowed_apps: vec!["Code".into(), "Terminal".into()],
            blocked_apps: vec!["Steam".into(), "Discord".into()],
            minimized_apps: vec!["Slack".into()],
            duration: Some(Duration::from_secs(90 * 60)),
            productivity_target: Some(Category::Productive),
            notification_intensity: crate::NotificationIntensity::Low,
            ..Default::default()
        },
    );

    set.modes.insert(
        ModeKey::new("focus_light"),
        ModeConfig {
            minimized_apps: vec!["Discord".into()],
            duration: Some(Duration::from_secs(45 * 60)),
            productivity_target: Some(Category::Productive),
            ..Default::default()
        },
    );

    set.modes
        .insert(ModeKey::new("focus_custom"), ModeConfig::default());

    set
}

/// Parse a single-mode backup file produced by [`PolicyStore::backup`]
pub fn load_backup(path: impl AsRef<Path>) -> ConfigResult<ModeSet> {
    let content = std::fs::read_to_string(path)?;
    parse_modes(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_temp() -> (tempfile::TempDir, PolicyStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::open(dir.path().join("modes.toml")).unwrap();
        (dir, store)
    }

    #[test]
    fn defaults_are_created_on_first_open() {
        let (_dir, store) = open_temp();
        assert!(store.get(&ModeKey::new("standard_normal")).is_some());
        assert!(store.get(&ModeKey::new("kids")).is_some());
        assert!(store.get(&ModeKey::new("focus_deep")).is_some());
    }

    #[test]
    fn focus_modes_are_the_focus_subset() {
        let (_dir, store) = open_temp();
        let focus = store.list_focus_modes();
        assert!(focus.iter().all(|k| k.as_str().starts_with("focus_")));
        assert_eq!(focus.len(), 3);
    }

    #[test]
    fn patch_roundtrips_through_disk() {
        let (dir, mut store) = open_temp();
        let key = ModeKey::new("focus_deep");

        store
            .patch(&key, "time_limit_seconds", json!(1800))
            .unwrap();

        let reloaded = PolicyStore::open(dir.path().join("modes.toml")).unwrap();
        assert_eq!(
            reloaded.get(&key).unwrap().time_limit,
            Some(std::time::Duration::from_secs(1800))
        );
    }

    #[test]
    fn failed_patch_retains_prior_config() {
        let (dir, mut store) = open_temp();
        let key = ModeKey::new("focus_deep");
        let before = store.get(&key).unwrap().clone();
        let on_disk_before = std::fs::read_to_string(dir.path().join("modes.toml")).unwrap();

        // Overlap with allowed_apps ("Code") must be rejected
        let result = store.patch(&key, "blocked_apps", json!(["Code"]));
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));

        assert_eq!(store.get(&key).unwrap(), &before);
        let on_disk_after = std::fs::read_to_string(dir.path().join("modes.toml")).unwrap();
        assert_eq!(on_disk_before, on_disk_after);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (_dir, mut store) = open_temp();
        let result = store.patch(&ModeKey::new("kids"), "no_such_field", json!(1));
        assert!(matches!(result, Err(ConfigError::UnknownField(_))));
    }

    #[test]
    fn delete_unknown_mode_fails() {
        let (_dir, mut store) = open_temp();
        let result = store.delete(&ModeKey::new("missing"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn backup_is_reloadable() {
        let (_dir, store) = open_temp();
        let key = ModeKey::new("kids");
        let path = store.backup(&key).unwrap();

        let restored = load_backup(&path).unwrap();
        assert_eq!(restored.get(&key), store.get(&key));
    }

    #[test]
    fn reset_restores_defaults() {
        let (_dir, mut store) = open_temp();
        let key = ModeKey::new("custom_mode");
        store
            .create_or_replace(key.clone(), ModeConfig::default())
            .unwrap();
        assert!(store.get(&key).is_some());

        store.reset_to_defaults().unwrap();
        assert!(store.get(&key).is_none());
        assert!(store.get(&ModeKey::new("standard_normal")).is_some());
    }
}
