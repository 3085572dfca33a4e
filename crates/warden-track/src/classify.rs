//! Productivity classifier
//!
//! Resolves an app name to a productivity category through a fixed
//! precedence chain: manual override, then substring rule, then cached
//! provider verdict, then a live provider lookup (whose answer is cached),
//! then `Unclassified`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_api::Category;

/// External classification backend. Implementations are expected to be
/// slow and fallible; verdicts are cached so each app is asked at most
/// once until the cache is cleared.
pub trait AiClassifier: Send + Sync {
    fn classify(&self, app: &str, title: &str) -> Option<Category>;
    fn name(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to read rules file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse rules file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Serialized rule state
#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: BTreeMap<String, Category>,
    #[serde(default)]
    overrides: BTreeMap<String, Category>,
    #[serde(default)]
    ai_cache: BTreeMap<String, Category>,
}

/// Counts per classification source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifierStats {
    pub rules: usize,
    pub overrides: usize,
    pub cached: usize,
}

/// Rule-driven classifier with optional AI fallback
pub struct Classifier {
    rules: BTreeMap<String, Category>,
    overrides: BTreeMap<String, Category>,
    ai_cache: BTreeMap<String, Category>,
    provider: Option<Box<dyn AiClassifier>>,
    path: Option<PathBuf>,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            overrides: BTreeMap::new(),
            ai_cache: BTreeMap::new(),
            provider: None,
            path: None,
        }
    }

    /// Load classifier state from `path`, starting empty when the file
    /// does not exist yet. Later mutations are persisted back to it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClassifyError> {
        let path = path.into();
        let mut classifier = Self::new();
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let file: RuleFile = serde_json::from_str(&raw)?;
            classifier.rules = file.rules;
            classifier.overrides = file.overrides;
            classifier.ai_cache = file.ai_cache;
            info!(
                path = %path.display(),
                rules = classifier.rules.len(),
                overrides = classifier.overrides.len(),
                "Classifier rules loaded"
            );
        }
        classifier.path = Some(path);
        Ok(classifier)
    }

    pub fn with_provider(mut self, provider: Box<dyn AiClassifier>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Classify one focused-window observation. Overrides and cache hits
    /// are exact app-name matches (case-insensitive); rules match as a
    /// case-insensitive substring of the app name.
    pub fn classify(&mut self, app: &str, title: &str) -> Category {
        let key = app.to_lowercase();

        if let Some(status) = self.overrides.get(&key) {
            return *status;
        }

        for (pattern, status) in &self.rules {
            if key.contains(pattern.as_str()) {
                return *status;
            }
        }

        if let Some(status) = self.ai_cache.get(&key) {
            return *status;
        }

        if let Some(provider) = &self.provider {
            if let Some(status) = provider.classify(app, title) {
                debug!(app, status = status.as_str(), provider = provider.name(), "Cached provider verdict");
                self.ai_cache.insert(key, status);
                self.save();
                return status;
            }
        }

        Category::Unclassified
    }

    /// Add or replace a substring rule
    pub fn add_rule(&mut self, pattern: &str, status: Category) {
        self.rules.insert(pattern.to_lowercase(), status);
        self.save();
    }

    pub fn remove_rule(&mut self, pattern: &str) -> bool {
        let removed = self.rules.remove(&pattern.to_lowercase()).is_some();
        if removed {
            self.save();
        }
        removed
    }

    /// Pin an exact app name to a category, winning over every other source
    pub fn add_override(&mut self, app: &str, status: Category) {
        self.overrides.insert(app.to_lowercase(), status);
        self.save();
    }

    pub fn remove_override(&mut self, app: &str) -> bool {
        let removed = self.overrides.remove(&app.to_lowercase()).is_some();
        if removed {
            self.save();
        }
        removed
    }

    /// Drop cached provider verdicts, forcing re-classification
    pub fn clear_cached(&mut self) -> usize {
        let n = self.ai_cache.len();
        self.ai_cache.clear();
        self.save();
        n
    }

    pub fn stats(&self) -> ClassifierStats {
        ClassifierStats {
            rules: self.rules.len(),
            overrides: self.overrides.len(),
            cached: self.ai_cache.len(),
        }
    }

    pub fn rules(&self) -> &BTreeMap<String, Category> {
        &self.rules
    }

    pub fn overrides(&self) -> &BTreeMap<String, Category> {
        &self.overrides
    }

    /// Export rules and overrides (not the cache) as a JSON document
    pub fn export_rules(&self) -> Result<String, ClassifyError> {
        let file = RuleFile {
            rules: self.rules.clone(),
            overrides: self.overrides.clone(),
            ai_cache: BTreeMap::new(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Merge rules and overrides from an exported JSON document.
    /// Imported entries win on collision. Returns how many were added
    /// or replaced.
    pub fn import_rules(&mut self, json: &str) -> Result<usize, ClassifyError> {
        let file: RuleFile = serde_json::from_str(json)?;
        let count = file.rules.len() + file.overrides.len();
        self.rules.extend(file.rules);
        self.overrides.extend(file.overrides);
        self.save();
        Ok(count)
    }

    fn save(&self) {
        let Some(path) = &self.path else { return };
        if let Err(e) = self.write_to(path) {
            warn!(path = %path.display(), error = %e, "Failed to persist classifier rules");
        }
    }

    fn write_to(&self, path: &Path) -> Result<(), ClassifyError> {
        let file = RuleFile {
            rules: self.rules.clone(),
            overrides: self.overrides.clone(),
            ai_cache: self.ai_cache.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
