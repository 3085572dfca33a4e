//! Window samples and productivity categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Productivity category assigned to a sample or resource.
///
/// `Unclassified` is the fall-through when no override, rule, or cached
/// verdict matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Productive,
    Neutral,
    Distracting,
    Unclassified,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Productive => "productive",
            Category::Neutral => "neutral",
            Category::Distracting => "distracting",
            Category::Unclassified => "unclassified",
        }
    }

    /// Parse a category name; unknown names map to `Unclassified`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "productive" => Category::Productive,
            "neutral" => Category::Neutral,
            "distracting" => Category::Distracting,
            _ => Category::Unclassified,
        }
    }
}

/// One observation of the focused application/window.
///
/// Immutable once created; produced at the observer's sampling interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSample {
    pub timestamp: DateTime<Utc>,

    /// Application identifier (process/friendly name)
    pub app: String,

    /// Window title at capture time
    pub title: String,

    /// Window-type tag (e.g. "browser", "editor", "unknown")
    pub window_type: String,

    /// Productivity status tag assigned by the classifier
    pub status: Category,
}

impl WindowSample {
    pub fn new(
        timestamp: DateTime<Utc>,
        app: impl Into<String>,
        title: impl Into<String>,
        window_type: impl Into<String>,
        status: Category,
    ) -> Self {
        Self {
            timestamp,
            app: app.into(),
            title: title.into(),
            window_type: window_type.into(),
            status,
        }
    }
}
