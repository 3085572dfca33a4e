//! Session segmentation
//!
//! Converts the raw sample stream into bounded sessions. A session rotates
//! when the focused app changes or when the gap since the last real sample
//! exceeds the configured threshold, the gap rule applying even when the
//! app is unchanged. Null samples (observer failures) never close a session
//! by themselves; the gap is always measured between real samples.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, trace};
use warden_api::{Category, Session, WindowSample, MAX_TITLES_PER_SESSION};
use warden_util::SessionId;

/// Default gap after which a new session starts
pub const DEFAULT_SESSION_GAP: Duration = Duration::from_secs(30);

/// Segmenter tuning
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Gap between real samples that forces a session rotation
    pub session_gap: Duration,

    /// Cap on distinct titles remembered per session
    pub max_titles: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            session_gap: DEFAULT_SESSION_GAP,
            max_titles: MAX_TITLES_PER_SESSION,
        }
    }
}

struct OpenSession {
    session: Session,
    last_sample_at: DateTime<Utc>,
    last_title: String,
    last_status: Category,
}

/// Stateful segmenter holding at most one open session
pub struct SessionSegmenter {
    config: SegmenterConfig,
    open: Option<OpenSession>,
}

impl SessionSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config, open: None }
    }

    /// Feed one sample. Returns the previously open session when this
    /// sample closed it.
    pub fn push(&mut self, sample: &WindowSample) -> Option<Session> {
        let open = match self.open.as_mut() {
            None => {
                self.open = Some(Self::open_session(sample, self.config.max_titles));
                return None;
            }
            Some(open) => open,
        };

        let gap = (sample.timestamp - open.last_sample_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        let app_changed = sample.app != open.session.app_name;
        if app_changed || gap > self.config.session_gap {
            let last_at = open.last_sample_at;
            let closed = self.close_open(last_at);
            debug!(
                app = %closed.as_ref().map(|s| s.app_name.as_str()).unwrap_or(""),
                gap_secs = gap.as_secs(),
                app_changed,
                "Session rotated"
            );
            self.open = Some(Self::open_session(sample, self.config.max_titles));
            return closed;
        }

        // Extend the open session
        open.last_sample_at = sample.timestamp;
        open.session.total_duration = (sample.timestamp - open.session.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO);
        open.session.window_count += 1;

        if sample.title != open.last_title {
            open.session.context_changes += 1;
            if !open.session.titles_seen.contains(&sample.title)
                && open.session.titles_seen.len() < self.config.max_titles
            {
                open.session.titles_seen.push(sample.title.clone());
            }
            open.last_title = sample.title.clone();
        }

        if sample.status != open.last_status {
            open.session.status_changes += 1;
            open.last_status = sample.status;
        }

        trace!(app = %open.session.app_name, windows = open.session.window_count, "Session extended");
        None
    }

    /// Current open session, if any
    pub fn current(&self) -> Option<&Session> {
        self.open.as_ref().map(|o| &o.session)
    }

    /// Close the open session cleanly and reset internal state. The caller
    /// persists the returned session.
    pub fn quick_restart(&mut self) -> Option<Session> {
        let last = self.open.as_ref().map(|o| o.last_sample_at)?;
        self.close_open(last)
    }

    /// Change the gap threshold. The open session is left untouched.
    pub fn set_session_gap(&mut self, gap: Duration) {
        self.config.session_gap = gap;
    }

    pub fn session_gap(&self) -> Duration {
        self.config.session_gap
    }

    fn close_open(&mut self, end_at: DateTime<Utc>) -> Option<Session> {
        let open = self.open.take()?;
        let mut session = open.session;
        session.end_time = Some(end_at);
        session.total_duration = (end_at - session.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO);
        session.is_active = false;
        Some(session)
    }

    fn open_session(sample: &WindowSample, max_titles: usize) -> OpenSession {
        let mut titles_seen = Vec::with_capacity(max_titles.min(4));
        if !sample.title.is_empty() {
            titles_seen.push(sample.title.clone());
        }

        OpenSession {
            session: Session {
                id: SessionId::new(),
                app_name: sample.app.clone(),
                start_time: sample.timestamp,
                end_time: None,
                total_duration: Duration::ZERO,
                context_changes: 0,
                titles_seen,
                status_changes: 0,
                window_count: 1,
                is_active: true,
            },
            last_sample_at: sample.timestamp,
            last_title: sample.title.clone(),
            last_status: sample.status,
        }
    }
}

impl Default for SessionSegmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 2, 10, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn sample(app: &str, title: &str, secs: i64) -> WindowSample {
        WindowSample::new(at(secs), app, title, "unknown", Category::Unclassified)
    }

    #[test]
    fn constant_app_yields_one_session_spanning_samples() {
        let mut seg = SessionSegmenter::default();
        for t in [0, 10, 20, 30] {
            assert!(seg.push(&sample("Chrome", "tab", t)).is_none());
        }

        let open = seg.current().unwrap();
        assert!(open.is_active);
        assert_eq!(open.total_duration, Duration::from_secs(30));
        assert_eq!(open.window_count, 4);
    }

    #[test]
    fn chrome_then_editor_scenario() {
        // Three Chrome samples 30s apart (exactly at the gap threshold,
        // which does not rotate), then an Editor sample.
        let mut seg = SessionSegmenter::default();
        assert!(seg.push(&sample("Chrome", "a", 0)).is_none());
        assert!(seg.push(&sample("Chrome", "a", 30)).is_none());
        assert!(seg.push(&sample("Chrome", "a", 60)).is_none());

        let closed = seg.push(&sample("Editor", "main.rs", 90)).unwrap();
        assert_eq!(closed.app_name, "Chrome");
        assert_eq!(closed.total_duration, Duration::from_secs(60));
        assert_eq!(closed.window_count, 3);
        assert!(!closed.is_active);
        assert_eq!(closed.end_time, Some(at(60)));

        let open = seg.current().unwrap();
        assert_eq!(open.app_name, "Editor");
        assert!(open.is_active);
    }

    #[test]
    fn gap_rotates_even_for_same_app() {
        let mut seg = SessionSegmenter::default();
        assert!(seg.push(&sample("Chrome", "a", 0)).is_none());
        assert!(seg.push(&sample("Chrome", "a", 20)).is_none());

        // 31s gap exceeds the 30s threshold
        let closed = seg.push(&sample("Chrome", "a", 51)).unwrap();
        assert_eq!(closed.app_name, "Chrome");
        assert_eq!(closed.end_time, Some(at(20)));
        assert_eq!(closed.total_duration, Duration::from_secs(20));

        // No overlap, no double-counted time
        let open = seg.current().unwrap();
        assert_eq!(open.start_time, at(51));
    }

    #[test]
    fn title_changes_tracked_and_deduped() {
        let mut seg = SessionSegmenter::default();
        seg.push(&sample("Chrome", "a", 0));
        seg.push(&sample("Chrome", "b", 1));
        seg.push(&sample("Chrome", "a", 2));
        seg.push(&sample("Chrome", "a", 3));

        let open = seg.current().unwrap();
        assert_eq!(open.context_changes, 2);
        assert_eq!(open.titles_seen, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn title_history_is_capped() {
        let mut seg = SessionSegmenter::new(SegmenterConfig {
            max_titles: 3,
            ..Default::default()
        });
        for i in 0..10 {
            seg.push(&sample("Chrome", &format!("t{i}"), i));
        }

        let open = seg.current().unwrap();
        assert_eq!(open.titles_seen.len(), 3);
        assert_eq!(open.context_changes, 9);
    }

    #[test]
    fn status_changes_counted() {
        let mut seg = SessionSegmenter::default();
        let mut s = sample("Chrome", "a", 0);
        s.status = Category::Productive;
        seg.push(&s);
        let mut s = sample("Chrome", "a", 1);
        s.status = Category::Distracting;
        seg.push(&s);

        assert_eq!(seg.current().unwrap().status_changes, 1);
    }

    #[test]
    fn zero_duration_session_is_kept() {
        let mut seg = SessionSegmenter::default();
        seg.push(&sample("Flash", "x", 0));
        let closed = seg.push(&sample("Editor", "y", 1)).unwrap();

        assert_eq!(closed.app_name, "Flash");
        assert!(closed.is_zero_duration());
    }

    #[test]
    fn quick_restart_closes_and_resets() {
        let mut seg = SessionSegmenter::default();
        seg.push(&sample("Chrome", "a", 0));
        seg.push(&sample("Chrome", "a", 10));

        let closed = seg.quick_restart().unwrap();
        assert_eq!(closed.app_name, "Chrome");
        assert_eq!(closed.total_duration, Duration::from_secs(10));
        assert!(seg.current().is_none());

        // Nothing left to close
        assert!(seg.quick_restart().is_none());
    }

    #[test]
    fn gap_threshold_change_leaves_open_session() {
        let mut seg = SessionSegmenter::default();
        seg.push(&sample("Chrome", "a", 0));
        seg.set_session_gap(Duration::from_secs(60));
        assert!(seg.current().is_some());

        // 45s gap now tolerated
        assert!(seg.push(&sample("Chrome", "a", 45)).is_none());
    }
}
