//! Analytics aggregator
//!
//! Pure derivations over the committed session/sample log. Nothing here
//! holds mutable accumulator state: every figure can be rebuilt from the
//! stored log, so running an aggregation twice yields identical output.

use chrono::{DateTime, Duration as ChronoDuration, Months, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use warden_api::{Category, Session, WindowSample};
use warden_util::{day_of, month_start_of, week_start_of};

/// Cap applied when weighting a sample by the distance to its successor,
/// so long idle gaps do not inflate a single sample.
pub const SAMPLE_WEIGHT_CAP: Duration = Duration::from_secs(30);

/// Derived per-app statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppStatistics {
    pub app_name: String,
    pub total_time: Duration,
    pub session_count: usize,
    pub average_session_duration: Duration,
    pub longest_session: Duration,
    pub last_used: Option<DateTime<Utc>>,
    /// Context (title) changes summed across sessions
    pub contexts: u32,
    /// Status transitions summed across sessions
    pub statuses: u32,
}

/// One app's productive/distracting ranking entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppRanking {
    pub app_name: String,
    pub matching_time: Duration,
    pub total_time: Duration,
    /// matching_time / total_time, 0.0 when the app has no recorded time
    pub ratio: f64,
}

/// Rollup over one calendar bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub bucket_start: NaiveDate,
    pub total_time: Duration,
    pub session_count: usize,
    pub time_by_app: BTreeMap<String, Duration>,
}

/// Overall meta statistics for the whole log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaSummary {
    pub total_time: Duration,
    pub session_count: usize,
    pub distinct_apps: usize,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Calendar bucket granularity for rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

fn window_cutoff(now: DateTime<Utc>, window: Option<Duration>) -> Option<DateTime<Utc>> {
    window.map(|w| now - ChronoDuration::from_std(w).unwrap_or_else(|_| ChronoDuration::zero()))
}

fn in_window(ts: DateTime<Utc>, cutoff: Option<DateTime<Utc>>) -> bool {
    match cutoff {
        Some(c) => ts >= c,
        None => true,
    }
}

/// Total focus time per app, optionally limited to the last `window`
pub fn time_by_app(
    sessions: &[Session],
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> BTreeMap<String, Duration> {
    let cutoff = window_cutoff(now, window);
    let mut by_app: BTreeMap<String, Duration> = BTreeMap::new();
    for s in sessions.iter().filter(|s| in_window(s.start_time, cutoff)) {
        *by_app.entry(s.app_name.clone()).or_default() += s.total_duration;
    }
    by_app
}

/// Weight each sample by the distance to its successor, capped. The last
/// sample carries no weight since its successor is unknown.
fn sample_weights(samples: &[WindowSample]) -> impl Iterator<Item = (&WindowSample, Duration)> {
    samples.windows(2).map(|pair| {
        let weight = (pair[1].timestamp - pair[0].timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(SAMPLE_WEIGHT_CAP);
        (&pair[0], weight)
    })
}

/// Time grouped by window-type tag
pub fn time_by_window_type(
    samples: &[WindowSample],
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> BTreeMap<String, Duration> {
    let cutoff = window_cutoff(now, window);
    let mut by_type: BTreeMap<String, Duration> = BTreeMap::new();
    for (sample, weight) in sample_weights(samples) {
        if in_window(sample.timestamp, cutoff) {
            *by_type.entry(sample.window_type.clone()).or_default() += weight;
        }
    }
    by_type
}

/// Top N window titles by accumulated time
pub fn top_windows(
    samples: &[WindowSample],
    n: usize,
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<(String, Duration)> {
    let cutoff = window_cutoff(now, window);
    let mut by_title: BTreeMap<String, Duration> = BTreeMap::new();
    for (sample, weight) in sample_weights(samples) {
        if in_window(sample.timestamp, cutoff) && !sample.title.is_empty() {
            *by_title.entry(sample.title.clone()).or_default() += weight;
        }
    }

    let mut ranked: Vec<(String, Duration)> = by_title.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Time grouped by productivity status tag
pub fn productivity_summary(
    samples: &[WindowSample],
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> BTreeMap<Category, Duration> {
    let cutoff = window_cutoff(now, window);
    let mut by_status: BTreeMap<Category, Duration> = BTreeMap::new();
    for (sample, weight) in sample_weights(samples) {
        if in_window(sample.timestamp, cutoff) {
            *by_status.entry(sample.status).or_default() += weight;
        }
    }
    by_status
}

/// Rank apps by the share of their time spent in `target` status,
/// descending. Apps with zero matching time are omitted.
pub fn app_ranking(
    samples: &[WindowSample],
    target: Category,
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<AppRanking> {
    let cutoff = window_cutoff(now, window);
    let mut totals: BTreeMap<String, (Duration, Duration)> = BTreeMap::new();
    for (sample, weight) in sample_weights(samples) {
        if !in_window(sample.timestamp, cutoff) {
            continue;
        }
        let entry = totals.entry(sample.app.clone()).or_default();
        entry.1 += weight;
        if sample.status == target {
            entry.0 += weight;
        }
    }

    let mut ranked: Vec<AppRanking> = totals
        .into_iter()
        .filter(|(_, (matching, _))| *matching > Duration::ZERO)
        .map(|(app_name, (matching, total))| AppRanking {
            app_name,
            matching_time: matching,
            total_time: total,
            ratio: if total > Duration::ZERO {
                matching.as_secs_f64() / total.as_secs_f64()
            } else {
                0.0
            },
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.ratio
            .partial_cmp(&a.ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.app_name.cmp(&b.app_name))
    });
    ranked
}

/// Productive-app ranking (share of time in `Productive` status)
pub fn productive_apps(
    samples: &[WindowSample],
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<AppRanking> {
    app_ranking(samples, Category::Productive, window, now)
}

/// Distracting-app ranking (share of time in `Distracting` status)
pub fn distracting_apps(
    samples: &[WindowSample],
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> Vec<AppRanking> {
    app_ranking(samples, Category::Distracting, window, now)
}

/// Per-app statistics derived from the session log.
///
/// Zero-duration sessions count toward `session_count` but are excluded
/// from the average unless `include_zero` is set.
pub fn app_statistics(
    sessions: &[Session],
    include_zero: bool,
) -> BTreeMap<String, AppStatistics> {
    let mut stats: BTreeMap<String, AppStatistics> = BTreeMap::new();
    let mut averaged: BTreeMap<String, (Duration, usize)> = BTreeMap::new();

    for s in sessions {
        let entry = stats
            .entry(s.app_name.clone())
            .or_insert_with(|| AppStatistics {
                app_name: s.app_name.clone(),
                total_time: Duration::ZERO,
                session_count: 0,
                average_session_duration: Duration::ZERO,
                longest_session: Duration::ZERO,
                last_used: None,
                contexts: 0,
                statuses: 0,
            });

        entry.total_time += s.total_duration;
        entry.session_count += 1;
        entry.longest_session = entry.longest_session.max(s.total_duration);
        entry.contexts += s.context_changes;
        entry.statuses += s.status_changes;

        let used_at = s.end_time.unwrap_or(s.start_time);
        entry.last_used = Some(entry.last_used.map_or(used_at, |prev| prev.max(used_at)));

        if include_zero || !s.is_zero_duration() {
            let avg = averaged.entry(s.app_name.clone()).or_default();
            avg.0 += s.total_duration;
            avg.1 += 1;
        }
    }

    for (app, stat) in stats.iter_mut() {
        if let Some((sum, count)) = averaged.get(app) {
            if *count > 0 {
                stat.average_session_duration = *sum / *count as u32;
            }
        }
    }

    stats
}

/// Statistics for a single calendar day (UTC)
pub fn statistics_for_day(
    sessions: &[Session],
    day: NaiveDate,
) -> BTreeMap<String, AppStatistics> {
    let on_day: Vec<Session> = sessions
        .iter()
        .filter(|s| day_of(s.start_time) == day)
        .cloned()
        .collect();
    app_statistics(&on_day, false)
}

fn bucket_of(ts: DateTime<Utc>, period: Period) -> NaiveDate {
    match period {
        Period::Day => day_of(ts),
        Period::Week => week_start_of(ts),
        Period::Month => month_start_of(ts),
    }
}

fn shift_back(bucket: NaiveDate, offset: usize, period: Period) -> NaiveDate {
    match period {
        Period::Day => bucket - ChronoDuration::days(offset as i64),
        Period::Week => bucket - ChronoDuration::weeks(offset as i64),
        Period::Month => bucket - Months::new(offset as u32),
    }
}

/// Roll sessions up into the most recent `count` occupied calendar buckets
/// ending at `now`, oldest first. `offset` shifts the window back by whole
/// calendar buckets whether or not they hold data (offset 1 on Day ends
/// the window at yesterday).
pub fn period_summary(
    sessions: &[Session],
    period: Period,
    count: usize,
    offset: usize,
    now: DateTime<Utc>,
) -> Vec<PeriodSummary> {
    let mut buckets: BTreeMap<NaiveDate, PeriodSummary> = BTreeMap::new();
    for s in sessions {
        let bucket = bucket_of(s.start_time, period);
        let entry = buckets.entry(bucket).or_insert_with(|| PeriodSummary {
            bucket_start: bucket,
            total_time: Duration::ZERO,
            session_count: 0,
            time_by_app: BTreeMap::new(),
        });
        entry.total_time += s.total_duration;
        entry.session_count += 1;
        *entry.time_by_app.entry(s.app_name.clone()).or_default() += s.total_duration;
    }

    let end = shift_back(bucket_of(now, period), offset, period);
    let mut keep: Vec<PeriodSummary> = buckets
        .into_values()
        .filter(|b| b.bucket_start <= end)
        .collect();
    // Most recent last; keep the trailing `count`
    if keep.len() > count {
        keep.drain(..keep.len() - count);
    }
    keep
}

pub fn daily_summary(sessions: &[Session], days: usize, now: DateTime<Utc>) -> Vec<PeriodSummary> {
    period_summary(sessions, Period::Day, days, 0, now)
}

pub fn weekly_summary(
    sessions: &[Session],
    weeks: usize,
    now: DateTime<Utc>,
) -> Vec<PeriodSummary> {
    period_summary(sessions, Period::Week, weeks, 0, now)
}

pub fn monthly_summary(
    sessions: &[Session],
    months: usize,
    now: DateTime<Utc>,
) -> Vec<PeriodSummary> {
    period_summary(sessions, Period::Month, months, 0, now)
}

/// Overall log summary
pub fn meta_summary(sessions: &[Session]) -> MetaSummary {
    let mut apps = std::collections::BTreeSet::new();
    let mut total = Duration::ZERO;
    let mut first = None;
    let mut last = None;

    for s in sessions {
        apps.insert(s.app_name.as_str());
        total += s.total_duration;
        first = Some(first.map_or(s.start_time, |f: DateTime<Utc>| f.min(s.start_time)));
        let end = s.end_time.unwrap_or(s.start_time);
        last = Some(last.map_or(end, |l: DateTime<Utc>| l.max(end)));
    }

    MetaSummary {
        total_time: total,
        session_count: sessions.len(),
        distinct_apps: apps.len(),
        first_seen: first,
        last_seen: last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use warden_util::SessionId;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, hour, 0, 0).unwrap()
    }

    fn session(app: &str, start: DateTime<Utc>, secs: u64) -> Session {
        Session {
            id: SessionId::new(),
            app_name: app.into(),
            start_time: start,
            end_time: Some(start + ChronoDuration::seconds(secs as i64)),
            total_duration: Duration::from_secs(secs),
            context_changes: 2,
            titles_seen: vec![],
            status_changes: 1,
            window_count: 3,
            is_active: false,
        }
    }

    fn sample(app: &str, status: Category, ts: DateTime<Utc>) -> WindowSample {
        WindowSample::new(ts, app, format!("{app} window"), "unknown", status)
    }

    #[test]
    fn time_by_app_sums_sessions() {
        let sessions = vec![
            session("Chrome", at(2, 10), 60),
            session("Chrome", at(2, 11), 30),
            session("Editor", at(2, 12), 100),
        ];

        let by_app = time_by_app(&sessions, None, at(2, 13));
        assert_eq!(by_app["Chrome"], Duration::from_secs(90));
        assert_eq!(by_app["Editor"], Duration::from_secs(100));
    }

    #[test]
    fn time_by_app_honors_window() {
        let sessions = vec![
            session("Chrome", at(1, 10), 60),
            session("Chrome", at(2, 12), 30),
        ];

        let by_app = time_by_app(&sessions, Some(Duration::from_secs(6 * 3600)), at(2, 13));
        assert_eq!(by_app["Chrome"], Duration::from_secs(30));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let sessions = vec![
            session("Chrome", at(2, 10), 60),
            session("Editor", at(2, 12), 100),
        ];

        let first = app_statistics(&sessions, false);
        let second = app_statistics(&sessions, false);
        assert_eq!(first, second);

        let one = daily_summary(&sessions, 7, at(3, 0));
        let two = daily_summary(&sessions, 7, at(3, 0));
        assert_eq!(one, two);
    }

    #[test]
    fn zero_duration_excluded_from_average_but_counted() {
        let sessions = vec![
            session("Chrome", at(2, 10), 0),
            session("Chrome", at(2, 11), 100),
        ];

        let stats = app_statistics(&sessions, false);
        let chrome = &stats["Chrome"];
        assert_eq!(chrome.session_count, 2);
        assert_eq!(chrome.average_session_duration, Duration::from_secs(100));

        let with_zero = app_statistics(&sessions, true);
        assert_eq!(
            with_zero["Chrome"].average_session_duration,
            Duration::from_secs(50)
        );
    }

    #[test]
    fn productivity_summary_weights_samples() {
        let samples = vec![
            sample("Code", Category::Productive, at(2, 10)),
            sample("Code", Category::Productive, at(2, 10) + ChronoDuration::seconds(10)),
            sample("Reddit", Category::Distracting, at(2, 10) + ChronoDuration::seconds(20)),
            sample("Reddit", Category::Distracting, at(2, 10) + ChronoDuration::seconds(30)),
        ];

        let summary = productivity_summary(&samples, None, at(2, 11));
        assert_eq!(summary[&Category::Productive], Duration::from_secs(20));
        assert_eq!(summary[&Category::Distracting], Duration::from_secs(10));
    }

    #[test]
    fn sample_weight_is_capped() {
        let samples = vec![
            sample("Code", Category::Productive, at(2, 10)),
            // Hours later; the first sample must not absorb the idle gap
            sample("Code", Category::Productive, at(2, 14)),
        ];

        let summary = productivity_summary(&samples, None, at(2, 15));
        assert_eq!(summary[&Category::Productive], SAMPLE_WEIGHT_CAP);
    }

    #[test]
    fn rankings_sorted_by_ratio() {
        let base = at(2, 10);
        let mut samples = Vec::new();
        // Code: 30s productive of 30s
        for i in 0..4 {
            samples.push(sample("Code", Category::Productive, base + ChronoDuration::seconds(i * 10)));
        }
        // Chrome: 10s productive of 30s
        samples.push(sample("Chrome", Category::Productive, base + ChronoDuration::seconds(40)));
        samples.push(sample("Chrome", Category::Neutral, base + ChronoDuration::seconds(50)));
        samples.push(sample("Chrome", Category::Neutral, base + ChronoDuration::seconds(60)));
        samples.push(sample("Chrome", Category::Neutral, base + ChronoDuration::seconds(70)));

        let ranked = productive_apps(&samples, None, at(2, 11));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].app_name, "Code");
        assert!(ranked[0].ratio > ranked[1].ratio);
    }

    #[test]
    fn daily_rollup_buckets_by_utc_day() {
        let sessions = vec![
            session("Chrome", at(1, 23), 60),
            session("Chrome", at(2, 0), 30),
        ];

        let rollup = daily_summary(&sessions, 7, at(2, 12));
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].bucket_start, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
        assert_eq!(rollup[0].total_time, Duration::from_secs(60));
        assert_eq!(rollup[1].bucket_start, NaiveDate::from_ymd_opt(2024, 8, 2).unwrap());
    }

    #[test]
    fn weekly_rollup_starts_monday() {
        // 2024-08-02 is a Friday, 2024-08-05 a Monday
        let sessions = vec![
            session("Chrome", at(2, 10), 60),
            session("Chrome", at(5, 10), 30),
        ];

        let rollup = weekly_summary(&sessions, 4, at(6, 0));
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].bucket_start, NaiveDate::from_ymd_opt(2024, 7, 29).unwrap());
        assert_eq!(rollup[1].bucket_start, NaiveDate::from_ymd_opt(2024, 8, 5).unwrap());
    }

    #[test]
    fn offset_drops_most_recent_buckets() {
        let sessions = vec![
            session("Chrome", at(1, 10), 10),
            session("Chrome", at(2, 10), 20),
            session("Chrome", at(3, 10), 30),
        ];

        let shifted = period_summary(&sessions, Period::Day, 7, 1, at(3, 12));
        assert_eq!(shifted.len(), 2);
        assert_eq!(shifted.last().unwrap().bucket_start, NaiveDate::from_ymd_opt(2024, 8, 2).unwrap());
    }

    #[test]
    fn offset_counts_empty_calendar_days() {
        // Only Aug 1 holds data; Aug 2 and 3 are empty calendar days.
        let sessions = vec![session("Chrome", at(1, 10), 10)];

        // Offset 1 from Aug 3 ends the window at Aug 2; Aug 1 survives.
        let shifted = period_summary(&sessions, Period::Day, 7, 1, at(3, 12));
        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted[0].bucket_start, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());

        // Offset 3 ends the window before Aug 1
        assert!(period_summary(&sessions, Period::Day, 7, 3, at(3, 12)).is_empty());
    }

    #[test]
    fn meta_summary_spans_log() {
        let sessions = vec![
            session("Chrome", at(1, 10), 60),
            session("Editor", at(3, 10), 30),
        ];

        let meta = meta_summary(&sessions);
        assert_eq!(meta.session_count, 2);
        assert_eq!(meta.distinct_apps, 2);
        assert_eq!(meta.total_time, Duration::from_secs(90));
        assert_eq!(meta.first_seen, Some(at(1, 10)));
    }
}
