//! Enforcement timer
//!
//! Budget countdown with phases IDLE -> RUNNING -> WARNING -> TRIGGERED ->
//! IDLE. Each `start` spawns a fresh checker task carrying a generation
//! number; bumping the generation invalidates older runs, so a restart or
//! stop can never leave a stale task that still fires. The power action is
//! dispatched without holding the state lock.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use warden_api::{PowerAction, TimerDayEntry, TimerPhase, TimerStatus};
use warden_host_api::HostAdapter;
use warden_store::Store;
use warden_util::{day_of, MonotonicInstant, Result, WardenError};

/// Timer tuning and the passcode secret
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Cadence of the budget check
    pub tick: Duration,

    /// How long before the limit the warning fires
    pub warning_lead: Duration,

    /// Secret accepted by `unlock`. None rejects every code.
    pub passcode: Option<String>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            warning_lead: Duration::from_secs(60),
            passcode: None,
        }
    }
}

struct TimerState {
    phase: TimerPhase,
    started_at: Option<MonotonicInstant>,
    time_limit: Duration,
    action: PowerAction,
    is_warning_enabled: bool,
    grace: Duration,
    warned: bool,
}

impl TimerState {
    fn idle() -> Self {
        Self {
            phase: TimerPhase::Idle,
            started_at: None,
            time_limit: Duration::ZERO,
            action: PowerAction::Sleep,
            is_warning_enabled: false,
            grace: Duration::ZERO,
            warned: false,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started_at.map(|s| s.elapsed()).unwrap_or_default()
    }
}

/// The enforcement timer
pub struct EnforcementTimer {
    state: Arc<Mutex<TimerState>>,
    generation: Arc<AtomicU64>,
    store: Arc<dyn Store>,
    host: Arc<dyn HostAdapter>,
    config: TimerConfig,
}

impl EnforcementTimer {
    pub fn new(store: Arc<dyn Store>, host: Arc<dyn HostAdapter>, config: TimerConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::idle())),
            generation: Arc::new(AtomicU64::new(0)),
            store,
            host,
            config,
        }
    }

    /// Begin a new run. A run already in progress is replaced: its checker
    /// task is invalidated and can no longer warn or trigger.
    pub fn start(
        &self,
        time_limit: Duration,
        action: PowerAction,
        is_warning: bool,
        grace: Duration,
    ) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = self.state.lock().expect("timer state lock");
            if state.phase != TimerPhase::Idle {
                debug!("Replacing running enforcement timer");
            }
            *state = TimerState {
                phase: TimerPhase::Running,
                started_at: Some(MonotonicInstant::now()),
                time_limit,
                action,
                is_warning_enabled: is_warning,
                grace,
                warned: false,
            };
        }

        info!(
            time_limit_secs = time_limit.as_secs(),
            action = action.as_str(),
            grace_secs = grace.as_secs(),
            "Enforcement timer started"
        );

        tokio::spawn(run_checker(
            self.state.clone(),
            self.generation.clone(),
            generation,
            self.store.clone(),
            self.host.clone(),
            self.config.clone(),
        ));
    }

    /// Cancel the current run. No-op when IDLE or already TRIGGERED.
    pub fn stop(&self) {
        let mut state = self.state.lock().expect("timer state lock");
        match state.phase {
            TimerPhase::Running | TimerPhase::Warning => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                *state = TimerState::idle();
                info!("Enforcement timer stopped");
            }
            TimerPhase::Idle | TimerPhase::Triggered => {}
        }
    }

    /// Elapsed time of the current run; zero when idle
    pub fn elapsed(&self) -> Duration {
        self.state.lock().expect("timer state lock").elapsed()
    }

    /// Point-in-time snapshot
    pub fn status(&self) -> TimerStatus {
        let state = self.state.lock().expect("timer state lock");
        TimerStatus {
            phase: state.phase,
            is_timing: matches!(state.phase, TimerPhase::Running | TimerPhase::Warning),
            elapsed: state.elapsed(),
            time_limit: state.time_limit,
            action: state.action,
            is_warning: state.is_warning_enabled,
        }
    }

    /// Clear today's `requires_passcode` flag when the code matches.
    ///
    /// Other days are never touched and a running timer keeps running.
    pub fn unlock(&self, code: &str) -> Result<()> {
        let expected = self
            .config
            .passcode
            .as_deref()
            .ok_or(WardenError::PasscodeMismatch)?;
        if code != expected {
            warn!("Passcode unlock rejected");
            return Err(WardenError::PasscodeMismatch);
        }

        let today = day_of(Utc::now());
        let cleared = self
            .store
            .set_requires_passcode(today, false)
            .map_err(|e| WardenError::persistence(e.to_string()))?;

        info!(day = %today, cleared, "Passcode unlock accepted");
        Ok(())
    }

    /// Day-keyed trigger history
    pub fn history(
        &self,
    ) -> Result<std::collections::BTreeMap<chrono::NaiveDate, TimerDayEntry>> {
        self.store
            .load_timer_history()
            .map_err(|e| WardenError::persistence(e.to_string()))
    }

    pub fn clear_history(&self) -> Result<()> {
        self.store
            .clear_timer_history()
            .map_err(|e| WardenError::persistence(e.to_string()))
    }

    /// Direct power-action dispatch, bypassing the countdown
    pub async fn power_action(&self, action: PowerAction, delay: Duration) -> Result<()> {
        self.host
            .execute_power_action(action, delay)
            .await
            .map_err(|e| WardenError::host(e.to_string()))
    }

    /// Best-effort notification passthrough
    pub fn notify(&self, title: &str, message: &str) {
        self.host.notify(title, message);
    }
}

async fn run_checker(
    state: Arc<Mutex<TimerState>>,
    generation: Arc<AtomicU64>,
    my_generation: u64,
    store: Arc<dyn Store>,
    host: Arc<dyn HostAdapter>,
    config: TimerConfig,
) {
    loop {
        tokio::time::sleep(config.tick).await;

        if generation.load(Ordering::SeqCst) != my_generation {
            return;
        }

        enum Due {
            Nothing,
            Warn { remaining: Duration },
            Trigger { action: PowerAction },
        }

        let due = {
            let mut state = state.lock().expect("timer state lock");
            // Re-check under the lock; stop() bumps before resetting
            if generation.load(Ordering::SeqCst) != my_generation {
                return;
            }

            let elapsed = state.elapsed();
            if elapsed >= state.time_limit + state.grace {
                state.phase = TimerPhase::Triggered;
                Due::Trigger {
                    action: state.action,
                }
            } else if state.is_warning_enabled
                && !state.warned
                && elapsed >= state.time_limit.saturating_sub(config.warning_lead)
            {
                // A limit shorter than the lead warns from the first tick
                state.warned = true;
                state.phase = TimerPhase::Warning;
                Due::Warn {
                    remaining: state.time_limit.saturating_sub(elapsed) + state.grace,
                }
            } else {
                Due::Nothing
            }
        };

        match due {
            Due::Nothing => {}
            Due::Warn { remaining } => {
                info!(remaining_secs = remaining.as_secs(), "Enforcement warning");
                host.notify(
                    "Time limit approaching",
                    &format!("{} seconds remaining", remaining.as_secs()),
                );
            }
            Due::Trigger { action } => {
                info!(action = action.as_str(), "Enforcement timer triggered");

                // Grace was consumed by the countdown; dispatch immediately
                // and do not await completion semantics beyond the call.
                if let Err(e) = host.execute_power_action(action, Duration::ZERO).await {
                    error!(action = action.as_str(), error = %e, "Power action failed");
                }

                let today = day_of(Utc::now());
                let entry = TimerDayEntry {
                    triggered: true,
                    requires_passcode: true,
                };
                if let Err(e) = store.set_timer_day(today, &entry) {
                    warn!(error = %e, "Failed to record enforcement trigger");
                }

                let mut state = state.lock().expect("timer state lock");
                if generation.load(Ordering::SeqCst) == my_generation {
                    *state = TimerState::idle();
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_host_api::MockHost;
    use warden_store::SqliteStore;

    fn timer_with(config: TimerConfig) -> (EnforcementTimer, Arc<MockHost>, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let host = Arc::new(MockHost::new());
        (
            EnforcementTimer::new(store.clone(), host.clone(), config),
            host,
            store,
        )
    }

    fn fast_config() -> TimerConfig {
        TimerConfig {
            tick: Duration::from_millis(5),
            warning_lead: Duration::from_millis(40),
            passcode: Some("1234".into()),
        }
    }

    #[tokio::test]
    async fn full_run_warns_then_triggers_once() {
        let (timer, host, store) = timer_with(fast_config());

        timer.start(
            Duration::from_millis(100),
            PowerAction::Sleep,
            true,
            Duration::from_millis(40),
        );
        assert_eq!(timer.status().phase, TimerPhase::Running);

        tokio::time::sleep(Duration::from_millis(250)).await;

        // Exactly one dispatch, then back to idle
        assert_eq!(host.power_calls().len(), 1);
        assert_eq!(host.power_calls()[0].action, PowerAction::Sleep);
        assert_eq!(timer.status().phase, TimerPhase::Idle);

        // Warning fired once on the way
        assert_eq!(host.notifications().len(), 1);

        // History records today as triggered and locked
        let today = day_of(Utc::now());
        let entry = store.get_timer_day(today).unwrap().unwrap();
        assert!(entry.triggered);
        assert!(entry.requires_passcode);
    }

    #[tokio::test]
    async fn stop_before_trigger_prevents_dispatch() {
        let (timer, host, _store) = timer_with(fast_config());

        timer.start(
            Duration::from_millis(100),
            PowerAction::Shutdown,
            false,
            Duration::from_millis(40),
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        timer.stop();
        assert_eq!(timer.status().phase, TimerPhase::Idle);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(host.power_calls().is_empty());
    }

    #[tokio::test]
    async fn restart_replaces_run_without_double_trigger() {
        let (timer, host, _store) = timer_with(fast_config());

        timer.start(
            Duration::from_millis(60),
            PowerAction::Shutdown,
            false,
            Duration::ZERO,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Replace before the first run fires
        timer.start(
            Duration::from_millis(80),
            PowerAction::Sleep,
            false,
            Duration::ZERO,
        );

        tokio::time::sleep(Duration::from_millis(250)).await;

        // Only the new run triggered
        let calls = host.power_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, PowerAction::Sleep);
    }

    #[tokio::test]
    async fn short_budget_still_warns_before_trigger() {
        let (timer, host, _store) = timer_with(fast_config());

        // Limit shorter than the 40ms warning lead; the grace window keeps
        // the run alive long enough to observe the warning.
        timer.start(
            Duration::from_millis(20),
            PowerAction::Sleep,
            true,
            Duration::from_millis(100),
        );
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(host.notifications().len(), 1);
        assert_eq!(host.power_calls().len(), 1);
        assert_eq!(timer.status().phase, TimerPhase::Idle);
    }

    #[tokio::test]
    async fn stop_when_idle_is_noop() {
        let (timer, host, _store) = timer_with(fast_config());
        timer.stop();
        assert_eq!(timer.status().phase, TimerPhase::Idle);
        assert!(host.power_calls().is_empty());
    }

    #[tokio::test]
    async fn warning_disabled_goes_straight_to_trigger() {
        let (timer, host, _store) = timer_with(fast_config());

        timer.start(
            Duration::from_millis(60),
            PowerAction::Sleep,
            false,
            Duration::ZERO,
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(host.notifications().is_empty());
        assert_eq!(host.power_calls().len(), 1);
    }

    #[tokio::test]
    async fn elapsed_is_queryable_while_running() {
        let (timer, _host, _store) = timer_with(fast_config());

        timer.start(
            Duration::from_secs(60),
            PowerAction::Sleep,
            false,
            Duration::ZERO,
        );
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(timer.elapsed() >= Duration::from_millis(20));
        assert!(timer.status().is_timing);
        timer.stop();
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn unlock_clears_today_only() {
        let (timer, _host, store) = timer_with(fast_config());

        let today = day_of(Utc::now());
        let yesterday = today.pred_opt().unwrap();
        let locked = TimerDayEntry {
            triggered: true,
            requires_passcode: true,
        };
        store.set_timer_day(today, &locked).unwrap();
        store.set_timer_day(yesterday, &locked).unwrap();

        timer.unlock("1234").unwrap();

        assert!(!store.get_timer_day(today).unwrap().unwrap().requires_passcode);
        assert!(store.get_timer_day(yesterday).unwrap().unwrap().requires_passcode);
    }

    #[tokio::test]
    async fn wrong_passcode_is_rejected() {
        let (timer, _host, store) = timer_with(fast_config());

        let today = day_of(Utc::now());
        store
            .set_timer_day(
                today,
                &TimerDayEntry {
                    triggered: true,
                    requires_passcode: true,
                },
            )
            .unwrap();

        let err = timer.unlock("0000").unwrap_err();
        assert_eq!(err.kind(), "passcode_mismatch");
        assert!(store.get_timer_day(today).unwrap().unwrap().requires_passcode);
    }

    #[tokio::test]
    async fn unlock_never_stops_a_running_timer() {
        let (timer, _host, _store) = timer_with(fast_config());

        timer.start(
            Duration::from_secs(60),
            PowerAction::Sleep,
            false,
            Duration::ZERO,
        );
        timer.unlock("1234").unwrap();
        assert!(timer.status().is_timing);
        timer.stop();
    }

    #[tokio::test]
    async fn power_failure_is_surfaced_but_timer_recovers() {
        let (timer, host, store) = timer_with(fast_config());
        host.set_fail_power(true);

        timer.start(
            Duration::from_millis(40),
            PowerAction::Shutdown,
            false,
            Duration::ZERO,
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Dispatch failed but the day is still recorded and the timer idles
        assert_eq!(timer.status().phase, TimerPhase::Idle);
        let today = day_of(Utc::now());
        assert!(store.get_timer_day(today).unwrap().unwrap().triggered);
    }

    #[tokio::test]
    async fn history_passthrough_round_trip() {
        let (timer, _host, store) = timer_with(fast_config());

        let today = day_of(Utc::now());
        store
            .set_timer_day(
                today,
                &TimerDayEntry {
                    triggered: true,
                    requires_passcode: false,
                },
            )
            .unwrap();

        assert_eq!(timer.history().unwrap().len(), 1);
        timer.clear_history().unwrap();
        assert!(timer.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn direct_power_action_passthrough() {
        let (timer, host, _store) = timer_with(fast_config());
        timer
            .power_action(PowerAction::Reboot, Duration::from_secs(5))
            .await
            .unwrap();

        let calls = host.power_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, PowerAction::Reboot);
        assert_eq!(calls[0].delay, Duration::from_secs(5));
    }
}
