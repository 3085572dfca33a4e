//! Mock host adapter for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use warden_api::{PowerAction, WindowSample};

use crate::{HostAdapter, HostError, HostResult};

/// Record of a power action dispatched through the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerCall {
    pub action: PowerAction,
    pub delay: Duration,
}

/// Mock host adapter for unit/integration testing.
///
/// Scripted snapshots are consumed front-to-back; once the script is
/// exhausted `snapshot` returns `None`, matching a host that has lost the
/// focused window.
#[derive(Default)]
pub struct MockHost {
    snapshots: Mutex<VecDeque<Option<WindowSample>>>,
    notifications: Mutex<Vec<(String, String)>>,
    power_calls: Mutex<Vec<PowerCall>>,
    blocked: Mutex<Vec<String>>,
    minimized: Mutex<Vec<String>>,
    fail_power: Mutex<bool>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a snapshot result to be returned by the next `snapshot` call
    pub fn push_snapshot(&self, sample: Option<WindowSample>) {
        self.snapshots.lock().unwrap().push_back(sample);
    }

    pub fn script_snapshots(&self, samples: impl IntoIterator<Item = Option<WindowSample>>) {
        self.snapshots.lock().unwrap().extend(samples);
    }

    /// Make subsequent power actions fail
    pub fn set_fail_power(&self, fail: bool) {
        *self.fail_power.lock().unwrap() = fail;
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn power_calls(&self) -> Vec<PowerCall> {
        self.power_calls.lock().unwrap().clone()
    }

    pub fn blocked_apps(&self) -> Vec<String> {
        self.blocked.lock().unwrap().clone()
    }

    pub fn minimized_apps(&self) -> Vec<String> {
        self.minimized.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostAdapter for MockHost {
    fn snapshot(&self) -> Option<WindowSample> {
        self.snapshots.lock().unwrap().pop_front().flatten()
    }

    fn notify(&self, title: &str, message: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    async fn execute_power_action(&self, action: PowerAction, delay: Duration) -> HostResult<()> {
        if *self.fail_power.lock().unwrap() {
            return Err(HostError::PowerActionFailed("mock failure".into()));
        }
        self.power_calls
            .lock()
            .unwrap()
            .push(PowerCall { action, delay });
        Ok(())
    }

    fn block_app(&self, app: &str) -> HostResult<()> {
        self.blocked.lock().unwrap().push(app.to_string());
        Ok(())
    }

    fn minimize_app(&self, app: &str) -> HostResult<()> {
        self.minimized.lock().unwrap().push(app.to_string());
        Ok(())
    }
}
