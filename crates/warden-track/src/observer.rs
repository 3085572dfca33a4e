//! Window observer loop
//!
//! A supervised tokio task that samples the focused window through the
//! host adapter on a fixed cadence. The interval is runtime-adjustable and
//! takes effect on the next tick; cancellation takes effect before the
//! next tick with no further side effects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};
use warden_api::WindowSample;
use warden_host_api::HostAdapter;

/// Default sampling interval
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running observer task
pub struct ObserverHandle {
    interval_ms: Arc<AtomicU64>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ObserverHandle {
    /// Spawn the observer loop. Samples are delivered on the returned
    /// channel; observer failures (no focused window) are skipped and the
    /// downstream segmenter sees the resulting gap via timestamps.
    pub fn spawn(
        host: Arc<dyn HostAdapter>,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<WindowSample>) {
        let interval_ms = Arc::new(AtomicU64::new(interval.as_millis() as u64));
        let (stop_tx, stop_rx) = watch::channel(false);
        let (sample_tx, sample_rx) = mpsc::channel(64);

        let task = tokio::spawn(run_loop(
            host,
            interval_ms.clone(),
            stop_rx,
            sample_tx,
        ));

        info!(interval_ms = interval.as_millis() as u64, "Window observer started");

        (
            Self {
                interval_ms,
                stop_tx,
                task: Some(task),
            },
            sample_rx,
        )
    }

    /// Change the sampling interval; takes effect on the next tick.
    pub fn set_interval(&self, interval: Duration) {
        let ms = interval.as_millis().max(1) as u64;
        self.interval_ms.store(ms, Ordering::Relaxed);
        debug!(interval_ms = ms, "Sampling interval changed");
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the loop and wait for it to finish
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("Window observer stopped");
    }
}

async fn run_loop(
    host: Arc<dyn HostAdapter>,
    interval_ms: Arc<AtomicU64>,
    mut stop_rx: watch::Receiver<bool>,
    sample_tx: mpsc::Sender<WindowSample>,
) {
    loop {
        let interval = Duration::from_millis(interval_ms.load(Ordering::Relaxed));

        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {
                match host.snapshot() {
                    Some(sample) => {
                        if sample_tx.send(sample).await.is_err() {
                            debug!("Sample receiver dropped, observer exiting");
                            break;
                        }
                    }
                    None => trace!("No focused window this tick"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use warden_api::Category;
    use warden_host_api::MockHost;

    fn sample(app: &str) -> WindowSample {
        WindowSample::new(Utc::now(), app, "t", "unknown", Category::Unclassified)
    }

    #[tokio::test]
    async fn delivers_scripted_samples_and_skips_failures() {
        let host = Arc::new(MockHost::new());
        host.push_snapshot(Some(sample("Chrome")));
        host.push_snapshot(None);
        host.push_snapshot(Some(sample("Editor")));

        let (handle, mut rx) =
            ObserverHandle::spawn(host.clone(), Duration::from_millis(5));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.app, "Chrome");
        assert_eq!(second.app, "Editor");

        handle.stop().await;
    }

    #[tokio::test]
    async fn stop_takes_effect_before_next_tick() {
        let host = Arc::new(MockHost::new());
        let (handle, mut rx) =
            ObserverHandle::spawn(host.clone(), Duration::from_millis(10));
        assert!(handle.is_running());

        handle.stop().await;

        // Queue a snapshot after stopping: it must never be delivered
        host.push_snapshot(Some(sample("Late")));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn interval_is_runtime_adjustable() {
        let host = Arc::new(MockHost::new());
        let (handle, _rx) = ObserverHandle::spawn(host, Duration::from_secs(1));

        assert_eq!(handle.interval(), Duration::from_secs(1));
        handle.set_interval(Duration::from_millis(250));
        assert_eq!(handle.interval(), Duration::from_millis(250));

        handle.stop().await;
    }
}
