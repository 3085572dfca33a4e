//! wardend - the warden background service
//!
//! Wires the components together:
//! - Policy store (mode configurations, TOML)
//! - Sqlite store (sessions, samples, timer history)
//! - Window observer -> classifier -> segmenter pipeline
//! - Mode controller (enforcement)
//! - Enforcement timer

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use warden_api::{PowerAction, WindowSample};
use warden_core::{EnforcementTimer, ModeController, TimerConfig};
use warden_host_api::{HostAdapter, HostResult};
use warden_store::{SqliteStore, Store};
use warden_track::{Classifier, ObserverHandle, SessionSegmenter, SegmenterConfig};

/// Grace period between budget exhaustion and the power action
const DEFAULT_GRACE: Duration = Duration::from_secs(60);

/// wardend - usage observation and mode enforcement service
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "Usage observation and mode enforcement service", long_about = None)]
struct Args {
    /// Mode configuration file (or set WARDEN_CONFIG)
    #[arg(short, long, env = "WARDEN_CONFIG", default_value = "warden-modes.toml")]
    config: PathBuf,

    /// Data directory for the database and classifier rules
    #[arg(short, long, env = "WARDEN_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Window sampling interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    sample_interval_ms: u64,

    /// Gap in seconds after which a new session starts
    #[arg(long, default_value_t = 30)]
    session_gap_secs: u64,

    /// Passcode accepted by the enforcement unlock (or set WARDEN_PASSCODE)
    #[arg(long, env = "WARDEN_PASSCODE")]
    passcode: Option<String>,

    /// Days of session/sample history to keep
    #[arg(long, default_value_t = 90)]
    retention_days: u32,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Host adapter that logs every action instead of touching the OS.
///
/// Stands in until a platform adapter is wired in; `snapshot` reports no
/// focused window, so the pipeline idles but every API-driven side effect
/// is still visible in the logs.
struct LoggingHost;

#[async_trait]
impl HostAdapter for LoggingHost {
    fn snapshot(&self) -> Option<WindowSample> {
        None
    }

    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "Notification");
    }

    async fn execute_power_action(&self, action: PowerAction, delay: Duration) -> HostResult<()> {
        info!(action = action.as_str(), delay_secs = delay.as_secs(), "Power action");
        Ok(())
    }

    fn block_app(&self, app: &str) -> HostResult<()> {
        info!(app, "Block app");
        Ok(())
    }

    fn minimize_app(&self, app: &str) -> HostResult<()> {
        info!(app, "Minimize app");
        Ok(())
    }
}

/// The daemon's explicitly constructed state; no ambient globals.
struct Engine {
    controller: Arc<ModeController>,
    timer: Arc<EnforcementTimer>,
    segmenter: SessionSegmenter,
    classifier: Classifier,
    store: Arc<dyn Store>,
    host: Arc<dyn HostAdapter>,
    sample_interval: Duration,
}

impl Engine {
    fn new(args: &Args) -> Result<Self> {
        std::fs::create_dir_all(&args.data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", args.data_dir))?;

        let policy = warden_config::PolicyStore::open(&args.config)
            .with_context(|| format!("Failed to open policy store {:?}", args.config))?;
        info!(
            config_path = %args.config.display(),
            mode_count = policy.list_modes().len(),
            "Policy store loaded"
        );

        let db_path = args.data_dir.join("warden.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );
        info!(db_path = %db_path.display(), "Store initialized");

        let rules_path = args.data_dir.join("classifier-rules.json");
        let classifier = Classifier::open(&rules_path)
            .with_context(|| format!("Failed to load classifier rules {:?}", rules_path))?;

        let host: Arc<dyn HostAdapter> = Arc::new(LoggingHost);

        let controller = Arc::new(ModeController::new(policy, host.clone()));
        let timer = Arc::new(EnforcementTimer::new(
            store.clone(),
            host.clone(),
            TimerConfig {
                passcode: args.passcode.clone(),
                ..Default::default()
            },
        ));

        let segmenter = SessionSegmenter::new(SegmenterConfig {
            session_gap: Duration::from_secs(args.session_gap_secs),
            ..Default::default()
        });

        // Retention pass; failure is not fatal
        let cutoff = chrono::Utc::now() - chrono::Duration::days(args.retention_days as i64);
        match store.cleanup_before(cutoff) {
            Ok(removed) if removed > 0 => info!(removed, "Old history removed"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Retention cleanup failed"),
        }

        Ok(Self {
            controller,
            timer,
            segmenter,
            classifier,
            store,
            host,
            sample_interval: Duration::from_millis(args.sample_interval_ms),
        })
    }

    /// One observer tick: classify, persist, segment, enforce.
    ///
    /// Persistence failures are logged and skipped; in-memory state stays
    /// authoritative until a later write succeeds.
    fn handle_sample(&mut self, mut sample: WindowSample) {
        sample.status = self.classifier.classify(&sample.app, &sample.title);

        if let Err(e) = self.store.persist_sample(&sample) {
            warn!(
                error_kind = "persistence_unavailable",
                error = %e,
                "Failed to persist sample"
            );
        }

        if let Some(closed) = self.segmenter.push(&sample) {
            debug!(
                app = %closed.app_name,
                duration_secs = closed.total_duration.as_secs(),
                "Session closed"
            );
            if let Err(e) = self.store.persist_session(&closed) {
                warn!(
                    error_kind = "persistence_unavailable",
                    error = %e,
                    "Failed to persist session"
                );
            }
        }

        let action = self.controller.enforce(&sample);
        debug!(app = %sample.app, action = ?action, "Sample handled");
    }

    async fn run(mut self) -> Result<()> {
        // Feed the active mode's budget to the timer
        if let Some(limit) = self.controller.time_limit() {
            self.timer
                .start(limit, PowerAction::Sleep, true, DEFAULT_GRACE);
        }

        let (observer, mut samples): (ObserverHandle, mpsc::Receiver<WindowSample>) =
            ObserverHandle::spawn(self.host.clone(), self.sample_interval);

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sigquit =
            signal(SignalKind::quit()).context("Failed to create SIGQUIT handler")?;

        info!("Service running");

        let graceful = loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break true;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break true;
                }
                _ = sigquit.recv() => {
                    warn!("Received SIGQUIT, emergency shutdown");
                    break false;
                }
                Some(sample) = samples.recv() => {
                    self.handle_sample(sample);
                }
            }
        };

        observer.stop().await;
        self.timer.stop();

        if graceful {
            self.shutdown()
        } else {
            self.emergency_shutdown();
            Ok(())
        }
    }

    /// Close and persist the open session, then deactivate tracking.
    fn shutdown(mut self) -> Result<()> {
        if let Some(open) = self.segmenter.quick_restart() {
            info!(
                app = %open.app_name,
                duration_secs = open.total_duration.as_secs(),
                "Persisting open session"
            );
            if let Err(e) = self.store.persist_session(&open) {
                error!(error = %e, "Failed to persist final session");
            }
        }

        self.controller.deactivate();
        info!("Shutdown complete");
        Ok(())
    }

    /// Terminal path that releases resources without graceful persistence.
    fn emergency_shutdown(self) {
        warn!("Emergency shutdown, open session discarded");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "wardend starting");

    let engine = Engine::new(&args)?;
    engine.run().await
}
