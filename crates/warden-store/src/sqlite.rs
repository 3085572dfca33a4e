//! SQLite-based store implementation

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;
use warden_api::{Category, Session, TimerDayEntry, WindowSample};
use warden_util::{day_key, SessionId};

use crate::{Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Closed (and snapshot of open) usage sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                context_changes INTEGER NOT NULL DEFAULT 0,
                titles_json TEXT NOT NULL DEFAULT '[]',
                status_changes INTEGER NOT NULL DEFAULT 0,
                window_count INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 0
            );

            -- Raw sample log (append-only)
            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                app TEXT NOT NULL,
                title TEXT NOT NULL,
                window_type TEXT NOT NULL,
                status TEXT NOT NULL
            );

            -- Enforcement timer history, one row per day
            CREATE TABLE IF NOT EXISTS timer_history (
                day TEXT PRIMARY KEY,
                triggered INTEGER NOT NULL,
                requires_passcode INTEGER NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_samples_timestamp ON samples(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn persist_session(&self, session: &Session) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let titles_json = serde_json::to_string(&session.titles_seen)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO sessions
                (id, app_name, start_time, end_time, duration_secs,
                 context_changes, titles_json, status_changes, window_count, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                session.id.to_string(),
                session.app_name,
                session.start_time.to_rfc3339(),
                session.end_time.map(|t| t.to_rfc3339()),
                session.total_duration.as_secs() as i64,
                session.context_changes,
                titles_json,
                session.status_changes,
                session.window_count,
                session.is_active as i64,
            ],
        )?;

        Ok(())
    }

    fn load_sessions(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<Session>> {
        let conn = self.conn.lock().unwrap();
        let floor = since
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| String::from(""));

        let mut stmt = conn.prepare(
            r#"
            SELECT id, app_name, start_time, end_time, duration_secs,
                   context_changes, titles_json, status_changes, window_count, is_active
            FROM sessions
            WHERE start_time >= ?
            ORDER BY start_time ASC
            "#,
        )?;

        let rows = stmt.query_map([floor], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, u32>(8)?,
                row.get::<_, i64>(9)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, app_name, start, end, secs, ctx, titles, status_changes, windows, active) =
                row?;

            let start_time = parse_ts(&start)?;
            let end_time = match end {
                Some(s) => Some(parse_ts(&s)?),
                None => None,
            };
            let titles_seen: Vec<String> = serde_json::from_str(&titles)?;

            sessions.push(Session {
                id: parse_session_id(&id)?,
                app_name,
                start_time,
                end_time,
                total_duration: Duration::from_secs(secs.max(0) as u64),
                context_changes: ctx,
                titles_seen,
                status_changes,
                window_count: windows,
                is_active: active != 0,
            });
        }

        Ok(sessions)
    }

    fn persist_sample(&self, sample: &WindowSample) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO samples (timestamp, app, title, window_type, status) VALUES (?, ?, ?, ?, ?)",
            params![
                sample.timestamp.to_rfc3339(),
                sample.app,
                sample.title,
                sample.window_type,
                sample.status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn load_samples(&self, since: Option<DateTime<Utc>>) -> StoreResult<Vec<WindowSample>> {
        let conn = self.conn.lock().unwrap();
        let floor = since
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| String::from(""));

        let mut stmt = conn.prepare(
            "SELECT timestamp, app, title, window_type, status FROM samples \
             WHERE timestamp >= ? ORDER BY timestamp ASC",
        )?;

        let rows = stmt.query_map([floor], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut samples = Vec::new();
        for row in rows {
            let (ts, app, title, window_type, status) = row?;
            samples.push(WindowSample {
                timestamp: parse_ts(&ts)?,
                app,
                title,
                window_type,
                status: Category::parse(&status),
            });
        }

        Ok(samples)
    }

    fn get_timer_day(&self, day: NaiveDate) -> StoreResult<Option<TimerDayEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                "SELECT triggered, requires_passcode FROM timer_history WHERE day = ?",
                [day_key(day)],
                |row| {
                    Ok(TimerDayEntry {
                        triggered: row.get::<_, i64>(0)? != 0,
                        requires_passcode: row.get::<_, i64>(1)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn set_timer_day(&self, day: NaiveDate, entry: &TimerDayEntry) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO timer_history (day, triggered, requires_passcode) VALUES (?, ?, ?)",
            params![day_key(day), entry.triggered as i64, entry.requires_passcode as i64],
        )?;
        Ok(())
    }

    fn set_requires_passcode(&self, day: NaiveDate, requires: bool) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE timer_history SET requires_passcode = ? WHERE day = ?",
            params![requires as i64, day_key(day)],
        )?;
        Ok(changed > 0)
    }

    fn load_timer_history(&self) -> StoreResult<BTreeMap<NaiveDate, TimerDayEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT day, triggered, requires_passcode FROM timer_history")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut history = BTreeMap::new();
        for row in rows {
            let (day, triggered, requires) = row?;
            let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                .map_err(|e| StoreError::CorruptRecord(format!("bad day key '{day}': {e}")))?;
            history.insert(
                date,
                TimerDayEntry {
                    triggered: triggered != 0,
                    requires_passcode: requires != 0,
                },
            );
        }

        Ok(history)
    }

    fn clear_timer_history(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM timer_history", [])?;
        Ok(())
    }

    fn cleanup_before(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        let floor = cutoff.to_rfc3339();
        let sessions = conn.execute("DELETE FROM sessions WHERE start_time < ?", [&floor])?;
        let samples = conn.execute("DELETE FROM samples WHERE timestamp < ?", [&floor])?;
        debug!(sessions, samples, "Old records removed");
        Ok(sessions + samples)
    }

    fn is_healthy(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord(format!("bad timestamp '{s}': {e}")))
}

fn parse_session_id(s: &str) -> StoreResult<SessionId> {
    s.parse::<Uuid>()
        .map(SessionId::from_uuid)
        .map_err(|e| StoreError::CorruptRecord(format!("bad session id '{s}': {e}")))
}
