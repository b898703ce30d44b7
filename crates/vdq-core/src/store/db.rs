//! SQLite-backed store implementation.
//!
//! Handles connection, migrations, transaction and time helpers. Job CRUD lives in `jobs`.

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::error::VdqError;

/// How long a writer waits for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS media_sources (
        id TEXT PRIMARY KEY,
        canonical_url TEXT NOT NULL UNIQUE,
        provider TEXT NOT NULL,
        provider_video_id TEXT NOT NULL,
        title TEXT NOT NULL,
        channel TEXT NOT NULL,
        thumbnail_url TEXT NOT NULL,
        duration_secs INTEGER,
        raw_metadata TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS media_formats (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL REFERENCES media_sources(id),
        format_id TEXT NOT NULL,
        container TEXT NOT NULL,
        quality_label TEXT NOT NULL,
        width INTEGER,
        height INTEGER,
        codec_video TEXT NOT NULL,
        codec_audio TEXT NOT NULL,
        is_audio_only INTEGER NOT NULL,
        is_premium_only INTEGER NOT NULL,
        size_bytes INTEGER,
        UNIQUE (source_id, format_id)
    )
    "#,
    // `claimed` is the worker lease; `created_day` is the UTC quota day.
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        requester_key TEXT NOT NULL,
        requester_json TEXT NOT NULL,
        source_id TEXT NOT NULL REFERENCES media_sources(id),
        format_row_id TEXT NOT NULL REFERENCES media_formats(id),
        status TEXT NOT NULL,
        progress_percent INTEGER NOT NULL DEFAULT 0,
        bytes_downloaded INTEGER NOT NULL DEFAULT 0,
        bytes_total INTEGER,
        speed_kibps REAL,
        eta_secs INTEGER,
        output_filename TEXT,
        failure_reason TEXT,
        attempts INTEGER NOT NULL DEFAULT 0,
        claimed INTEGER NOT NULL DEFAULT 0,
        created_day TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        started_at INTEGER,
        completed_at INTEGER,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS jobs_requester_day
        ON jobs (requester_key, created_day, status)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS usage_counters (
        requester_key TEXT NOT NULL,
        day TEXT NOT NULL,
        success_count INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (requester_key, day)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quota_credits (
        job_id TEXT PRIMARY KEY,
        requester_key TEXT NOT NULL,
        day TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL,
        attempt INTEGER NOT NULL,
        success INTEGER NOT NULL,
        reason TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
];

/// Handle to the SQLite-backed store.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/vdq/jobs.db` on Linux.
#[derive(Clone)]
pub struct JobStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl JobStore {
    /// Open (or create) the default database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("vdq")?;
        let db_path = xdg_dirs.get_state_home().join("jobs.db");
        Self::open_at(db_path).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let opts = SqliteConnectOptions::from_str(&path_to_sqlite_uri(path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(opts)
            .await
            .with_context(|| format!("open job database {}", path.display()))?;
        let store = JobStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Take a connection and open a write transaction on it.
    ///
    /// Every statement until `ImmediateTx::finish` must run on the returned
    /// transaction.
    pub(crate) async fn begin_immediate(&self) -> Result<ImmediateTx, VdqError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(ImmediateTx {
            conn,
            open: true,
        })
    }
}

/// A `BEGIN IMMEDIATE` transaction on a pooled connection.
///
/// If it is dropped while still open (the future was cancelled, or a
/// rollback failed), the connection is closed instead of going back to the
/// pool, which discards the transaction and releases the write lock.
pub(crate) struct ImmediateTx {
    conn: PoolConnection<Sqlite>,
    open: bool,
}

impl ImmediateTx {
    /// Commit when `result` is Ok, roll back otherwise. Returns `result`, or
    /// the commit error.
    pub(crate) async fn finish<T>(mut self, result: Result<T, VdqError>) -> Result<T, VdqError> {
        match result {
            Ok(v) => match sqlx::query("COMMIT").execute(&mut *self.conn).await {
                Ok(_) => {
                    self.open = false;
                    Ok(v)
                }
                Err(e) => {
                    self.rollback().await;
                    Err(e.into())
                }
            },
            Err(e) => {
                self.rollback().await;
                Err(e)
            }
        }
    }

    async fn rollback(&mut self) {
        match sqlx::query("ROLLBACK").execute(&mut *self.conn).await {
            Ok(_) => self.open = false,
            Err(e) => tracing::warn!("rollback failed, dropping connection: {}", e),
        }
    }
}

impl Deref for ImmediateTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        &self.conn
    }
}

impl DerefMut for ImmediateTx {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        if self.open {
            tracing::warn!("write transaction abandoned; closing its connection");
            self.conn.close_on_drop();
        }
    }
}

/// Current time as Unix seconds (for DB timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Current UTC date (`YYYY-MM-DD`), the unit of daily quotas.
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("invalid id in database: {s}"))
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<JobStore> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = JobStore { pool };
    store.migrate().await?;
    Ok(store)
}
