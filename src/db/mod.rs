//! SQLite persistence layer for block intents and settings.
//!
//! Uses `rusqlite` with bundled SQLite. Handles:
//! - One `block_status` row per endpoint (`in_blocked`, `out_blocked`)
//! - The `settings` flags (sounds, global block)
//! - Self-healing: a corrupt file is replaced by a fresh, empty database

mod intents;
mod settings;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, ErrorCode};

pub use settings::Settings;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS block_status (
        endpoint TEXT PRIMARY KEY NOT NULL,
        in_blocked INTEGER NOT NULL DEFAULT 0,
        out_blocked INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY NOT NULL,
        value INTEGER NOT NULL
    );
";

/// Manages the SQLite database holding durable state.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path.
    ///
    /// A file SQLite reports as corrupt or not a database is deleted and
    /// recreated empty. Any other failure (locked, busy, permissions) is
    /// returned and the file is left alone.
    pub fn open(path: &Path) -> Result<Self> {
        match Self::open_existing(path) {
            Ok(db) => Ok(db),
            Err(e) if is_corruption(&e) => {
                tracing::warn!(
                    "State database {} is corrupt ({e:#}); recreating it empty",
                    path.display()
                );
                remove_database_files(path)?;
                Self::open_existing(path)
                    .with_context(|| format!("failed to recreate {}", path.display()))
            }
            Err(e) => Err(e.context(format!("failed to open {}", path.display()))),
        }
    }

    fn open_existing(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        // A committed write must be on disk before `set` returns.
        conn.execute_batch("PRAGMA synchronous=FULL;")?;
        // Reading the header forces SQLite to validate the file.
        conn.query_row("SELECT COUNT(*) FROM block_status", [], |row| row.get::<_, i64>(0))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }
}

fn is_corruption(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if matches!(e.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
    )
}

fn remove_database_files(path: &Path) -> Result<()> {
    for suffix in ["", "-journal", "-wal", "-shm"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        match std::fs::remove_file(&candidate) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", candidate.display()))
            }
        }
    }
    Ok(())
}
