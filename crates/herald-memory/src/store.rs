use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use herald_core::{HeraldError, Result};

use crate::preferences::PreferenceStore;
use crate::runs::RunStore;

/// Unified durable store: preferences and run records share one SQLite database.
pub struct MemoryStore {
    pub preferences: PreferenceStore,
    pub runs: RunStore,
    db: Arc<Mutex<Connection>>,
}

impl MemoryStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening memory store");

        let conn = Connection::open(path).map_err(|e| HeraldError::Memory(e.to_string()))?;

        // WAL keeps readers off the writer's back
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| HeraldError::Memory(e.to_string()))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS preferences (
                namespace TEXT PRIMARY KEY,
                version INTEGER NOT NULL,
                rules TEXT NOT NULL DEFAULT '[]',
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS corrections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                namespace TEXT NOT NULL,
                rule_key TEXT,
                text TEXT NOT NULL,
                run_id TEXT,
                verdict TEXT,
                version INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                email TEXT NOT NULL,
                classification TEXT,
                conversation TEXT NOT NULL DEFAULT '[]',
                pending TEXT,
                interrupt_id TEXT,
                rounds INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_corrections_namespace ON corrections(namespace);
            CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
            ",
        )
        .map_err(|e| HeraldError::Memory(e.to_string()))?;

        let db = Arc::new(Mutex::new(conn));
        Ok(Self {
            preferences: PreferenceStore::new(Arc::clone(&db)),
            runs: RunStore::new(Arc::clone(&db)),
            db,
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    /// Raw connection, for ad-hoc queries.
    pub fn db(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.db.lock()
    }
}
