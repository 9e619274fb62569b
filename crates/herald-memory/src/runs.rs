use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use herald_core::{
    Classification, Conversation, Email, HeraldError, InterruptRequest, Result, RunId, RunStatus,
};

use crate::preferences::parse_ts;

/// Durable record of one run, keyed by `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub email: Email,
    pub status: RunStatus,
    pub classification: Option<Classification>,
    pub conversation: Conversation,
    /// Present iff `status` is `Suspended`.
    pub pending: Option<InterruptRequest>,
    /// `act` decisions consumed so far.
    pub rounds: u32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(email: Email) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            email,
            status: RunStatus::Running,
            classification: None,
            conversation: Conversation::new(),
            pending: None,
            rounds: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Text of the final turn of a completed run.
    pub fn final_response(&self) -> Option<String> {
        if self.status != RunStatus::Completed {
            return None;
        }
        self.conversation.final_text()
    }
}

const RUN_COLUMNS: &str = "run_id, status, email, classification, conversation, pending, rounds, error, created_at, updated_at";

fn db_err(e: rusqlite::Error) -> HeraldError {
    HeraldError::Persistence(e.to_string())
}

/// Columns as stored, before JSON decoding.
struct RunRow {
    run_id: String,
    status: String,
    email: String,
    classification: Option<String>,
    conversation: String,
    pending: Option<String>,
    rounds: i64,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RunRow> {
    Ok(RunRow {
        run_id: row.get(0)?,
        status: row.get(1)?,
        email: row.get(2)?,
        classification: row.get(3)?,
        conversation: row.get(4)?,
        pending: row.get(5)?,
        rounds: row.get(6)?,
        error: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl RunRow {
    fn decode(self) -> Result<RunRecord> {
        Ok(RunRecord {
            run_id: self
                .run_id
                .parse()
                .map_err(|e: uuid::Error| HeraldError::Persistence(e.to_string()))?,
            status: self.status.parse()?,
            email: serde_json::from_str(&self.email)?,
            classification: self
                .classification
                .map(|c| serde_json::from_str(&c))
                .transpose()?,
            conversation: serde_json::from_str(&self.conversation)?,
            pending: self.pending.map(|p| serde_json::from_str(&p)).transpose()?,
            rounds: u32::try_from(self.rounds)
                .map_err(|e| HeraldError::Persistence(format!("bad round count: {e}")))?,
            error: self.error,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// Run records. The only write path into a suspended run is `claim_interrupt`.
pub struct RunStore {
    db: Arc<Mutex<Connection>>,
}

impl RunStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Upsert the full record. Stamps `updated_at`.
    ///
    /// A stored record that is already completed or failed is never
    /// overwritten; saving over one is `InvalidRunState`.
    pub fn save(&self, record: &mut RunRecord) -> Result<()> {
        if (record.status == RunStatus::Suspended) != record.pending.is_some() {
            return Err(HeraldError::InvalidRunState {
                run_id: record.run_id,
                status: record.status.to_string(),
                expected: if record.pending.is_some() {
                    "suspended with a pending interrupt".into()
                } else {
                    "a pending interrupt while suspended".into()
                },
            });
        }
        record.updated_at = Utc::now();

        let db = self.db.lock();
        let written = db.execute(
            "INSERT INTO runs (run_id, status, email, classification, conversation, pending,
                               interrupt_id, rounds, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(run_id) DO UPDATE SET
                status = excluded.status,
                classification = excluded.classification,
                conversation = excluded.conversation,
                pending = excluded.pending,
                interrupt_id = excluded.interrupt_id,
                rounds = excluded.rounds,
                error = excluded.error,
                updated_at = excluded.updated_at
             WHERE runs.status NOT IN ('completed', 'failed')",
            rusqlite::params![
                record.run_id.to_string(),
                record.status.as_str(),
                serde_json::to_string(&record.email)?,
                record
                    .classification
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                serde_json::to_string(&record.conversation)?,
                record.pending.as_ref().map(serde_json::to_string).transpose()?,
                record.pending.as_ref().map(|p| p.id.to_string()),
                record.rounds as i64,
                record.error,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
        .map_err(db_err)?;
        if written == 0 {
            let stored: String = db
                .query_row(
                    "SELECT status FROM runs WHERE run_id = ?1",
                    rusqlite::params![record.run_id.to_string()],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            return Err(HeraldError::InvalidRunState {
                run_id: record.run_id,
                status: stored,
                expected: "running or suspended".into(),
            });
        }
        debug!(run_id = %record.run_id, status = %record.status, "run saved");
        Ok(())
    }

    pub fn get(&self, run_id: RunId) -> Result<Option<RunRecord>> {
        let db = self.db.lock();
        let cols = db
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                rusqlite::params![run_id.to_string()],
                read_row,
            )
            .optional()
            .map_err(db_err)?;
        cols.map(RunRow::decode).transpose()
    }

    pub fn load(&self, run_id: RunId) -> Result<RunRecord> {
        self.get(run_id)?.ok_or(HeraldError::RunNotFound(run_id))
    }

    /// Records newest first, optionally filtered by status.
    pub fn list(&self, status: Option<RunStatus>, limit: usize) -> Result<Vec<RunRecord>> {
        let db = self.db.lock();
        let mut stmt = db
            .prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM runs
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC LIMIT ?2"
            ))
            .map_err(db_err)?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    status.map(|s| s.as_str()),
                    i64::try_from(limit).unwrap_or(i64::MAX)
                ],
                read_row,
            )
            .map_err(db_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err)?;
        rows.into_iter().map(RunRow::decode).collect()
    }

    /// Interrupt requests awaiting a verdict, oldest first.
    pub fn pending(&self) -> Result<Vec<InterruptRequest>> {
        let mut pending: Vec<InterruptRequest> = self
            .list(Some(RunStatus::Suspended), usize::MAX)?
            .into_iter()
            .filter_map(|r| r.pending)
            .collect();
        pending.sort_by_key(|p| p.created_at);
        Ok(pending)
    }

    /// Atomically consume the pending interrupt of a suspended run.
    ///
    /// Succeeds for exactly one caller per interrupt; every other attempt
    /// (unknown run, other interrupt id, already resolved) is `StaleVerdict`
    /// and leaves the record untouched. Returns the record as it was before
    /// the claim, status set to `Running`.
    pub fn claim_interrupt(&self, run_id: RunId, interrupt_id: Uuid) -> Result<(RunRecord, InterruptRequest)> {
        let mut db = self.db.lock();
        let tx = db.transaction().map_err(db_err)?;

        let cols = tx
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
                rusqlite::params![run_id.to_string()],
                read_row,
            )
            .optional()
            .map_err(db_err)?;
        let Some(mut record) = cols.map(RunRow::decode).transpose()? else {
            return Err(HeraldError::StaleVerdict {
                run_id,
                reason: "no such run".into(),
            });
        };

        let now = Utc::now();
        let claimed = tx
            .execute(
                "UPDATE runs SET status = 'running', pending = NULL, interrupt_id = NULL, updated_at = ?3
                 WHERE run_id = ?1 AND status = 'suspended' AND interrupt_id = ?2",
                rusqlite::params![run_id.to_string(), interrupt_id.to_string(), now.to_rfc3339()],
            )
            .map_err(db_err)?;
        if claimed == 0 {
            return Err(HeraldError::StaleVerdict {
                run_id,
                reason: format!("interrupt {interrupt_id} is not pending (run is {})", record.status),
            });
        }
        tx.commit().map_err(db_err)?;

        let interrupt = record.pending.take().ok_or_else(|| {
            HeraldError::Persistence(format!("run {run_id} was suspended without a pending interrupt"))
        })?;
        record.status = RunStatus::Running;
        record.updated_at = now;
        info!(%run_id, %interrupt_id, "interrupt claimed");
        Ok((record, interrupt))
    }

    /// Drop a suspended run's interrupt and mark it failed. Returns false if the run was not suspended.
    pub fn discard_pending(&self, run_id: RunId, reason: &str) -> Result<bool> {
        let db = self.db.lock();
        let changed = db
            .execute(
                "UPDATE runs SET status = 'failed', pending = NULL, interrupt_id = NULL,
                                 error = ?2, updated_at = ?3
                 WHERE run_id = ?1 AND status = 'suspended'",
                rusqlite::params![run_id.to_string(), reason, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    /// Mark a run left `Running` by a process that no longer exists as failed.
    /// Returns false if the run was not running.
    pub fn abandon(&self, run_id: RunId, reason: &str) -> Result<bool> {
        let db = self.db.lock();
        let changed = db
            .execute(
                "UPDATE runs SET status = 'failed', error = ?2, updated_at = ?3
                 WHERE run_id = ?1 AND status = 'running'",
                rusqlite::params![run_id.to_string(), reason, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }
}
