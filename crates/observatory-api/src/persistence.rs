use std::path::Path;

use contracts::{CheckpointRecord, CheckpointSummary, SimulationRun};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Revisions of a run id are ordered newest first by `(created_at, id)`.
const LATEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

const RUN_COLUMNS: &str = "id, run_id, description, created_at, visible";

/// SQLite-backed store for simulation runs and their checkpoints.
///
/// Queries follow two contracts: hidden revisions (`visible = 0`) are logically
/// deleted, and among the visible revisions of one run id the most recently
/// created wins.
#[derive(Debug)]
pub struct SqliteRunStore {
    conn: Connection,
}

impl SqliteRunStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    /// Closes the underlying connection, surfacing any error SQLite reports on shutdown.
    pub fn close(self) -> Result<(), PersistenceError> {
        self.conn.close().map_err(|(_, err)| PersistenceError::Sqlite(err))
    }

    pub fn insert_run(
        &mut self,
        run_id: &str,
        description: Option<&str>,
        created_at: &str,
    ) -> Result<SimulationRun, PersistenceError> {
        self.insert_revision(run_id, description, created_at, &[])
    }

    /// Inserts a visible revision together with its checkpoints in one transaction.
    pub fn insert_revision(
        &mut self,
        run_id: &str,
        description: Option<&str>,
        created_at: &str,
        checkpoints: &[(i64, Value)],
    ) -> Result<SimulationRun, PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO simulation_runs (run_id, description, created_at, visible)
             VALUES (?1, ?2, ?3, 1)",
            params![run_id, description, created_at],
        )?;
        let revision_id = tx.last_insert_rowid();

        for (time_step, payload) in checkpoints {
            tx.execute(
                "INSERT INTO checkpoints (simulation_run_id, time_step, payload_json, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![revision_id, time_step, serde_json::to_string(payload)?, created_at],
            )?;
        }
        tx.commit()?;

        Ok(SimulationRun {
            id: revision_id,
            run_id: run_id.to_string(),
            description: description.map(str::to_string),
            created_at: created_at.to_string(),
            visible: true,
        })
    }

    pub fn run_exists(&self, run_id: &str) -> Result<bool, PersistenceError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM simulation_runs WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn latest_visible_run(&self, run_id: &str) -> Result<Option<SimulationRun>, PersistenceError> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM simulation_runs
             WHERE run_id = ?1 AND visible = 1
             {LATEST_FIRST} LIMIT 1"
        );
        let run = self
            .conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?;
        Ok(run)
    }

    /// Latest visible revision of every run id, newest first.
    pub fn list_visible_runs(&self) -> Result<Vec<SimulationRun>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.run_id, r.description, r.created_at, r.visible
             FROM simulation_runs r
             WHERE r.visible = 1
               AND NOT EXISTS (
                   SELECT 1 FROM simulation_runs newer
                   WHERE newer.run_id = r.run_id
                     AND newer.visible = 1
                     AND (newer.created_at > r.created_at
                          OR (newer.created_at = r.created_at AND newer.id > r.id))
               )
             ORDER BY r.created_at DESC, r.id DESC",
        )?;

        let rows = stmt.query_map([], run_from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    pub fn list_hidden_runs(&self) -> Result<Vec<SimulationRun>, PersistenceError> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM simulation_runs WHERE visible = 0 {LATEST_FIRST}");
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt.query_map([], run_from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    /// Flips the visibility flag on every revision of `run_id`; returns the number touched.
    pub fn set_visibility(&mut self, run_id: &str, visible: bool) -> Result<usize, PersistenceError> {
        let updated = self.conn.execute(
            "UPDATE simulation_runs SET visible = ?2 WHERE run_id = ?1",
            params![run_id, visible],
        )?;
        Ok(updated)
    }

    pub fn update_description(
        &mut self,
        revision_id: i64,
        description: Option<&str>,
    ) -> Result<usize, PersistenceError> {
        let updated = self.conn.execute(
            "UPDATE simulation_runs SET description = ?2 WHERE id = ?1",
            params![revision_id, description],
        )?;
        Ok(updated)
    }

    /// Removes every revision of `run_id` together with its checkpoints.
    pub fn delete_run(&mut self, run_id: &str) -> Result<usize, PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM checkpoints
             WHERE simulation_run_id IN (SELECT id FROM simulation_runs WHERE run_id = ?1)",
            params![run_id],
        )?;
        let deleted = tx.execute(
            "DELETE FROM simulation_runs WHERE run_id = ?1",
            params![run_id],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    pub fn upsert_checkpoint(
        &mut self,
        revision: &SimulationRun,
        time_step: i64,
        payload: &Value,
        created_at: &str,
    ) -> Result<CheckpointRecord, PersistenceError> {
        let payload_json = serde_json::to_string(payload)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO checkpoints (simulation_run_id, time_step, payload_json, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(simulation_run_id, time_step) DO UPDATE SET
                 payload_json = excluded.payload_json,
                 created_at = excluded.created_at",
            params![revision.id, time_step, payload_json, created_at],
        )?;
        let id: i64 = tx.query_row(
            "SELECT id FROM checkpoints WHERE simulation_run_id = ?1 AND time_step = ?2",
            params![revision.id, time_step],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(CheckpointRecord {
            id,
            simulation_run_id: revision.id,
            run_id: revision.run_id.clone(),
            time_step,
            created_at: created_at.to_string(),
            data: payload.clone(),
        })
    }

    pub fn list_checkpoints(&self, revision_id: i64) -> Result<Vec<CheckpointSummary>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, simulation_run_id, time_step, created_at
             FROM checkpoints
             WHERE simulation_run_id = ?1
             ORDER BY time_step ASC",
        )?;

        let rows = stmt.query_map(params![revision_id], |row| {
            Ok(CheckpointSummary {
                id: row.get(0)?,
                simulation_run_id: row.get(1)?,
                time_step: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        let mut checkpoints = Vec::new();
        for row in rows {
            checkpoints.push(row?);
        }
        Ok(checkpoints)
    }

    pub fn load_checkpoint(
        &self,
        revision_id: i64,
        time_step: i64,
    ) -> Result<Option<CheckpointRecord>, PersistenceError> {
        let raw = self
            .conn
            .query_row(
                "SELECT c.id, c.simulation_run_id, r.run_id, c.time_step, c.created_at, c.payload_json
                 FROM checkpoints c
                 JOIN simulation_runs r ON r.id = c.simulation_run_id
                 WHERE c.simulation_run_id = ?1 AND c.time_step = ?2",
                params![revision_id, time_step],
                RawCheckpoint::from_row,
            )
            .optional()?;

        raw.map(RawCheckpoint::into_record).transpose()
    }

    /// Every checkpoint of a revision, time step ascending.
    pub fn load_checkpoints(&self, revision_id: i64) -> Result<Vec<CheckpointRecord>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.simulation_run_id, r.run_id, c.time_step, c.created_at, c.payload_json
             FROM checkpoints c
             JOIN simulation_runs r ON r.id = c.simulation_run_id
             WHERE c.simulation_run_id = ?1
             ORDER BY c.time_step ASC",
        )?;

        let rows = stmt.query_map(params![revision_id], RawCheckpoint::from_row)?;
        let mut checkpoints = Vec::new();
        for row in rows {
            checkpoints.push(row?.into_record()?);
        }
        Ok(checkpoints)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS simulation_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                description TEXT,
                created_at TEXT NOT NULL,
                visible INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                simulation_run_id INTEGER NOT NULL
                    REFERENCES simulation_runs(id) ON DELETE CASCADE,
                time_step INTEGER NOT NULL,
                payload_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (simulation_run_id, time_step)
            );

            CREATE INDEX IF NOT EXISTS idx_runs_run_id_created ON simulation_runs(run_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_runs_visible_created ON simulation_runs(visible, created_at);
            CREATE INDEX IF NOT EXISTS idx_checkpoints_run_step ON checkpoints(simulation_run_id, time_step);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', datetime('now'))",
            [],
        )?;

        Ok(())
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<SimulationRun> {
    Ok(SimulationRun {
        id: row.get(0)?,
        run_id: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        visible: row.get(4)?,
    })
}

struct RawCheckpoint {
    id: i64,
    simulation_run_id: i64,
    run_id: String,
    time_step: i64,
    created_at: String,
    payload_json: String,
}

impl RawCheckpoint {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            simulation_run_id: row.get(1)?,
            run_id: row.get(2)?,
            time_step: row.get(3)?,
            created_at: row.get(4)?,
            payload_json: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<CheckpointRecord, PersistenceError> {
        Ok(CheckpointRecord {
            id: self.id,
            simulation_run_id: self.simulation_run_id,
            run_id: self.run_id,
            time_step: self.time_step,
            created_at: self.created_at,
            data: serde_json::from_str(&self.payload_json)?,
        })
    }
}
