//! Run catalog over SQLite persistence, metrics views, and the observatory HTTP server.

mod config;
mod persistence;
mod server;

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::views::{AgentDetail, AgentRosterEntry, GridView, TimelineBounds};
use contracts::{
    AgentHistoryPoint, CheckpointPayload, CheckpointRecord, MetricsResponse, RunDetail, RunReport,
    SimulationRun, SCHEMA_VERSION_V1,
};
use metrics_core::MetricsConfig;
use serde_json::Value;
use thiserror::Error;

pub use config::{
    ConfigError, ObservatoryConfig, BIND_ADDR_ENV, DEFAULT_BIND_ADDR, DEFAULT_SQLITE_PATH,
    MORAL_LABEL_MATCH_ENV, SQLITE_PATH_ENV,
};
pub use persistence::{PersistenceError, SqliteRunStore};
pub use server::{router, serve, AppState, ServerError};

pub const NO_METRICS_MESSAGE: &str = "no metrics available";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("simulation run {0} not found")]
    RunNotFound(String),
    #[error("checkpoint at time step {time_step} not found in run {run_id}")]
    CheckpointNotFound { run_id: String, time_step: i64 },
    #[error("agent {agent_id} not found at time step {time_step} of run {run_id}")]
    AgentNotFound {
        run_id: String,
        time_step: i64,
        agent_id: String,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("checkpoint at time step {time_step} of run {run_id} does not decode: {source}")]
    InvalidPayload {
        run_id: String,
        time_step: i64,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Read and write operations over stored runs, joining the store with the metrics views.
///
/// Reads only see the latest visible revision of a run id. Hidden revisions
/// are reachable through [`RunCatalog::list_hidden_runs`], [`RunCatalog::restore_run`]
/// and [`RunCatalog::purge_run`].
#[derive(Debug)]
pub struct RunCatalog {
    store: SqliteRunStore,
    metrics: MetricsConfig,
}

impl RunCatalog {
    pub fn new(store: SqliteRunStore, metrics: MetricsConfig) -> Self {
        Self { store, metrics }
    }

    pub fn open(config: &ObservatoryConfig) -> Result<Self, CatalogError> {
        let store = SqliteRunStore::open(&config.sqlite_path)?;
        Ok(Self::new(store, config.metrics))
    }

    pub fn close(self) -> Result<(), CatalogError> {
        self.store.close()?;
        Ok(())
    }

    pub fn create_run(
        &mut self,
        run_id: &str,
        description: Option<&str>,
    ) -> Result<SimulationRun, CatalogError> {
        let run_id = normalized_run_id(run_id)?;
        let run = self.store.insert_run(run_id, description, &timestamp_now())?;
        tracing::info!(run_id, revision = run.id, "created simulation run revision");
        Ok(run)
    }

    /// Stores a new revision with all of its checkpoints, or nothing if any checkpoint is rejected.
    ///
    /// Time steps must be unique within the batch.
    pub fn import_run(
        &mut self,
        run_id: &str,
        description: Option<&str>,
        checkpoints: &[(i64, Value)],
    ) -> Result<RunDetail, CatalogError> {
        let run_id = normalized_run_id(run_id)?;
        let mut seen = BTreeSet::new();
        for (time_step, payload) in checkpoints {
            validate_checkpoint(*time_step, payload)?;
            if !seen.insert(*time_step) {
                return Err(CatalogError::InvalidInput(format!(
                    "time_step {time_step} appears more than once"
                )));
            }
        }

        let run = self
            .store
            .insert_revision(run_id, description, &timestamp_now(), checkpoints)?;
        tracing::info!(
            run_id,
            revision = run.id,
            checkpoints = checkpoints.len(),
            "imported simulation run revision"
        );

        let checkpoints = self.store.list_checkpoints(run.id)?;
        Ok(RunDetail { run, checkpoints })
    }

    pub fn list_runs(&self) -> Result<Vec<SimulationRun>, CatalogError> {
        Ok(self.store.list_visible_runs()?)
    }

    pub fn list_hidden_runs(&self) -> Result<Vec<SimulationRun>, CatalogError> {
        Ok(self.store.list_hidden_runs()?)
    }

    pub fn get_run(&self, run_id: &str) -> Result<RunDetail, CatalogError> {
        let run = self.require_run(run_id)?;
        let checkpoints = self.store.list_checkpoints(run.id)?;
        Ok(RunDetail { run, checkpoints })
    }

    pub fn get_checkpoint(&self, run_id: &str, time_step: i64) -> Result<CheckpointRecord, CatalogError> {
        let run = self.require_run(run_id)?;
        self.store
            .load_checkpoint(run.id, time_step)?
            .ok_or_else(|| CatalogError::CheckpointNotFound {
                run_id: run_id.to_string(),
                time_step,
            })
    }

    /// Stores a checkpoint in the latest visible revision, replacing any payload at that step.
    pub fn put_checkpoint(
        &mut self,
        run_id: &str,
        time_step: i64,
        payload: &Value,
    ) -> Result<CheckpointRecord, CatalogError> {
        validate_checkpoint(time_step, payload)?;
        let run = self.require_run(run_id)?;
        let record = self
            .store
            .upsert_checkpoint(&run, time_step, payload, &timestamp_now())?;
        tracing::debug!(run_id, time_step, checkpoint = record.id, "stored checkpoint");
        Ok(record)
    }

    pub fn update_description(
        &mut self,
        run_id: &str,
        description: Option<&str>,
    ) -> Result<SimulationRun, CatalogError> {
        let mut run = self.require_run(run_id)?;
        self.store.update_description(run.id, description)?;
        run.description = description.map(str::to_string);
        Ok(run)
    }

    /// Soft-deletes every revision of `run_id`; returns how many were hidden.
    pub fn hide_run(&mut self, run_id: &str) -> Result<usize, CatalogError> {
        let hidden = self.store.set_visibility(run_id, false)?;
        if hidden == 0 {
            return Err(CatalogError::RunNotFound(run_id.to_string()));
        }
        tracing::info!(run_id, hidden, "hid simulation run");
        Ok(hidden)
    }

    pub fn restore_run(&mut self, run_id: &str) -> Result<SimulationRun, CatalogError> {
        let restored = self.store.set_visibility(run_id, true)?;
        if restored == 0 {
            return Err(CatalogError::RunNotFound(run_id.to_string()));
        }
        tracing::info!(run_id, restored, "restored simulation run");
        self.require_run(run_id)
    }

    /// Permanently deletes every revision of `run_id` and its checkpoints.
    pub fn purge_run(&mut self, run_id: &str) -> Result<usize, CatalogError> {
        if !self.store.run_exists(run_id)? {
            return Err(CatalogError::RunNotFound(run_id.to_string()));
        }
        let deleted = self.store.delete_run(run_id)?;
        tracing::warn!(run_id, deleted, "purged simulation run");
        Ok(deleted)
    }

    /// Metrics for one checkpoint. A payload that does not decode yields no metrics.
    pub fn checkpoint_metrics(&self, run_id: &str, time_step: i64) -> Result<MetricsResponse, CatalogError> {
        let record = self.get_checkpoint(run_id, time_step)?;
        let metrics = match record.payload() {
            Ok(payload) => metrics_core::compute_metrics_with(&payload, &self.metrics),
            Err(err) => {
                tracing::warn!(run_id, time_step, error = %err, "checkpoint payload does not decode");
                None
            }
        };

        Ok(MetricsResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: record.run_id,
            time_step,
            message: metrics.is_none().then(|| NO_METRICS_MESSAGE.to_string()),
            metrics,
        })
    }

    pub fn agent_history(&self, run_id: &str) -> Result<Vec<AgentHistoryPoint>, CatalogError> {
        let run = self.require_run(run_id)?;
        let decoded = self
            .store
            .load_checkpoints(run.id)?
            .into_iter()
            .filter_map(|record| match record.payload() {
                Ok(payload) => Some((record.time_step, payload)),
                Err(err) => {
                    tracing::warn!(
                        run_id,
                        time_step = record.time_step,
                        error = %err,
                        "skipping checkpoint that does not decode"
                    );
                    None
                }
            })
            .collect::<Vec<_>>();

        Ok(metrics_core::agent_history(&decoded, &self.metrics))
    }

    pub fn timeline(&self, run_id: &str) -> Result<TimelineBounds, CatalogError> {
        let run = self.require_run(run_id)?;
        let steps = self
            .store
            .list_checkpoints(run.id)?
            .iter()
            .map(|checkpoint| checkpoint.time_step)
            .collect::<Vec<_>>();
        Ok(metrics_core::timeline_bounds(&steps))
    }

    pub fn grid(&self, run_id: &str, time_step: i64) -> Result<GridView, CatalogError> {
        let payload = self.decoded_checkpoint(run_id, time_step)?;
        Ok(metrics_core::grid_view(&payload))
    }

    pub fn agents(&self, run_id: &str, time_step: i64) -> Result<Vec<AgentRosterEntry>, CatalogError> {
        let payload = self.decoded_checkpoint(run_id, time_step)?;
        Ok(metrics_core::agent_roster(&payload))
    }

    pub fn agent_detail(
        &self,
        run_id: &str,
        time_step: i64,
        agent_id: &str,
        recent_limit: usize,
    ) -> Result<AgentDetail, CatalogError> {
        let payload = self.decoded_checkpoint(run_id, time_step)?;
        metrics_core::agent_detail(&payload, agent_id, recent_limit).ok_or_else(|| {
            CatalogError::AgentNotFound {
                run_id: run_id.to_string(),
                time_step,
                agent_id: agent_id.to_string(),
            }
        })
    }

    /// Checkpoint count and the span between the first and latest checkpoint writes.
    pub fn run_summary(&self, run_id: &str) -> Result<RunReport, CatalogError> {
        let run = self.require_run(run_id)?;
        let checkpoints = self.store.list_checkpoints(run.id)?;

        let first = checkpoints.iter().map(|c| c.created_at.as_str()).min();
        let latest = checkpoints.iter().map(|c| c.created_at.as_str()).max();
        let duration_seconds = match (first, latest) {
            (Some(first), Some(latest)) => seconds_between(first, latest),
            _ => None,
        };

        Ok(RunReport {
            run_id: run.run_id,
            checkpoint_count: checkpoints.len(),
            first_checkpoint_at: first.map(str::to_string),
            latest_checkpoint_at: latest.map(str::to_string),
            duration_seconds,
        })
    }

    /// Lowest time step of the run, if it has any checkpoints.
    pub fn first_checkpoint(&self, run_id: &str) -> Result<Option<CheckpointRecord>, CatalogError> {
        let run = self.require_run(run_id)?;
        let Some(first) = self.store.list_checkpoints(run.id)?.into_iter().next() else {
            return Ok(None);
        };
        Ok(self.store.load_checkpoint(run.id, first.time_step)?)
    }

    fn require_run(&self, run_id: &str) -> Result<SimulationRun, CatalogError> {
        self.store
            .latest_visible_run(run_id)?
            .ok_or_else(|| CatalogError::RunNotFound(run_id.to_string()))
    }

    fn decoded_checkpoint(&self, run_id: &str, time_step: i64) -> Result<CheckpointPayload, CatalogError> {
        let record = self.get_checkpoint(run_id, time_step)?;
        record.payload().map_err(|source| CatalogError::InvalidPayload {
            run_id: run_id.to_string(),
            time_step,
            source,
        })
    }
}

fn normalized_run_id(run_id: &str) -> Result<&str, CatalogError> {
    let run_id = run_id.trim();
    if run_id.is_empty() {
        return Err(CatalogError::InvalidInput("run_id must not be empty".to_string()));
    }
    Ok(run_id)
}

fn validate_checkpoint(time_step: i64, payload: &Value) -> Result<(), CatalogError> {
    if time_step < 0 {
        return Err(CatalogError::InvalidInput(format!(
            "time_step must be non-negative, got {time_step}"
        )));
    }
    if !payload.is_object() {
        return Err(CatalogError::InvalidInput(
            "checkpoint payload must be a JSON object".to_string(),
        ));
    }
    Ok(())
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn seconds_between(first: &str, latest: &str) -> Option<f64> {
    let first = DateTime::parse_from_rfc3339(first).ok()?;
    let latest = DateTime::parse_from_rfc3339(latest).ok()?;
    let elapsed = latest.signed_duration_since(first);
    Some(elapsed.num_milliseconds() as f64 / 1000.0)
}
