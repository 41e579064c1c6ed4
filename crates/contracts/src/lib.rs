//! v1 cross-boundary contracts for the run store, metrics aggregator, API, and observatory clients.

pub mod checkpoint;
pub mod serde_null_default;
pub mod views;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use checkpoint::{
    ActionKind, Agent, AgentAction, AgentState, CheckpointMetadata, CheckpointPayload, Crisis,
    Events, GridPosition, InventoryItem, Logs, PhysicalEnvironment, Resource, SocialEnvironment,
};

pub const SCHEMA_VERSION_V1: &str = "1.0";
pub const MORAL_AGENT_TYPE: &str = "moral";

/// One stored revision of a simulation run.
///
/// A `run_id` may have several revisions; readers only ever see the most
/// recently created visible one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRun {
    pub id: i64,
    pub run_id: String,
    pub description: Option<String>,
    pub created_at: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSummary {
    pub id: i64,
    pub simulation_run_id: i64,
    pub time_step: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    pub id: i64,
    pub simulation_run_id: i64,
    pub run_id: String,
    pub time_step: i64,
    pub created_at: String,
    pub data: Value,
}

impl CheckpointRecord {
    /// Decodes the stored JSON into the typed checkpoint schema.
    pub fn payload(&self) -> Result<CheckpointPayload, serde_json::Error> {
        CheckpointPayload::from_value(&self.data)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunDetail {
    pub run: SimulationRun,
    pub checkpoints: Vec<CheckpointSummary>,
}

/// Derived statistics for a single checkpoint. Never persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_agents: usize,
    pub moral_agents: usize,
    pub non_moral_agents: usize,
    #[serde(rename = "averageHP")]
    pub average_hp: f64,
    #[serde(rename = "minHP")]
    pub min_hp: f64,
    #[serde(rename = "maxHP")]
    pub max_hp: f64,
    pub total_resources: f64,
    pub average_resources: f64,
    pub crisis_level: f64,
    /// Reputation statistics over the agents whose state reports a numeric `reputation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_reputation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reputation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reputation: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgentHistoryPoint {
    pub time_step: i64,
    pub moral_agents: usize,
    pub non_moral_agents: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub schema_version: String,
    pub run_id: String,
    pub time_step: i64,
    pub metrics: Option<MetricsSummary>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub checkpoint_count: usize,
    pub first_checkpoint_at: Option<String>,
    pub latest_checkpoint_at: Option<String>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RunNotFound,
    CheckpointNotFound,
    AgentNotFound,
    InvalidQuery,
    InvalidPayload,
    ServiceUnavailable,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub schema_version: String,
    pub query_type: String,
    pub run_id: String,
    pub time_step: Option<i64>,
    pub data: Value,
}

impl QueryResponse {
    pub fn new(
        query_type: impl Into<String>,
        run_id: impl Into<String>,
        time_step: Option<i64>,
        data: Value,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            query_type: query_type.into(),
            run_id: run_id.into(),
            time_step,
            data,
        }
    }
}
