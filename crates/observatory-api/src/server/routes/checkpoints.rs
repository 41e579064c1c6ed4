use axum::extract::{Path, Query, State};
use axum::Json;
use contracts::{CheckpointRecord, MetricsResponse, QueryResponse};
use metrics_core::DEFAULT_RECENT_ACTIONS;
use serde::Deserialize;
use serde_json::Value;

use crate::server::error::HttpApiError;
use crate::server::state::AppState;
use crate::server::util::{parse_time_step, query_response, MAX_RECENT_ACTIONS};

#[derive(Debug, Deserialize)]
pub(crate) struct AgentDetailQuery {
    recent_actions: Option<usize>,
}

pub(crate) async fn get_checkpoint(
    State(state): State<AppState>,
    Path((run_id, time_step)): Path<(String, String)>,
) -> Result<Json<CheckpointRecord>, HttpApiError> {
    let time_step = parse_time_step(&time_step)?;
    let inner = state.lock().await;
    let record = inner.catalog()?.get_checkpoint(&run_id, time_step)?;
    Ok(Json(record))
}

pub(crate) async fn put_checkpoint(
    State(state): State<AppState>,
    Path((run_id, time_step)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<CheckpointRecord>, HttpApiError> {
    let time_step = parse_time_step(&time_step)?;
    let mut inner = state.lock().await;
    let record = inner
        .catalog_mut()?
        .put_checkpoint(&run_id, time_step, &payload)?;
    Ok(Json(record))
}

pub(crate) async fn get_metrics(
    State(state): State<AppState>,
    Path((run_id, time_step)): Path<(String, String)>,
) -> Result<Json<MetricsResponse>, HttpApiError> {
    let time_step = parse_time_step(&time_step)?;
    let inner = state.lock().await;
    let response = inner.catalog()?.checkpoint_metrics(&run_id, time_step)?;
    Ok(Json(response))
}

pub(crate) async fn get_grid(
    State(state): State<AppState>,
    Path((run_id, time_step)): Path<(String, String)>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let time_step = parse_time_step(&time_step)?;
    let inner = state.lock().await;
    let grid = inner.catalog()?.grid(&run_id, time_step)?;
    query_response("grid", &run_id, Some(time_step), grid)
}

pub(crate) async fn get_agents(
    State(state): State<AppState>,
    Path((run_id, time_step)): Path<(String, String)>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let time_step = parse_time_step(&time_step)?;
    let inner = state.lock().await;
    let roster = inner.catalog()?.agents(&run_id, time_step)?;
    query_response("agents", &run_id, Some(time_step), roster)
}

pub(crate) async fn get_agent_detail(
    State(state): State<AppState>,
    Path((run_id, time_step, agent_id)): Path<(String, String, String)>,
    Query(query): Query<AgentDetailQuery>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let time_step = parse_time_step(&time_step)?;
    let limit = query
        .recent_actions
        .unwrap_or(DEFAULT_RECENT_ACTIONS)
        .min(MAX_RECENT_ACTIONS);

    let inner = state.lock().await;
    let detail = inner
        .catalog()?
        .agent_detail(&run_id, time_step, &agent_id, limit)?;
    query_response("agent_detail", &run_id, Some(time_step), detail)
}
