use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::{QueryResponse, RunDetail, SimulationRun, SCHEMA_VERSION_V1};
use serde::{Deserialize, Serialize};

use crate::server::error::HttpApiError;
use crate::server::state::AppState;
use crate::server::util::query_response;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    schema_version: &'static str,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRunRequest {
    #[serde(alias = "run_id")]
    run_id: String,
    description: Option<String>,
}

/// `{}` leaves the description as is; `{"description": null}` clears it.
#[derive(Debug, Deserialize)]
pub(crate) struct UpdateDescriptionRequest {
    #[serde(default, deserialize_with = "present_field")]
    description: Option<Option<String>>,
}

fn present_field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub(crate) struct HideRunResponse {
    success: bool,
    hidden: usize,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        schema_version: SCHEMA_VERSION_V1,
        status: "ok",
    })
}

pub(crate) async fn list_runs(
    State(state): State<AppState>,
) -> Result<Json<Vec<SimulationRun>>, HttpApiError> {
    let inner = state.lock().await;
    let runs = inner.catalog()?.list_runs()?;
    Ok(Json(runs))
}

pub(crate) async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<SimulationRun>), HttpApiError> {
    let mut inner = state.lock().await;
    let run = inner
        .catalog_mut()?
        .create_run(&request.run_id, request.description.as_deref())?;
    Ok((StatusCode::CREATED, Json(run)))
}

pub(crate) async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunDetail>, HttpApiError> {
    let inner = state.lock().await;
    let detail = inner.catalog()?.get_run(&run_id)?;
    Ok(Json(detail))
}

pub(crate) async fn hide_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<HideRunResponse>, HttpApiError> {
    let mut inner = state.lock().await;
    let hidden = inner.catalog_mut()?.hide_run(&run_id)?;
    Ok(Json(HideRunResponse {
        success: true,
        hidden,
    }))
}

pub(crate) async fn update_description(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<UpdateDescriptionRequest>,
) -> Result<Json<SimulationRun>, HttpApiError> {
    let mut inner = state.lock().await;
    let catalog = inner.catalog_mut()?;
    let run = match request.description {
        Some(description) => catalog.update_description(&run_id, description.as_deref())?,
        None => catalog.get_run(&run_id)?.run,
    };
    Ok(Json(run))
}

pub(crate) async fn get_timeline(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let inner = state.lock().await;
    let bounds = inner.catalog()?.timeline(&run_id)?;
    query_response("timeline", &run_id, None, bounds)
}

pub(crate) async fn get_agent_history(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let inner = state.lock().await;
    let history = inner.catalog()?.agent_history(&run_id)?;
    query_response("agent_history", &run_id, None, history)
}
