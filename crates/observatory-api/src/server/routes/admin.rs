use axum::extract::{Path, State};
use axum::Json;
use contracts::SimulationRun;
use serde::Serialize;

use crate::server::error::HttpApiError;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct PurgeRunResponse {
    success: bool,
    purged: usize,
}

pub(crate) async fn list_hidden_runs(
    State(state): State<AppState>,
) -> Result<Json<Vec<SimulationRun>>, HttpApiError> {
    let inner = state.lock().await;
    let runs = inner.catalog()?.list_hidden_runs()?;
    Ok(Json(runs))
}

pub(crate) async fn restore_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<SimulationRun>, HttpApiError> {
    let mut inner = state.lock().await;
    let run = inner.catalog_mut()?.restore_run(&run_id)?;
    Ok(Json(run))
}

pub(crate) async fn purge_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<PurgeRunResponse>, HttpApiError> {
    let mut inner = state.lock().await;
    let purged = inner.catalog_mut()?.purge_run(&run_id)?;
    Ok(Json(PurgeRunResponse {
        success: true,
        purged,
    }))
}
