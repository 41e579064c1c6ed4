use std::net::SocketAddr;

use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::{CatalogError, RunCatalog};

mod error;
mod routes;
mod state;
mod util;

pub use state::AppState;

use routes::{admin, checkpoints, runs};
use util::apply_cors_headers;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Serves the API until Ctrl-C, then closes the store.
pub async fn serve(catalog: RunCatalog, addr: SocketAddr) -> Result<(), ServerError> {
    let state = AppState::new(catalog);
    let app = router(state.clone());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "observatory api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await?;
    tracing::info!("run store closed");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(runs::health))
        .route("/api/v1/runs", get(runs::list_runs).post(runs::create_run))
        .route(
            "/api/v1/runs/{run_id}",
            get(runs::get_run).delete(runs::hide_run),
        )
        .route(
            "/api/v1/runs/{run_id}/description",
            patch(runs::update_description),
        )
        .route("/api/v1/runs/{run_id}/timeline", get(runs::get_timeline))
        .route(
            "/api/v1/runs/{run_id}/agent_history",
            get(runs::get_agent_history),
        )
        .route(
            "/api/v1/runs/{run_id}/checkpoints/{time_step}",
            get(checkpoints::get_checkpoint).put(checkpoints::put_checkpoint),
        )
        .route(
            "/api/v1/runs/{run_id}/checkpoints/{time_step}/metrics",
            get(checkpoints::get_metrics),
        )
        .route(
            "/api/v1/runs/{run_id}/checkpoints/{time_step}/grid",
            get(checkpoints::get_grid),
        )
        .route(
            "/api/v1/runs/{run_id}/checkpoints/{time_step}/agents",
            get(checkpoints::get_agents),
        )
        .route(
            "/api/v1/runs/{run_id}/checkpoints/{time_step}/agents/{agent_id}",
            get(checkpoints::get_agent_detail),
        )
        .route("/api/v1/admin/hidden-runs", get(admin::list_hidden_runs))
        .route(
            "/api/v1/admin/hidden-runs/{run_id}/restore",
            post(admin::restore_run),
        )
        .route("/api/v1/admin/runs/{run_id}", delete(admin::purge_run))
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state)
}

async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = Response::new(axum::body::Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests;
