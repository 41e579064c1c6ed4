use axum::http::header::{HeaderName, HeaderValue};
use axum::http::HeaderMap;
use axum::Json;
use contracts::QueryResponse;
use serde::Serialize;

use super::error::HttpApiError;

pub(crate) const MAX_RECENT_ACTIONS: usize = 100;

pub(crate) fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET,POST,OPTIONS,PUT,PATCH,DELETE"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-max-age"),
        HeaderValue::from_static("3600"),
    );
}

pub(crate) fn parse_time_step(raw: &str) -> Result<i64, HttpApiError> {
    raw.trim().parse::<i64>().map_err(|_| {
        HttpApiError::invalid_query(
            "time_step must be an integer",
            Some(format!("time_step={raw}")),
        )
    })
}

pub(crate) fn query_response(
    query_type: &str,
    run_id: &str,
    time_step: Option<i64>,
    data: impl Serialize,
) -> Result<Json<QueryResponse>, HttpApiError> {
    let data = serde_json::to_value(data).map_err(|err| {
        HttpApiError::internal("failed to encode query response", Some(err.to_string()))
    })?;
    Ok(Json(QueryResponse::new(query_type, run_id, time_step, data)))
}
