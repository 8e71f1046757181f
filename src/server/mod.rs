//! HTTP API exposing the crawl engine
//!
//! Two endpoints: `GET /api/health` for liveness and `POST /api/parse` to
//! run a crawl. The parse payload carries the start URL plus an optional
//! config file path and field-wise overrides; the merged configuration
//! goes through the same validation as every other entry point.

use crate::config::{load_config, ConfigOverrides};
use crate::crawler::{parse_site_async, CrawlResult};
use crate::{Result, ScoutError};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

/// Request body for `POST /api/parse`
#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub url: String,

    /// Optional path to a TOML/JSON config file on the server
    #[serde(default)]
    pub config: Option<String>,

    /// Field-wise overrides applied over the loaded configuration
    #[serde(default)]
    pub overrides: Option<ConfigOverrides>,
}

type ApiError = (StatusCode, Json<Value>);

fn detail(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "detail": message.into() })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn parse_endpoint(
    Json(payload): Json<ParseRequest>,
) -> std::result::Result<Json<CrawlResult>, ApiError> {
    let start_url = payload.url.trim().to_string();
    if start_url.is_empty() {
        return Err(detail(StatusCode::UNPROCESSABLE_ENTITY, "url is required"));
    }

    let config = load_config(
        payload.config.as_deref().map(Path::new),
        payload.overrides.as_ref(),
    )
    .map_err(|e| detail(StatusCode::BAD_REQUEST, e.to_string()))?;

    match parse_site_async(&start_url, &config).await {
        Ok(result) => Ok(Json(result)),
        Err(ScoutError::InvalidUrl(e)) => {
            Err(detail(StatusCode::BAD_REQUEST, format!("invalid start URL: {e}")))
        }
        Err(e) => {
            tracing::error!("unexpected parser error: {e}");
            Err(detail(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error",
            ))
        }
    }
}

/// Builds the API router.
pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/parse", post(parse_endpoint))
}

/// Binds `addr` and serves the API until the process is stopped.
pub async fn serve(addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API listening on http://{addr}");
    axum::serve(listener, router()).await?;
    Ok(())
}
