//! Control API route handlers.
//!
//! All endpoints return JSON. State is the shared `GridService` handle.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::service::{EngineStatus, GridService, TickOutcome};
use crate::types::{CycleSummary, GridConfig, GridError, Strategy};

pub type AppState = GridService;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    pub grid: GridConfig,
    pub strategy: Strategy,
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum TickResponse {
    Completed { summary: CycleSummary },
    Skipped,
}

impl From<TickOutcome> for TickResponse {
    fn from(outcome: TickOutcome) -> Self {
        match outcome {
            TickOutcome::Completed(summary) => Self::Completed { summary },
            TickOutcome::Skipped => Self::Skipped,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// `GridError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub GridError);

impl From<GridError> for ApiError {
    fn from(e: GridError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GridError::Configuration(_) | GridError::Geometry(_) => StatusCode::BAD_REQUEST,
            GridError::AlreadyRunning | GridError::NotRunning => StatusCode::CONFLICT,
            GridError::GatewayRead(_) | GridError::Submission(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(service): State<AppState>) -> Json<EngineStatus> {
    Json(service.status().await)
}

/// GET /api/cycles
pub async fn get_cycles(State(service): State<AppState>) -> Json<Vec<CycleSummary>> {
    Json(service.recent_cycles().await)
}

/// POST /api/start
pub async fn start(
    State(service): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<EngineStatus>, ApiError> {
    service
        .start(req.grid, req.strategy, Duration::from_millis(req.interval_ms))
        .await?;
    Ok(Json(service.status().await))
}

/// POST /api/stop
pub async fn stop(State(service): State<AppState>) -> Json<EngineStatus> {
    service.stop().await;
    Json(service.status().await)
}

/// POST /api/tick
pub async fn tick(State(service): State<AppState>) -> Result<Json<TickResponse>, ApiError> {
    let outcome = service.tick().await?;
    Ok(Json(outcome.into()))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
