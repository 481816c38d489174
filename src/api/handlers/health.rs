//! Handler for the health probe.

use axum::{Json, extract::State};
use chrono::Utc;

use crate::api::dto::health::HealthResponse;
use crate::state::AppState;

/// Reports that the instance is up.
///
/// # Endpoint
///
/// `GET /health`
///
/// Public and exempt from rate limiting, so load balancer probes never consume a
/// client's budget. A draining instance answers `503` from the pipeline instead.
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "timestamp": "2024-05-01T12:00:00Z",
///   "uptime": 3021.4,
///   "environment": "production",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
