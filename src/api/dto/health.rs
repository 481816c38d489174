//! DTOs for the health probe.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server instance started.
    pub uptime: f64,
    pub environment: &'static str,
    pub version: &'static str,
}
