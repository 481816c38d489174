//! Per-client rate limiting stage.

use std::fmt;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
};

use crate::api::pipeline::Flow;
use crate::application::services::{Admission, RateLimiter};
use crate::error::AppError;

/// Key the rate limiter counts requests under.
///
/// # Key Extraction
///
/// - Directly exposed: the socket peer address
/// - Behind a trusted proxy: first `X-Forwarded-For` entry, then `X-Real-IP`,
///   then the peer address
///
/// Enable proxy mode only when a reverse proxy you control sets those headers;
/// otherwise clients can pick their own key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    pub fn from_request(req: &Request, behind_proxy: bool) -> Self {
        if behind_proxy && let Some(forwarded) = forwarded_for(req.headers()) {
            return Self(forwarded);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip().to_string()))
            .unwrap_or_else(|| Self("unknown".to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let first_forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    first_forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

/// Second pipeline stage: counts the request and rejects clients over the ceiling.
///
/// Groups that opted out of rate limiting (`exempt`) are neither counted nor rejected.
///
/// # Errors
///
/// Returns [`AppError::RateLimited`] carrying the time left in the client's window.
pub fn rate_limit_stage(
    limiter: &RateLimiter,
    client: &ClientIdentity,
    exempt: bool,
) -> Result<Flow, AppError> {
    if exempt {
        return Ok(Flow::Continue);
    }

    match limiter.admit(client.as_str()) {
        Admission::Allowed => Ok(Flow::Continue),
        Admission::Denied { retry_after } => {
            tracing::warn!(
                client = %client,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            metrics::counter!("gateway_rate_limited_total").increment(1);
            Err(AppError::rate_limited(retry_after))
        }
    }
}
