//! Security headers and cross-origin filtering.

use std::collections::HashSet;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::api::pipeline::Flow;
use crate::config::Config;
use crate::error::{AppError, AuthFailure};

const ALLOWED_METHODS: &str = "GET, HEAD, PUT, PATCH, POST, DELETE";
const DEFAULT_ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const EXPOSED_HEADERS: &str = "Retry-After, WWW-Authenticate";
const PREFLIGHT_MAX_AGE_SECS: &str = "600";

/// Which cross-origin callers may talk to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Development: every origin is reflected back.
    AllowAny,
    /// Production: only exact matches of the configured origins.
    AllowList(HashSet<String>),
}

impl OriginPolicy {
    pub fn from_config(config: &Config) -> Self {
        if config.environment.is_production() {
            Self::AllowList(config.cors_allowed_origins.iter().cloned().collect())
        } else {
            Self::AllowAny
        }
    }

    pub fn evaluate(&self, headers: &HeaderMap) -> OriginCheck {
        let Some(origin) = headers.get(header::ORIGIN) else {
            return OriginCheck::Absent;
        };

        let allowed = match self {
            OriginPolicy::AllowAny => true,
            OriginPolicy::AllowList(origins) => origin
                .to_str()
                .is_ok_and(|o| origins.contains(o.trim_end_matches('/'))),
        };

        if allowed {
            OriginCheck::Allowed(origin.clone())
        } else {
            OriginCheck::Denied(origin.clone())
        }
    }
}

/// Result of checking a request's `Origin` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginCheck {
    /// Same-origin or non-browser request.
    Absent,
    Allowed(HeaderValue),
    Denied(HeaderValue),
}

/// First pipeline stage: rejects disallowed origins and answers CORS preflights.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] for a request from an origin outside the policy.
pub fn origin_stage(check: &OriginCheck, req: &Request) -> Result<Flow, AppError> {
    match check {
        OriginCheck::Denied(origin) => {
            tracing::warn!(
                origin = ?origin,
                path = %req.uri().path(),
                "Cross-origin request rejected"
            );
            Err(AppError::unauthorized(AuthFailure::DisallowedOrigin))
        }
        OriginCheck::Allowed(_) if is_preflight(req) => Ok(Flow::Respond(preflight(req))),
        _ => Ok(Flow::Continue),
    }
}

fn is_preflight(req: &Request) -> bool {
    req.method() == Method::OPTIONS
        && req
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

fn preflight(req: &Request) -> Response {
    let allow_headers = req
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or(HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS));

    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
    );
    response
}

/// Attaches the static security headers, plus CORS headers for an allowed origin.
///
/// Applied to every response the pipeline emits, error envelopes included.
pub fn decorate(mut response: Response, check: &OriginCheck) -> Response {
    let headers = response.headers_mut();

    // Content-Security-Policy is left to the documentation page, which needs inline assets.
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=15552000; includeSubDomains"),
    );
    headers.insert(
        header::X_DNS_PREFETCH_CONTROL,
        HeaderValue::from_static("off"),
    );
    headers.insert("X-Download-Options", HeaderValue::from_static("noopen"));
    headers.insert(
        "X-Permitted-Cross-Domain-Policies",
        HeaderValue::from_static("none"),
    );
    headers.insert(
        "Cross-Origin-Opener-Policy",
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        "Cross-Origin-Resource-Policy",
        HeaderValue::from_static("same-origin"),
    );
    headers.insert("Origin-Agent-Cluster", HeaderValue::from_static("?1"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("0"));

    if let OriginCheck::Allowed(origin) = check {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSED_HEADERS),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }

    response
}
