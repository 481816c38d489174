//! Error taxonomy and the classifier that renders every failure as an [`ErrorEnvelope`].
//!
//! Each pipeline stage and every route group fails into one [`AppError`] variant at
//! the point of failure. [`classify`] is an exhaustive match over that closed set, so
//! a failure can never escape to the client as an unstructured response.
//!
//! # Response Contract
//!
//! ```json
//! {
//!   "statusCode": 429,
//!   "errorKind": "RateLimitError",
//!   "message": "Rate limit exceeded, retry in 42 seconds",
//!   "retryAfter": 42
//! }
//! ```

use std::fmt;
use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::domain::repositories::StoreError;

/// Client-facing message for every credential failure.
///
/// The same text is used for missing, malformed, forged and expired credentials so
/// the response cannot be used to probe which check failed.
pub const AUTH_ERROR_MESSAGE: &str = "Invalid or expired token";

const DATABASE_ERROR_MESSAGE: &str = "A database error occurred";
const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Category of a failed request, serialized as `errorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ValidationError,
    AuthError,
    RateLimitError,
    NotFoundError,
    DatabaseError,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::AuthError => "AuthError",
            ErrorKind::RateLimitError => "RateLimitError",
            ErrorKind::NotFoundError => "NotFoundError",
            ErrorKind::DatabaseError => "DatabaseError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Why a request failed the authentication or origin check.
///
/// Only ever logged. Clients always see [`AUTH_ERROR_MESSAGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingCredential,
    MalformedCredential,
    InvalidSignature,
    Expired,
    DisallowedOrigin,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            AuthFailure::MissingCredential => "credential missing",
            AuthFailure::MalformedCredential => "credential malformed",
            AuthFailure::InvalidSignature => "credential signature invalid",
            AuthFailure::Expired => "credential expired",
            AuthFailure::DisallowedOrigin => "origin not allowed",
        };
        f.write_str(reason)
    }
}

/// Every failure the gateway can produce.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldViolation>,
    },

    #[error("authentication failed: {0}")]
    Unauthorized(AuthFailure),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("route {method}:{path} not found")]
    NotFound { method: Method, path: String },

    #[error("storage failure: {0}")]
    Database(#[from] StoreError),

    /// Anything else. `status` is whatever the failing component reported.
    #[error("{message}")]
    Internal { status: StatusCode, message: String },
}

impl AppError {
    pub fn validation(message: impl Into<String>, fields: Vec<FieldViolation>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Validation failure for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let violation = FieldViolation::new(field, message);
        Self::Validation {
            message: "Validation failed".to_string(),
            fields: vec![violation],
        }
    }

    pub fn unauthorized(reason: AuthFailure) -> Self {
        Self::Unauthorized(reason)
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn not_found(method: Method, path: impl Into<String>) -> Self {
        Self::NotFound {
            method,
            path: path.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// A failure that reports its own status code (e.g. `409 Conflict` from a route group).
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Internal {
            status,
            message: message.into(),
        }
    }

    /// Rejection issued while the server is draining.
    pub fn unavailable() -> Self {
        Self::with_status(
            StatusCode::SERVICE_UNAVAILABLE,
            "Server is shutting down, retry against another instance",
        )
    }

    pub fn timeout() -> Self {
        Self::with_status(StatusCode::GATEWAY_TIMEOUT, "Request timed out")
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::ValidationError,
            AppError::Unauthorized(_) => ErrorKind::AuthError,
            AppError::RateLimited { .. } => ErrorKind::RateLimitError,
            AppError::NotFound { .. } => ErrorKind::NotFoundError,
            AppError::Database(_) => ErrorKind::DatabaseError,
            AppError::Internal { .. } => ErrorKind::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { status, .. } => *status,
        }
    }

    /// Re-classifies an error response that was produced without going through
    /// [`AppError`], such as an extractor rejection or a `405` from a method router.
    ///
    /// `detail` is the raw response body and is only surfaced for client errors.
    pub fn from_unclassified(status: StatusCode, method: Method, path: &str, detail: &str) -> Self {
        match status {
            StatusCode::BAD_REQUEST
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
            | StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = if detail.is_empty() {
                    status.canonical_reason().unwrap_or("Invalid request body")
                } else {
                    detail
                };
                Self::validation(
                    "Validation failed",
                    vec![FieldViolation::new("body", detail)],
                )
            }
            StatusCode::UNAUTHORIZED => Self::unauthorized(AuthFailure::MissingCredential),
            StatusCode::NOT_FOUND => Self::not_found(method, path),
            StatusCode::TOO_MANY_REQUESTS => Self::rate_limited(Duration::from_secs(1)),
            other => Self::with_status(
                other,
                other.canonical_reason().unwrap_or("Request failed"),
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldViolation> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldViolation::new(field.to_string(), message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        Self::validation("Validation failed", fields)
    }
}

/// Uniform failure body emitted for every rejected or failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub error_kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Seconds until the client may retry (rate limiting only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Maps a failure to its envelope.
///
/// Server-side detail (storage errors, messages of 5xx failures) never reaches the
/// envelope; it is logged by [`AppError::into_response`] instead.
pub fn classify(error: &AppError) -> ErrorEnvelope {
    let status = error.status_code();
    let mut envelope = ErrorEnvelope {
        status_code: status.as_u16(),
        error_kind: error.kind(),
        message: String::new(),
        details: None,
        retry_after: None,
    };

    match error {
        AppError::Validation { message, fields } => {
            envelope.message = message.clone();
            envelope.details = Some(json!(fields));
        }
        AppError::Unauthorized(_) => {
            envelope.message = AUTH_ERROR_MESSAGE.to_string();
        }
        AppError::RateLimited { retry_after } => {
            let secs = retry_after_secs(*retry_after);
            envelope.message = format!("Rate limit exceeded, retry in {secs} seconds");
            envelope.retry_after = Some(secs);
        }
        AppError::NotFound { method, path } => {
            envelope.message = format!("Route {method}:{path} not found");
            envelope.details = Some(json!({ "method": method.as_str(), "path": path }));
        }
        AppError::Database(_) => {
            envelope.message = DATABASE_ERROR_MESSAGE.to_string();
        }
        AppError::Internal { status, message } => {
            let hide = status.is_server_error() && *status != StatusCode::SERVICE_UNAVAILABLE;
            envelope.message = if hide {
                INTERNAL_ERROR_MESSAGE.to_string()
            } else {
                message.clone()
            };
        }
    }

    envelope
}

/// Whole seconds, rounded up, never below one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let envelope = classify(&self);
        let kind = envelope.error_kind;

        match &self {
            AppError::Database(source) => {
                tracing::error!(error = %source, kind = %kind, "Storage failure");
            }
            AppError::Internal { status, message } if status.is_server_error() => {
                tracing::error!(
                    error = %message,
                    status = status.as_u16(),
                    kind = %kind,
                    "Server error occurred"
                );
            }
            AppError::Unauthorized(reason) => {
                tracing::debug!(reason = %reason, kind = %kind, "Authentication rejected");
            }
            other => {
                tracing::debug!(error = %other, kind = %kind, "Client error occurred");
            }
        }
        metrics::counter!("gateway_error_responses_total", "kind" => kind.as_str()).increment(1);

        let status = self.status_code();
        let mut response = (status, Json(envelope.clone())).into_response();

        if let Some(secs) = envelope.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        if kind == ErrorKind::AuthError {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response.extensions_mut().insert(kind);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_failure() -> Vec<(AppError, u16, ErrorKind)> {
        vec![
            (
                AppError::invalid_field("title", "required"),
                400,
                ErrorKind::ValidationError,
            ),
            (
                AppError::unauthorized(AuthFailure::Expired),
                401,
                ErrorKind::AuthError,
            ),
            (
                AppError::rate_limited(Duration::from_secs(30)),
                429,
                ErrorKind::RateLimitError,
            ),
            (
                AppError::not_found(Method::GET, "/nowhere"),
                404,
                ErrorKind::NotFoundError,
            ),
            (
                AppError::Database(StoreError::Unavailable("pool closed".into())),
                500,
                ErrorKind::DatabaseError,
            ),
            (
                AppError::internal("boom"),
                500,
                ErrorKind::InternalError,
            ),
            (
                AppError::with_status(StatusCode::CONFLICT, "Email already registered"),
                409,
                ErrorKind::InternalError,
            ),
        ]
    }

    #[test]
    fn test_every_failure_maps_to_documented_status() {
        for (error, status, kind) in every_failure() {
            let envelope = classify(&error);
            assert_eq!(envelope.status_code, status, "{error}");
            assert_eq!(envelope.error_kind, kind, "{error}");
            assert!(!envelope.message.is_empty());
        }
    }

    #[test]
    fn test_auth_message_does_not_reveal_reason() {
        let reasons = [
            AuthFailure::MissingCredential,
            AuthFailure::MalformedCredential,
            AuthFailure::InvalidSignature,
            AuthFailure::Expired,
            AuthFailure::DisallowedOrigin,
        ];

        for reason in reasons {
            let envelope = classify(&AppError::unauthorized(reason));
            assert_eq!(envelope.message, AUTH_ERROR_MESSAGE);
            assert!(envelope.details.is_none());
        }
    }

    #[test]
    fn test_database_detail_is_not_leaked() {
        let error = AppError::Database(StoreError::Unavailable(
            "connection refused at 10.0.0.5:5432".into(),
        ));
        let envelope = classify(&error);

        assert_eq!(envelope.message, DATABASE_ERROR_MESSAGE);
        assert!(envelope.details.is_none());
    }

    #[test]
    fn test_internal_server_error_message_is_generic() {
        let envelope = classify(&AppError::internal("index out of bounds at listing.rs:42"));
        assert_eq!(envelope.message, INTERNAL_ERROR_MESSAGE);

        let envelope = classify(&AppError::unavailable());
        assert_eq!(envelope.status_code, 503);
        assert!(envelope.message.contains("shutting down"));
    }

    #[test]
    fn test_token_in_message_is_not_an_auth_error() {
        let error = AppError::Database(StoreError::Unavailable("token table locked".into()));
        assert_eq!(classify(&error).error_kind, ErrorKind::DatabaseError);

        let error = AppError::invalid_field("token", "must not be empty");
        assert_eq!(classify(&error).error_kind, ErrorKind::ValidationError);
    }

    #[test]
    fn test_rate_limit_envelope_carries_retry_after() {
        let envelope = classify(&AppError::rate_limited(Duration::from_millis(41_200)));
        assert_eq!(envelope.retry_after, Some(42));
        assert!(envelope.message.contains("42"));
    }

    #[test]
    fn test_retry_after_rounds_up_and_is_positive() {
        assert_eq!(retry_after_secs(Duration::from_secs(60)), 60);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn test_not_found_includes_method_and_path() {
        let envelope = classify(&AppError::not_found(Method::DELETE, "/api/unknown"));
        assert_eq!(envelope.message, "Route DELETE:/api/unknown not found");
        assert_eq!(envelope.details.unwrap()["path"], "/api/unknown");
    }

    #[test]
    fn test_from_unclassified() {
        let error = AppError::from_unclassified(
            StatusCode::UNPROCESSABLE_ENTITY,
            Method::POST,
            "/x",
            "missing field `email`",
        );
        assert_eq!(error.kind(), ErrorKind::ValidationError);

        let error =
            AppError::from_unclassified(StatusCode::METHOD_NOT_ALLOWED, Method::PUT, "/x", "");
        assert_eq!(error.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(error.kind(), ErrorKind::InternalError);
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = classify(&AppError::rate_limited(Duration::from_secs(5)));
        let value = serde_json::to_value(envelope).unwrap();
        assert_eq!(value["statusCode"], 429);
        assert_eq!(value["errorKind"], "RateLimitError");
        assert_eq!(value["retryAfter"], 5);
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_response_headers() {
        let response = AppError::rate_limited(Duration::from_secs(7)).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
        assert_eq!(
            response.extensions().get::<ErrorKind>(),
            Some(&ErrorKind::RateLimitError)
        );

        let response = AppError::unauthorized(AuthFailure::Expired).into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
