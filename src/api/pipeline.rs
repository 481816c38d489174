//! The request-processing pipeline.
//!
//! Every request runs the same fixed sequence of [`STAGES`]. A stage either lets the
//! request continue, answers it directly (CORS preflight) or fails with an
//! [`AppError`]; the first failure becomes the response and later stages never run.
//! The whole sequence runs under the request deadline, body ingestion included.
//!
//! ```text
//! shutdown gate ─► OriginFilter ─► RateLimit ─► Authenticate ─► MultipartGuard ─► Dispatch
//!                                                                                   │
//!            security/CORS headers ◄─ re-classification of raw error responses ◄───┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::to_bytes,
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    response::{IntoResponse, Response},
};

use crate::api::middleware::{
    auth::auth_stage,
    multipart::multipart_stage,
    rate_limit::{ClientIdentity, rate_limit_stage},
    security::{self, OriginCheck, OriginPolicy, origin_stage},
};
use crate::api::routes::{Access, Resolved, RouteTable, unrouted};
use crate::application::services::{AuthService, RateLimiter, UploadLimits};
use crate::error::{AppError, ErrorKind};
use crate::shutdown::ShutdownCoordinator;

/// Largest raw error body read back when re-classifying a response.
const MAX_RAW_ERROR_BODY: usize = 16 * 1024;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OriginFilter,
    RateLimit,
    Authenticate,
    MultipartGuard,
    Dispatch,
}

/// Stage order. Gating stages run before any route group sees the request.
pub const STAGES: [Stage; 5] = [
    Stage::OriginFilter,
    Stage::RateLimit,
    Stage::Authenticate,
    Stage::MultipartGuard,
    Stage::Dispatch,
];

/// What a passing stage wants next.
pub enum Flow {
    Continue,
    /// Answer the request now, skipping the remaining stages.
    Respond(Response),
}

/// Pipeline components, shared by every request of one server instance.
pub struct Pipeline {
    pub routes: RouteTable,
    pub origins: OriginPolicy,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth: Arc<AuthService>,
    pub upload_limits: UploadLimits,
    pub behind_proxy: bool,
    pub request_timeout: Duration,
    pub coordinator: Arc<ShutdownCoordinator>,
}

impl Pipeline {
    /// Runs the stages for an admitted request under the request deadline.
    ///
    /// The deadline covers body ingestion as well as dispatch, so a client that
    /// stalls mid-upload is answered with `504` like a slow handler.
    async fn run(&self, req: Request, origin: &OriginCheck) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match tokio::time::timeout(self.request_timeout, self.run_stages(req, origin)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(
                    method = %method,
                    path = %path,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "Request timed out"
                );
                AppError::timeout().into_response()
            }
        }
    }

    async fn run_stages(&self, mut req: Request, origin: &OriginCheck) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let resolved = self.routes.resolve(&method, &path);

        let client = ClientIdentity::from_request(&req, self.behind_proxy);
        req.extensions_mut().insert(client.clone());

        let access = resolved.map(|r| r.access).unwrap_or(Access::Public);
        let exempt = resolved.is_some_and(|r| !r.rate_limited);

        for stage in STAGES {
            let outcome = match stage {
                Stage::OriginFilter => origin_stage(origin, &req),
                Stage::RateLimit => rate_limit_stage(&self.rate_limiter, &client, exempt),
                Stage::Authenticate => auth_stage(&self.auth, &mut req, access).await,
                Stage::MultipartGuard => multipart_stage(&self.upload_limits, &mut req).await,
                Stage::Dispatch => return self.dispatch(resolved, req, method, path).await,
            };

            match outcome {
                Ok(Flow::Continue) => {}
                Ok(Flow::Respond(response)) => return response,
                Err(error) => {
                    tracing::debug!(stage = ?stage, kind = %error.kind(), "Request rejected");
                    return error.into_response();
                }
            }
        }

        // STAGES ends with Dispatch, which always returns.
        AppError::internal("pipeline finished without dispatching").into_response()
    }

    async fn dispatch(
        &self,
        resolved: Option<Resolved>,
        req: Request,
        method: Method,
        path: String,
    ) -> Response {
        let Some(resolved) = resolved else {
            return unrouted(method, req.uri());
        };

        let response = self.routes.dispatch(resolved, req).await;
        classify_raw(response, method, &path).await
    }
}

/// Re-classifies an error response that did not come from an [`AppError`]
/// (extractor rejections, `405 Method Not Allowed`, plain status tuples).
async fn classify_raw(response: Response, method: Method, path: &str) -> Response {
    let status = response.status();
    let unclassified = (status.is_client_error() || status.is_server_error())
        && response.extensions().get::<ErrorKind>().is_none();
    if !unclassified {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let body = to_bytes(response.into_body(), MAX_RAW_ERROR_BODY)
        .await
        .unwrap_or_default();
    let detail = String::from_utf8_lossy(&body);

    let mut classified =
        AppError::from_unclassified(status, method, path, detail.trim()).into_response();
    if let Some(allow) = allow {
        classified.headers_mut().insert(header::ALLOW, allow);
    }
    classified
}

/// Entry point for every request: shutdown gate, stages, then response headers.
pub async fn handle(State(pipeline): State<Arc<Pipeline>>, req: Request) -> Response {
    let origin = pipeline.origins.evaluate(req.headers());

    let response = match pipeline.coordinator.try_enter() {
        Some(_in_flight) => pipeline.run(req, &origin).await,
        None => {
            let mut response = AppError::unavailable().into_response();
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
            response
        }
    };

    security::decorate(response, &origin)
}

/// Wraps the pipeline in an axum router with request tracing.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(pipeline)
        .layer(crate::api::middleware::tracing::layer())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    #[test]
    fn test_stage_order() {
        assert_eq!(STAGES.first(), Some(&Stage::OriginFilter));
        assert_eq!(STAGES.last(), Some(&Stage::Dispatch));

        let position = |s: Stage| STAGES.iter().position(|x| *x == s).unwrap();
        assert!(position(Stage::RateLimit) < position(Stage::Authenticate));
        assert!(position(Stage::Authenticate) < position(Stage::MultipartGuard));
    }

    #[tokio::test]
    async fn test_classify_raw_method_not_allowed() {
        let mut raw = StatusCode::METHOD_NOT_ALLOWED.into_response();
        raw.headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET,HEAD"));

        let response = classify_raw(raw, Method::PUT, "/api/categories").await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.extensions().get::<ErrorKind>(),
            Some(&ErrorKind::InternalError)
        );
        assert_eq!(response.headers()[header::ALLOW], "GET,HEAD");
    }

    #[tokio::test]
    async fn test_classify_raw_keeps_classified_and_successful_responses() {
        let ok = Response::new(Body::from("fine"));
        assert_eq!(
            classify_raw(ok, Method::GET, "/").await.status(),
            StatusCode::OK
        );

        let classified = AppError::invalid_field("title", "is required").into_response();
        let response = classify_raw(classified, Method::POST, "/api/listings").await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["details"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_extractor_rejection_becomes_validation_error() {
        let raw = (StatusCode::UNPROCESSABLE_ENTITY, "missing field `email`").into_response();
        let response = classify_raw(raw, Method::POST, "/api/auth/login").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errorKind"], "ValidationError");
        assert_eq!(json["details"][0]["message"], "missing field `email`");
    }
}
