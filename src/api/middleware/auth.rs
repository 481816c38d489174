//! Bearer credential authentication stage.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
};
use axum_auth::AuthBearer;

use crate::api::pipeline::Flow;
use crate::api::routes::Access;
use crate::application::services::AuthService;
use crate::error::{AppError, AuthFailure};

/// Verified credential subject of the current request.
///
/// Inserted by the authentication stage for protected endpoints. Handlers take it as
/// an extractor:
///
/// ```rust,ignore
/// pub async fn profile_handler(Subject(user): Subject) -> ... { }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Subject {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Subject>()
            .cloned()
            .ok_or(AppError::unauthorized(AuthFailure::MissingCredential))
    }
}

/// Third pipeline stage: verifies the bearer credential of protected endpoints.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <credential>
/// ```
///
/// Public endpoints pass through untouched.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] if the header is missing or not a bearer
/// credential, or if the credential is malformed, forged or expired.
pub async fn auth_stage(
    auth: &AuthService,
    req: &mut Request,
    access: Access,
) -> Result<Flow, AppError> {
    if access == Access::Public {
        return Ok(Flow::Continue);
    }

    let (mut parts, body) = std::mem::take(req).into_parts();
    let bearer = AuthBearer::from_request_parts(&mut parts, &()).await;
    *req = Request::from_parts(parts, body);

    let AuthBearer(token) = bearer.map_err(|_| {
        let reason = if req.headers().contains_key(axum::http::header::AUTHORIZATION) {
            AuthFailure::MalformedCredential
        } else {
            AuthFailure::MissingCredential
        };
        AppError::unauthorized(reason)
    })?;

    let subject = auth.verify(&token)?;
    req.extensions_mut().insert(Subject(subject));

    Ok(Flow::Continue)
}
