//! Handlers for credential issuing.

use axum::{Json, extract::State};
use validator::Validate;

use crate::api::dto::auth::{LoginRequest, TokenResponse};
use crate::api::middleware::auth::Subject;
use crate::error::AppError;
use crate::state::AppState;

/// Exchanges an email/password pair for a bearer credential.
///
/// # Endpoint
///
/// `POST /api/auth/login`
///
/// # Errors
///
/// - `400` if the body is not a valid login request
/// - `401` if the email is unknown or the password is wrong
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    payload.validate()?;

    let user = state
        .account_service
        .login(&payload.email, &payload.password)
        .await?;
    let credential = state.auth_service.issue(&user.id.to_string())?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(credential.into()))
}

/// Issues a fresh credential for the subject of a currently valid one.
///
/// # Endpoint
///
/// `POST /api/auth/refresh` (protected)
///
/// The old credential stays valid until its own expiry.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Subject(subject): Subject,
) -> Result<Json<TokenResponse>, AppError> {
    let credential = state.auth_service.issue(&subject)?;
    Ok(Json(credential.into()))
}
