//! Handlers for account registration and profile lookup.

use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::auth::{RegisterRequest, UserResponse};
use crate::api::middleware::auth::Subject;
use crate::error::AppError;
use crate::state::AppState;

/// Creates an account.
///
/// # Endpoint
///
/// `POST /api/users/register`
///
/// # Errors
///
/// - `400` on invalid email, display name or password length
/// - `409` if the email is already registered
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;

    let user = state
        .account_service
        .register(
            &payload.email.to_lowercase(),
            payload.display_name.trim(),
            &payload.password,
        )
        .await?;

    tracing::info!(user_id = %user.id, "Account registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Returns the account of the authenticated caller.
///
/// # Endpoint
///
/// `GET /api/users/profile` (protected)
pub async fn profile_handler(
    State(state): State<AppState>,
    Subject(subject): Subject,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.account_service.profile(&subject).await?;
    Ok(Json(user.into()))
}
