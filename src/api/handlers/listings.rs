//! Handlers for listing CRUD.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::api::dto::listings::{ListingPage, ListingQuery, ListingResponse};
use crate::api::dto::pagination::PageMeta;
use crate::api::middleware::auth::Subject;
use crate::api::middleware::multipart::Uploaded;
use crate::domain::repositories::ListingFilter;
use crate::error::AppError;
use crate::state::AppState;

/// Lists listings, newest first.
///
/// # Endpoint
///
/// `GET /api/listings?category=&page=&page_size=`
pub async fn list_listings_handler(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingPage>, AppError> {
    let pagination = query.pagination();
    let (offset, limit) = pagination.offset_limit()?;

    let listings = state
        .listing_service
        .search(ListingFilter {
            text: None,
            category: query.category,
            limit,
            offset,
        })
        .await?;

    Ok(Json(ListingPage {
        pagination: PageMeta::new(&pagination, listings.len()),
        items: listings.into_iter().map(ListingResponse::from).collect(),
    }))
}

/// `GET /api/listings/{id}`
pub async fn get_listing_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = state.listing_service.get(id).await?;
    Ok(Json(listing.into()))
}

/// Publishes a listing from a multipart form.
///
/// # Endpoint
///
/// `POST /api/listings` (protected, `multipart/form-data`)
///
/// # Form Fields
///
/// - `title` (required)
/// - `description`
/// - `price` (required): decimal amount, e.g. `42.50`
/// - `category` (required): category slug
/// - `images`: up to the configured file limit, `image/*` only
///
/// Upload limits are enforced by the pipeline before this handler runs.
pub async fn create_listing_handler(
    State(state): State<AppState>,
    Subject(owner): Subject,
    Uploaded(form): Uploaded,
) -> Result<(StatusCode, Json<ListingResponse>), AppError> {
    let listing = state.listing_service.create(&owner, &form).await?;
    Ok((StatusCode::CREATED, Json(listing.into())))
}

/// Deletes a listing owned by the caller.
///
/// # Endpoint
///
/// `DELETE /api/listings/{id}` (protected)
///
/// # Errors
///
/// - `403` if another user owns the listing
/// - `404` if it does not exist
pub async fn delete_listing_handler(
    State(state): State<AppState>,
    Subject(subject): Subject,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.listing_service.delete(&subject, id).await?;
    tracing::info!(listing_id = %id, "Listing deleted");
    Ok(StatusCode::NO_CONTENT)
}
