//! Handler for listing search.

use axum::{
    Json,
    extract::{Query, State},
};
use validator::Validate;

use crate::api::dto::listings::{ListingPage, ListingResponse, SearchQuery};
use crate::api::dto::pagination::PageMeta;
use crate::domain::repositories::ListingFilter;
use crate::error::AppError;
use crate::state::AppState;

/// Searches listings by text and category.
///
/// # Endpoint
///
/// `GET /api/search?q=&category=&page=&page_size=` (protected)
///
/// `q` matches title and description, case-insensitively. Without `q` and
/// `category` every listing matches.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListingPage>, AppError> {
    query.validate()?;
    let pagination = query.pagination();
    let (offset, limit) = pagination.offset_limit()?;

    let listings = state
        .listing_service
        .search(ListingFilter {
            text: query.q.map(|q| q.trim().to_string()),
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
