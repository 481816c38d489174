//! Handlers for the category catalog.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::dto::catalog::CategoryResponse;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/categories`
pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = state.catalog_service.categories().await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}

/// `GET /api/categories/{slug}`
pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = state.catalog_service.category(&slug).await?;
    Ok(Json(category.into()))
}
