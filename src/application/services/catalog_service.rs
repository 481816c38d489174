//! Category catalog lookups.

use std::sync::Arc;

use axum::http::StatusCode;

use crate::domain::entities::Category;
use crate::domain::repositories::CategoryRepository;
use crate::error::AppError;

pub struct CatalogService<C: CategoryRepository> {
    repository: Arc<C>,
}

impl<C: CategoryRepository> CatalogService<C> {
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    pub async fn categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.repository.list().await?)
    }

    /// # Errors
    ///
    /// Returns `404 Not Found` for an unknown slug.
    pub async fn category(&self, slug: &str) -> Result<Category, AppError> {
        self.repository
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::with_status(StatusCode::NOT_FOUND, "Category not found"))
    }

    pub async fn exists(&self, slug: &str) -> Result<bool, AppError> {
        Ok(self.repository.find_by_slug(slug).await?.is_some())
    }
}
