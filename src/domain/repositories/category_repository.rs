//! Repository trait for listing categories.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::entities::Category;

/// Read-only category catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by name.
    async fn list(&self) -> Result<Vec<Category>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;
}
