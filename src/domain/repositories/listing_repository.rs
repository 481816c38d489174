//! Repository trait for classified listings.

use async_trait::async_trait;
use uuid::Uuid;

use super::StoreError;
use crate::domain::entities::{Listing, NewListing};

/// Criteria for [`ListingRepository::search`]. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub text: Option<String>,
    pub category: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Repository interface for listing storage.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::InMemoryListingRepository`] - process-local store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn create(&self, listing: NewListing) -> Result<Listing, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError>;

    /// Listings matching `filter`, newest first.
    async fn search(&self, filter: ListingFilter) -> Result<Vec<Listing>, StoreError>;

    /// Removes a listing. Returns `false` if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
