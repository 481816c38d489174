//! Repository trait definitions for the domain layer.
//!
//! Traits define the contract for data operations; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are auto-generated
//! via `mockall` for testing.
//!
//! Every repository fails with [`StoreError`], which the error classifier always
//! renders as a `DatabaseError` without exposing its detail.
//!
//! # Available Repositories
//!
//! - [`UserRepository`] - Account storage
//! - [`CategoryRepository`] - Category catalog
//! - [`ListingRepository`] - Listing CRUD and search

use thiserror::Error;

pub mod category_repository;
pub mod listing_repository;
pub mod user_repository;

pub use category_repository::CategoryRepository;
pub use listing_repository::{ListingFilter, ListingRepository};
pub use user_repository::UserRepository;

#[cfg(test)]
pub use category_repository::MockCategoryRepository;
#[cfg(test)]
pub use listing_repository::MockListingRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;

/// Persistence-layer failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}
