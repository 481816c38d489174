//! In-memory repository implementations.
//!
//! Process-local stores guarded by `tokio::sync::RwLock`. Data lives as long as the
//! server instance and is not shared between instances.
//!
//! # Repositories
//!
//! - [`InMemoryUserRepository`] - Accounts keyed by id, unique by email
//! - [`InMemoryCategoryRepository`] - Seeded category catalog
//! - [`InMemoryListingRepository`] - Listings with text/category search

pub mod memory_category_repository;
pub mod memory_listing_repository;
pub mod memory_user_repository;

pub use memory_category_repository::InMemoryCategoryRepository;
pub use memory_listing_repository::InMemoryListingRepository;
pub use memory_user_repository::InMemoryUserRepository;
