//! Application layer services.
//!
//! # Pipeline Components
//!
//! - [`services::rate_limiter::RateLimiter`] - Fixed-window per-client counting
//! - [`services::auth_service::AuthService`] - Credential issuing and verification
//! - [`services::upload_guard`] - Streaming multipart ingestion with limits
//!
//! # Route Group Services
//!
//! - [`services::account_service::AccountService`] - Registration and login
//! - [`services::catalog_service::CatalogService`] - Category lookups
//! - [`services::listing_service::ListingService`] - Listing CRUD and search

pub mod services;
