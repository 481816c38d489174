//! Services of the application layer.
//!
//! The request pipeline's gating components ([`RateLimiter`], [`AuthService`] and the
//! [`upload_guard`]) live here next to the services backing the reference route groups.

pub mod account_service;
pub mod auth_service;
pub mod catalog_service;
pub mod listing_service;
pub mod rate_limiter;
pub mod upload_guard;

pub use account_service::AccountService;
pub use auth_service::{AuthService, Credential};
pub use catalog_service::CatalogService;
pub use listing_service::ListingService;
pub use rate_limiter::{Admission, RateLimiter};
pub use upload_guard::{ParsedParts, UploadLimits};
