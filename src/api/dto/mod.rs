//! Data Transfer Objects for API requests and responses.
//!
//! Request DTOs derive `validator::Validate`; handlers call `validate()` before
//! touching a service so field problems surface as `ValidationError` envelopes.

pub mod auth;
pub mod catalog;
pub mod health;
pub mod listings;
pub mod pagination;
