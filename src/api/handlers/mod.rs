//! HTTP request handlers of the reference route groups.
//!
//! Each handler module corresponds to one route group; see
//! [`crate::api::routes::default_groups`] for the endpoint table.

pub mod auth;
pub mod categories;
pub mod docs;
pub mod health;
pub mod listings;
pub mod search;
pub mod users;

pub use health::health_handler;
