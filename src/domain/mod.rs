//! Domain layer for the reference route groups.
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//!
//! The domain layer has no dependencies on HTTP or the request pipeline. Repository
//! traits are implemented in [`crate::infrastructure::persistence`].

pub mod entities;
pub mod repositories;
