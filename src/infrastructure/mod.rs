//! Infrastructure layer for external integrations.
//!
//! - [`persistence`] - Repository implementations backing the reference route groups

pub mod persistence;
