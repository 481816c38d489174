//! Core domain entities of the marketplace route groups.
//!
//! Entities are plain data structures. Creation inputs use separate `New*` structs.
//!
//! # Entity Types
//!
//! - [`User`] - A registered account
//! - [`Category`] - A listing category
//! - [`Listing`] - A classified ad with attached image metadata

pub mod category;
pub mod listing;
pub mod user;

pub use category::Category;
pub use listing::{Listing, ListingImage, NewListing};
pub use user::{NewUser, User};
