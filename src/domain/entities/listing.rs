//! Classified listing entity.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Metadata of an image attached to a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: usize,
}

/// A classified ad published by a user.
#[derive(Debug, Clone)]
pub struct Listing {
    pub id: Uuid,
    /// Subject of the credential that created the listing.
    pub owner: String,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub category: String,
    pub images: Vec<ListingImage>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_owned_by(&self, subject: &str) -> bool {
        self.owner == subject
    }

    /// Case-insensitive match against title and description.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Input data for creating a new listing.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub owner: String,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub category: String,
    pub images: Vec<ListingImage>,
}
