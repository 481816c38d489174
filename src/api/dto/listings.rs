//! DTOs for listing and search endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::dto::pagination::{PageMeta, PaginationParams};
use crate::domain::entities::{Listing, ListingImage};

/// Query string of `GET /api/listings`.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListingQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Query string of `GET /api/search`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 2, max = 200, message = "must be 2 to 200 characters"))]
    pub q: Option<String>,

    pub category: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: usize,
}

impl From<ListingImage> for ImageResponse {
    fn from(image: ListingImage) -> Self {
        Self {
            file_name: image.file_name,
            content_type: image.content_type,
            size: image.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub description: String,
    /// Decimal price, e.g. `"42.50"`.
    pub price: String,
    pub price_cents: u64,
    pub category: String,
    pub images: Vec<ImageResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            owner: listing.owner,
            title: listing.title,
            description: listing.description,
            price: format!("{}.{:02}", listing.price_cents / 100, listing.price_cents % 100),
            price_cents: listing.price_cents,
            category: listing.category,
            images: listing.images.into_iter().map(ImageResponse::from).collect(),
            created_at: listing.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListingPage {
    pub items: Vec<ListingResponse>,
    pub pagination: PageMeta,
}
