//! Listing publication, lookup and search.

use std::sync::Arc;

use axum::http::StatusCode;
use uuid::Uuid;

use crate::application::services::upload_guard::ParsedParts;
use crate::domain::entities::{Listing, ListingImage, NewListing};
use crate::domain::repositories::{CategoryRepository, ListingFilter, ListingRepository};
use crate::error::{AppError, FieldViolation};

/// Largest page returned by list and search.
pub const MAX_PAGE_SIZE: usize = 100;

/// Service for publishing and querying listings.
pub struct ListingService<L: ListingRepository, C: CategoryRepository> {
    listings: Arc<L>,
    categories: Arc<C>,
}

impl<L: ListingRepository, C: CategoryRepository> ListingService<L, C> {
    pub fn new(listings: Arc<L>, categories: Arc<C>) -> Self {
        Self {
            listings,
            categories,
        }
    }

    /// Creates a listing from an already size-checked multipart form.
    ///
    /// Expected fields: `title`, `description`, `price` (decimal, e.g. `42.50`),
    /// `category` (slug). Files under `images` must have an `image/*` content type.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] listing every invalid field.
    pub async fn create(&self, owner: &str, form: &ParsedParts) -> Result<Listing, AppError> {
        let mut violations = Vec::new();

        let title = form.field("title").map(str::trim).unwrap_or_default();
        if title.is_empty() {
            violations.push(FieldViolation::new("title", "is required"));
        }

        let description = form.field("description").map(str::trim).unwrap_or_default();

        let price_cents = match form.field("price").map(parse_price) {
            Some(Some(cents)) => cents,
            Some(None) => {
                violations.push(FieldViolation::new(
                    "price",
                    "must be a positive amount with at most two decimals",
                ));
                0
            }
            None => {
                violations.push(FieldViolation::new("price", "is required"));
                0
            }
        };

        let category = form.field("category").map(str::trim).unwrap_or_default();
        if category.is_empty() {
            violations.push(FieldViolation::new("category", "is required"));
        } else if self.categories.find_by_slug(category).await?.is_none() {
            violations.push(FieldViolation::new("category", "unknown category"));
        }

        let mut images = Vec::new();
        for file in form.files_named("images") {
            let is_image = file
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"));
            if !is_image {
                violations.push(FieldViolation::new(
                    "images",
                    format!("'{}' is not an image", file.file_name),
                ));
                continue;
            }
            images.push(ListingImage {
                file_name: file.file_name.clone(),
                content_type: file.content_type.clone(),
                size: file.size(),
            });
        }

        if !violations.is_empty() {
            return Err(AppError::validation("Validation failed", violations));
        }

        let listing = self
            .listings
            .create(NewListing {
                owner: owner.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                price_cents,
                category: category.to_string(),
                images,
            })
            .await?;

        tracing::info!(listing_id = %listing.id, owner = %owner, "Listing created");
        Ok(listing)
    }

    /// # Errors
    ///
    /// Returns `404 Not Found` if the listing does not exist.
    pub async fn get(&self, id: Uuid) -> Result<Listing, AppError> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or_else(listing_not_found)
    }

    pub async fn search(&self, mut filter: ListingFilter) -> Result<Vec<Listing>, AppError> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        Ok(self.listings.search(filter).await?)
    }

    /// Deletes a listing owned by `subject`.
    ///
    /// # Errors
    ///
    /// Returns `404 Not Found` if it does not exist and `403 Forbidden` if another
    /// user owns it.
    pub async fn delete(&self, subject: &str, id: Uuid) -> Result<(), AppError> {
        let listing = self.get(id).await?;
        if !listing.is_owned_by(subject) {
            return Err(AppError::with_status(
                StatusCode::FORBIDDEN,
                "Only the owner can delete a listing",
            ));
        }

        if !self.listings.delete(id).await? {
            return Err(listing_not_found());
        }
        Ok(())
    }
}

fn listing_not_found() -> AppError {
    AppError::with_status(StatusCode::NOT_FOUND, "Listing not found")
}

/// Parses `"42"`, `"42.5"` or `"42.50"` into cents. Signs and zero are rejected.
fn parse_price(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };
    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if whole.is_empty() || frac.len() > 2 || !digits(whole) || !digits(frac) {
        return None;
    }
    let whole: u64 = whole.parse().ok()?;
    let frac: u64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    whole
        .checked_mul(100)?
        .checked_add(frac)
        .filter(|cents| *cents > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::upload_guard::{FormField, UploadedFile};
    use crate::domain::entities::Category;
    use crate::domain::repositories::{MockCategoryRepository, MockListingRepository};
    use bytes::Bytes;
    use chrono::Utc;

    fn form(fields: &[(&str, &str)], files: Vec<UploadedFile>) -> ParsedParts {
        ParsedParts {
            fields: fields
                .iter()
                .map(|(n, v)| FormField {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            files,
        }
    }

    fn image(name: &str, content_type: &str) -> UploadedFile {
        UploadedFile {
            field: "images".to_string(),
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            data: Bytes::from_static(b"data"),
        }
    }

    fn categories() -> MockCategoryRepository {
        let mut repo = MockCategoryRepository::new();
        repo.expect_find_by_slug().returning(|slug| {
            Ok((slug == "home").then(|| Category::new("home", "Home & Garden", "")))
        });
        repo
    }

    fn stored(new: NewListing) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            owner: new.owner,
            title: new.title,
            description: new.description,
            price_cents: new.price_cents,
            category: new.category,
            images: new.images,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("42"), Some(4200));
        assert_eq!(parse_price("42.5"), Some(4250));
        assert_eq!(parse_price(" 0.99 "), Some(99));
        assert_eq!(parse_price("1.999"), None);
        assert_eq!(parse_price("-3"), None);
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price(".50"), None);
    }

    #[test]
    fn test_parse_price_rejects_zero_and_signs() {
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("0.00"), None);
        assert_eq!(parse_price("+5"), None);
        assert_eq!(parse_price("5.+1"), None);
        assert_eq!(parse_price("0.01"), Some(1));
    }

    #[tokio::test]
    async fn test_create_listing() {
        let mut listings = MockListingRepository::new();
        listings
            .expect_create()
            .withf(|l| l.owner == "user-1" && l.price_cents == 4250 && l.images.len() == 1)
            .times(1)
            .returning(|l| Ok(stored(l)));

        let service = ListingService::new(Arc::new(listings), Arc::new(categories()));
        let form = form(
            &[("title", "Lamp"), ("price", "42.50"), ("category", "home")],
            vec![image("lamp.png", "image/png")],
        );

        let listing = service.create("user-1", &form).await.unwrap();
        assert_eq!(listing.title, "Lamp");
    }

    #[tokio::test]
    async fn test_create_reports_every_invalid_field() {
        let mut listings = MockListingRepository::new();
        listings.expect_create().never();

        let service = ListingService::new(Arc::new(listings), Arc::new(categories()));
        let form = form(
            &[("price", "free"), ("category", "spaceships")],
            vec![image("notes.txt", "text/plain")],
        );

        match service.create("user-1", &form).await.unwrap_err() {
            AppError::Validation { fields, .. } => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["title", "price", "category", "images"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let existing = stored(NewListing {
            owner: "user-1".to_string(),
            title: "Lamp".to_string(),
            description: String::new(),
            price_cents: 1,
            category: "home".to_string(),
            images: Vec::new(),
        });
        let id = existing.id;

        let mut listings = MockListingRepository::new();
        listings
            .expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        listings.expect_delete().times(1).returning(|_| Ok(true));

        let service = ListingService::new(Arc::new(listings), Arc::new(categories()));

        let err = service.delete("user-2", id).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        service.delete("user-1", id).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_clamps_page_size() {
        let mut listings = MockListingRepository::new();
        listings
            .expect_search()
            .withf(|f| f.limit == MAX_PAGE_SIZE)
            .returning(|_| Ok(Vec::new()));

        let service = ListingService::new(Arc::new(listings), Arc::new(categories()));
        let found = service
            .search(ListingFilter {
                limit: 10_000,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(found.is_empty());
    }
}
