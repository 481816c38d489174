//! In-memory implementation of the listing repository.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::{Listing, NewListing};
use crate::domain::repositories::{ListingFilter, ListingRepository, StoreError};

#[derive(Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<HashMap<Uuid, Listing>>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn create(&self, listing: NewListing) -> Result<Listing, StoreError> {
        let created = Listing {
            id: Uuid::new_v4(),
            owner: listing.owner,
            title: listing.title,
            description: listing.description,
            price_cents: listing.price_cents,
            category: listing.category,
            images: listing.images,
            created_at: Utc::now(),
        };
        self.listings
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>, StoreError> {
        Ok(self.listings.read().await.get(&id).cloned())
    }

    async fn search(&self, filter: ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let listings = self.listings.read().await;

        let mut found: Vec<Listing> = listings
            .values()
            .filter(|l| filter.category.as_deref().is_none_or(|c| l.category == c))
            .filter(|l| filter.text.as_deref().is_none_or(|t| l.matches_text(t)))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = if filter.limit == 0 { usize::MAX } else { filter.limit };
        Ok(found.into_iter().skip(filter.offset).take(limit).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.listings.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_listing(title: &str, category: &str) -> NewListing {
        NewListing {
            owner: "user-1".to_string(),
            title: title.to_string(),
            description: String::new(),
            price_cents: 100,
            category: category.to_string(),
            images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_search_filters() {
        let repo = InMemoryListingRepository::new();
        repo.create(new_listing("Red bike", "vehicles")).await.unwrap();
        repo.create(new_listing("Blue bike", "vehicles")).await.unwrap();
        repo.create(new_listing("Red sofa", "home")).await.unwrap();

        let all = repo.search(ListingFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let bikes = repo
            .search(ListingFilter {
                category: Some("vehicles".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bikes.len(), 2);

        let red_bikes = repo
            .search(ListingFilter {
                text: Some("red".into()),
                category: Some("vehicles".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(red_bikes.len(), 1);
        assert_eq!(red_bikes[0].title, "Red bike");

        let page = repo
            .search(ListingFilter {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryListingRepository::new();
        let listing = repo.create(new_listing("Lamp", "home")).await.unwrap();

        assert!(repo.delete(listing.id).await.unwrap());
        assert!(!repo.delete(listing.id).await.unwrap());
        assert!(repo.find_by_id(listing.id).await.unwrap().is_none());
    }
}
