//! In-memory category catalog.

use async_trait::async_trait;

use crate::domain::entities::Category;
use crate::domain::repositories::{CategoryRepository, StoreError};

/// Fixed catalog loaded at startup.
pub struct InMemoryCategoryRepository {
    categories: Vec<Category>,
}

impl InMemoryCategoryRepository {
    pub fn new(mut categories: Vec<Category>) -> Self {
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Self { categories }
    }

    /// Catalog shipped with the marketplace.
    pub fn seeded() -> Self {
        Self::new(vec![
            Category::new("vehicles", "Vehicles", "Cars, bikes, boats and parts"),
            Category::new("real-estate", "Real Estate", "Homes and rooms for rent or sale"),
            Category::new("electronics", "Electronics", "Phones, computers and gadgets"),
            Category::new("home", "Home & Garden", "Furniture, tools and decor"),
            Category::new("jobs", "Jobs", "Full-time, part-time and gigs"),
            Category::new("services", "Services", "Local professionals"),
        ])
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.categories.clone())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        Ok(self.categories.iter().find(|c| c.slug == slug).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_catalog_is_sorted() {
        let repo = InMemoryCategoryRepository::seeded();
        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(repo.find_by_slug("vehicles").await.unwrap().is_some());
        assert!(repo.find_by_slug("spaceships").await.unwrap().is_none());
    }
}
