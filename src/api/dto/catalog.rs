//! DTOs for the category catalog.

use serde::Serialize;

use crate::domain::entities::Category;

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub slug: String,
    pub name: String,
    pub description: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            slug: category.slug,
            name: category.name,
            description: category.description,
        }
    }
}
