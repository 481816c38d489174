//! In-memory implementation of the user repository.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::{NewUser, User};
use crate::domain::repositories::{StoreError, UserRepository};

/// Account store keyed by id.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Ok(None);
        }

        let created = User {
            id: Uuid::new_v4(),
            email,
            display_name: user.display_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(created.id, created.clone());

        Ok(Some(created))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            display_name: "Ada".to_string(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUserRepository::new();

        let user = repo.create(new_user("Ada@Example.com")).await.unwrap().unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert!(repo.find_by_email("ADA@example.com").await.unwrap().is_some());
        assert_eq!(repo.find_by_id(user.id).await.unwrap().unwrap().email, user.email);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let repo = InMemoryUserRepository::new();

        assert!(repo.create(new_user("ada@example.com")).await.unwrap().is_some());
        assert!(repo.create(new_user("ADA@example.com")).await.unwrap().is_none());
    }
}
