//! Repository trait for user accounts.

use async_trait::async_trait;
use uuid::Uuid;

use super::StoreError;
use crate::domain::entities::{NewUser, User};

/// Repository interface for account storage.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::InMemoryUserRepository`] - process-local store
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new account.
    ///
    /// Returns `Ok(None)` if the email is already registered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    async fn create(&self, user: NewUser) -> Result<Option<User>, StoreError>;

    /// Finds an account by its (case-insensitive) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}
