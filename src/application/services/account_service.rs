//! Account registration and password login.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::http::StatusCode;
use rand::Rng;
use uuid::Uuid;

use crate::domain::entities::{NewUser, User};
use crate::domain::repositories::UserRepository;
use crate::error::AppError;

/// Service for registering accounts and checking passwords.
///
/// Passwords are stored as Argon2id PHC strings with a random per-user salt. Hashing
/// and verification run on the blocking pool.
pub struct AccountService<R: UserRepository> {
    repository: Arc<R>,
}

/// Hashes `password` with a fresh 16-byte salt.
fn hash_password(password: &str) -> Result<String, AppError> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::internal(format!("Failed to encode salt: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
}

/// `false` for a wrong password and for an unparseable stored hash.
fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is not a PHC string");
            false
        }
    }
}

async fn blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::internal(format!("Password task failed: {e}")))
}

impl<R: UserRepository> AccountService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// Returns `409 Conflict` if the email is already registered.
    /// Returns [`AppError::Database`] on storage errors.
    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let password = password.to_string();
        let password_hash = blocking(move || hash_password(&password)).await??;

        let created = self
            .repository
            .create(NewUser {
                email: email.to_string(),
                display_name: display_name.to_string(),
                password_hash,
            })
            .await?;

        created.ok_or_else(|| {
            AppError::with_status(StatusCode::CONFLICT, "Email already registered")
        })
    }

    /// Checks an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns `401 Unauthorized` with the same message whether the email is unknown
    /// or the password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let rejected =
            || AppError::with_status(StatusCode::UNAUTHORIZED, "Invalid email or password");

        let user = self
            .repository
            .find_by_email(email)
            .await?
            .ok_or_else(rejected)?;

        let password = password.to_string();
        let stored = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &stored)).await? {
            return Err(rejected());
        }

        Ok(user)
    }

    /// Loads the account a credential subject refers to.
    ///
    /// # Errors
    ///
    /// Returns `404 Not Found` if the subject is not an account id or the account is gone.
    pub async fn profile(&self, subject: &str) -> Result<User, AppError> {
        let missing = || AppError::with_status(StatusCode::NOT_FOUND, "Account not found");
        let id = Uuid::parse_str(subject).map_err(|_| missing())?;

        self.repository.find_by_id(id).await?.ok_or_else(missing)
    }
}
