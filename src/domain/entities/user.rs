//! User account entity.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered marketplace account.
///
/// `id` is the credential subject issued at login.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    /// Argon2id PHC string; carries its own salt and parameters.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Input data for registering a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
}
