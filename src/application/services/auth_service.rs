//! Credential issuing and verification.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AuthFailure};

/// Claims carried by every credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A signed, time-limited proof of identity handed to clients as a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Encoded HS256 token, signature included.
    pub token: String,
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Service for issuing and verifying credentials.
///
/// Credentials are HS256 tokens signed with the shared secret. A credential is valid
/// only while the signature verifies **and** the current time is strictly before its
/// expiry. Expired credentials are never refreshed here; see
/// [`crate::api::handlers::auth::refresh_handler`] for the explicit refresh operation.
///
/// There is no revocation list: a credential stays valid until it expires.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl AuthService {
    /// Creates a new authentication service.
    ///
    /// # Arguments
    ///
    /// - `secret` - HS256 signing key; must match across every instance that verifies
    /// - `ttl` - lifetime of issued credentials
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify_at` so the boundary is exact and testable.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a credential for `subject`, valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the token cannot be encoded.
    pub fn issue(&self, subject: &str) -> Result<Credential, AppError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issues a credential as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<Credential, AppError> {
        let issued_at = truncate_to_secs(now);
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|_| AppError::internal("Credential TTL out of range"))?;
        let expires_at = issued_at + ttl;

        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign credential: {e}")))?;

        Ok(Credential {
            token,
            subject: subject.to_string(),
            issued_at,
            expires_at,
        })
    }

    /// Verifies a raw token and returns its subject.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is malformed, its signature
    /// does not verify, or it has expired.
    pub fn verify(&self, token: &str) -> Result<String, AppError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a raw token as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            let reason = match e.kind() {
                ErrorKind::InvalidSignature => AuthFailure::InvalidSignature,
                ErrorKind::ExpiredSignature => AuthFailure::Expired,
                _ => AuthFailure::MalformedCredential,
            };
            AppError::unauthorized(reason)
        })?;

        if now.timestamp() >= data.claims.exp {
            return Err(AppError::unauthorized(AuthFailure::Expired));
        }

        if data.claims.sub.is_empty() {
            return Err(AppError::unauthorized(AuthFailure::MalformedCredential));
        }

        Ok(data.claims.sub)
    }
}

fn truncate_to_secs(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0).single().unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new("test-signing-secret", Duration::from_secs(3600))
    }

    fn reason(result: Result<String, AppError>) -> AuthFailure {
        match result {
            Err(AppError::Unauthorized(reason)) => reason,
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let service = service();
        let credential = service.issue("user-42").unwrap();

        assert_eq!(credential.subject, "user-42");
        assert_eq!(
            credential.expires_at - credential.issued_at,
            chrono::Duration::hours(1)
        );
        assert_eq!(service.verify(&credential.token).unwrap(), "user-42");
    }

    #[test]
    fn test_valid_until_expiry_boundary() {
        let service = service();
        let now = Utc::now();
        let credential = service.issue_at("user-42", now).unwrap();

        let just_before = credential.expires_at - chrono::Duration::seconds(1);
        assert_eq!(service.verify_at(&credential.token, just_before).unwrap(), "user-42");

        assert_eq!(
            reason(service.verify_at(&credential.token, credential.expires_at)),
            AuthFailure::Expired
        );
        assert_eq!(
            reason(service.verify_at(
                &credential.token,
                credential.expires_at + chrono::Duration::days(1)
            )),
            AuthFailure::Expired
        );
    }

    #[test]
    fn test_expired_credential_fails_even_with_valid_signature() {
        let service = service();
        let issued = Utc::now() - chrono::Duration::hours(2);
        let credential = service.issue_at("user-42", issued).unwrap();

        assert_eq!(reason(service.verify(&credential.token)), AuthFailure::Expired);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = AuthService::new("secret-a", Duration::from_secs(3600));
        let verifier = AuthService::new("secret-b", Duration::from_secs(3600));
        let credential = issuer.issue("user-42").unwrap();

        assert_eq!(
            reason(verifier.verify(&credential.token)),
            AuthFailure::InvalidSignature
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let service = service();
        let credential = service.issue("user-42").unwrap();

        let mut segments: Vec<&str> = credential.token.split('.').collect();
        let forged = service.issue("admin").unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap().to_string();
        segments[1] = &forged_payload;
        let tampered = segments.join(".");

        assert_eq!(reason(service.verify(&tampered)), AuthFailure::InvalidSignature);
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let service = service();

        for token in ["", "not-a-token", "a.b.c", "Bearer xyz"] {
            assert!(matches!(
                service.verify(token),
                Err(AppError::Unauthorized(_))
            ));
        }
    }
}
