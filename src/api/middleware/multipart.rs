//! Multipart ingestion stage.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
};

use crate::api::pipeline::Flow;
use crate::application::services::upload_guard::{self, ParsedParts, UploadLimits};
use crate::error::AppError;

/// Fourth pipeline stage: reads `multipart/*` bodies under [`UploadLimits`].
///
/// On success the body is replaced by an empty one and the accepted parts are stored
/// as a [`ParsedParts`] request extension, so handlers never see an unchecked upload.
/// Other content types pass through untouched.
///
/// # Errors
///
/// Returns [`AppError::Validation`] on the first violated limit or a malformed body.
pub async fn multipart_stage(limits: &UploadLimits, req: &mut Request) -> Result<Flow, AppError> {
    let Some(content_type) = multipart_content_type(req) else {
        return Ok(Flow::Continue);
    };

    let boundary = upload_guard::parse_boundary(&content_type)?;
    let (mut parts, body) = std::mem::take(req).into_parts();

    let result = upload_guard::ingest(body.into_data_stream(), boundary, limits).await;
    match result {
        Ok(accepted) => {
            tracing::debug!(
                fields = accepted.fields.len(),
                files = accepted.files.len(),
                "Multipart body accepted"
            );
            parts.extensions.insert(accepted);
            *req = Request::from_parts(parts, Body::empty());
            Ok(Flow::Continue)
        }
        Err(violation) => {
            tracing::debug!(
                violation = %violation,
                path = %parts.uri.path(),
                "Multipart body rejected"
            );
            Err(violation.into())
        }
    }
}

fn multipart_content_type(req: &Request) -> Option<String> {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/"))
        .map(str::to_string)
}

/// Accepted multipart parts of the current request. Rejects with a validation error
/// when the request was not a multipart upload.
pub struct Uploaded(pub ParsedParts);

impl<S: Send + Sync> FromRequestParts<S> for Uploaded {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .remove::<ParsedParts>()
            .map(Uploaded)
            .ok_or_else(|| AppError::invalid_field("body", "expected a multipart/form-data body"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::upload_guard::tests::{BOUNDARY, body};
    use crate::error::FieldViolation;

    fn request(body: Vec<u8>) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/listings")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_parts_are_stored_in_request_scope() {
        let mut req = request(body(&[("title", "Lamp")], &[("images", "a.png", b"png")]));

        multipart_stage(&UploadLimits::default(), &mut req).await.unwrap();

        let parts = req.extensions().get::<ParsedParts>().unwrap();
        assert_eq!(parts.field("title"), Some("Lamp"));
        assert_eq!(parts.files.len(), 1);
    }

    #[tokio::test]
    async fn test_too_many_files_is_a_validation_error() {
        let files: Vec<(&str, &str, &[u8])> =
            (0..6).map(|_| ("images", "a.png", &b"x"[..])).collect();
        let mut req = request(body(&[], &files));

        match multipart_stage(&UploadLimits::default(), &mut req).await {
            Err(AppError::Validation { fields, .. }) => {
                assert_eq!(fields, vec![FieldViolation::new("files", "more than 5 files")]);
            }
            other => panic!("expected validation error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_non_multipart_passes_through() {
        let mut req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        assert!(matches!(
            multipart_stage(&UploadLimits::default(), &mut req).await,
            Ok(Flow::Continue)
        ));
        assert!(req.extensions().get::<ParsedParts>().is_none());
    }

    #[tokio::test]
    async fn test_missing_boundary_is_rejected() {
        let mut req = Request::builder()
            .method("POST")
            .uri("/api/listings")
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .body(Body::empty())
            .unwrap();

        assert!(matches!(
            multipart_stage(&UploadLimits::default(), &mut req).await,
            Err(AppError::Validation { .. })
        ));
    }
}
