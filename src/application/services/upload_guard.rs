//! Streaming multipart ingestion with structural limits.
//!
//! The body is consumed part by part through [`multer`]. Every bound is checked as
//! soon as the data needed for it is available: the part count when a part's headers
//! are parsed (before any of its content is read), byte sizes chunk by chunk. The
//! first violation aborts ingestion and nothing is handed to a route handler.

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use serde::Serialize;
use thiserror::Error;

use crate::error::{AppError, FieldViolation};

/// Structural bounds every accepted multipart request satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadLimits {
    pub max_field_name_bytes: usize,
    pub max_field_value_bytes: usize,
    /// Maximum number of non-file fields.
    pub max_fields: usize,
    pub max_file_bytes: usize,
    pub max_files: usize,
    /// Maximum number of header lines in a single part.
    pub max_header_pairs: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_field_name_bytes: 100,
            max_field_value_bytes: 100,
            max_fields: 10,
            max_file_bytes: 5_000_000,
            max_files: 5,
            max_header_pairs: 2000,
        }
    }
}

impl UploadLimits {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_field_name_bytes == 0 || self.max_file_bytes == 0 || self.max_files == 0 {
            anyhow::bail!("upload limits must be greater than 0: {self:?}");
        }
        if self.max_header_pairs == 0 {
            anyhow::bail!("UPLOAD_MAX_HEADER_PAIRS must be greater than 0");
        }
        if self.max_body_bytes() == u64::MAX {
            anyhow::bail!("upload limits are too large to bound a request body: {self:?}");
        }
        Ok(())
    }

    /// Upper bound on the raw body size of a request that satisfies every limit,
    /// with headroom for boundaries and part headers. Saturates at `u64::MAX`.
    pub fn max_body_bytes(&self) -> u64 {
        const PART_OVERHEAD: u64 = 1024;
        let per_file = (self.max_file_bytes as u64).saturating_add(PART_OVERHEAD);
        let per_field = (self.max_field_name_bytes as u64)
            .saturating_add(self.max_field_value_bytes as u64)
            .saturating_add(PART_OVERHEAD);

        (self.max_files as u64)
            .saturating_mul(per_file)
            .saturating_add((self.max_fields as u64).saturating_mul(per_field))
            .saturating_add(PART_OVERHEAD)
    }
}

/// The bound a request broke, or why its body could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadViolation {
    #[error("field name exceeds {limit} bytes")]
    FieldNameTooLong { part: usize, limit: usize },

    #[error("field '{field}' exceeds {limit} bytes")]
    FieldValueTooLarge { field: String, limit: usize },

    #[error("more than {limit} fields")]
    TooManyFields { limit: usize },

    #[error("file '{field}' exceeds {limit} bytes")]
    FileTooLarge { field: String, limit: usize },

    #[error("more than {limit} files")]
    TooManyFiles { limit: usize },

    #[error("part {part} has more than {limit} header lines")]
    TooManyHeaders { part: usize, limit: usize },

    #[error("part {part} has no field name")]
    MissingFieldName { part: usize },

    #[error("field '{field}' is not valid UTF-8")]
    InvalidFieldEncoding { field: String },

    #[error("malformed multipart body: {0}")]
    Malformed(String),
}

impl UploadViolation {
    fn field(&self) -> String {
        match self {
            UploadViolation::FieldValueTooLarge { field, .. }
            | UploadViolation::FileTooLarge { field, .. }
            | UploadViolation::InvalidFieldEncoding { field } => field.clone(),
            UploadViolation::FieldNameTooLong { part, .. }
            | UploadViolation::TooManyHeaders { part, .. }
            | UploadViolation::MissingFieldName { part } => format!("part[{part}]"),
            UploadViolation::TooManyFields { .. } => "fields".to_string(),
            UploadViolation::TooManyFiles { .. } => "files".to_string(),
            UploadViolation::Malformed(_) => "body".to_string(),
        }
    }
}

impl From<UploadViolation> for AppError {
    fn from(violation: UploadViolation) -> Self {
        AppError::validation(
            "Upload rejected",
            vec![FieldViolation::new(violation.field(), violation.to_string())],
        )
    }
}

impl From<multer::Error> for UploadViolation {
    fn from(e: multer::Error) -> Self {
        UploadViolation::Malformed(e.to_string())
    }
}

/// A non-file form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// A file part whose size has already been checked against `max_file_bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Every part of an accepted multipart request, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedParts {
    pub fields: Vec<FormField>,
    pub files: Vec<UploadedFile>,
}

impl ParsedParts {
    /// First value of the named field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn files_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> {
        self.files.iter().filter(move |f| f.field == name)
    }
}

/// Extracts the boundary from a `multipart/*` content type.
pub fn parse_boundary(content_type: &str) -> Result<String, UploadViolation> {
    multer::parse_boundary(content_type).map_err(UploadViolation::from)
}

/// Reads a multipart body, enforcing `limits` as the stream is consumed.
///
/// # Errors
///
/// Returns the first [`UploadViolation`] encountered; remaining parts are not read.
pub async fn ingest<S, O, E>(
    stream: S,
    boundary: impl Into<String>,
    limits: &UploadLimits,
) -> Result<ParsedParts, UploadViolation>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let constraints = multer::Constraints::new()
        .size_limit(multer::SizeLimit::new().whole_stream(limits.max_body_bytes()));
    let mut multipart = multer::Multipart::with_constraints(stream, boundary, constraints);
    let mut parts = ParsedParts::default();
    let mut index = 0usize;

    while let Some(mut field) = multipart.next_field().await? {
        index += 1;

        if field.headers().len() > limits.max_header_pairs {
            return Err(UploadViolation::TooManyHeaders {
                part: index,
                limit: limits.max_header_pairs,
            });
        }

        let name = field
            .name()
            .ok_or(UploadViolation::MissingFieldName { part: index })?
            .to_string();
        if name.len() > limits.max_field_name_bytes {
            return Err(UploadViolation::FieldNameTooLong {
                part: index,
                limit: limits.max_field_name_bytes,
            });
        }

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                if parts.files.len() + 1 > limits.max_files {
                    return Err(UploadViolation::TooManyFiles {
                        limit: limits.max_files,
                    });
                }
                let content_type = field.content_type().map(|m| m.to_string());
                let limit = limits.max_file_bytes;
                let data = read_bounded(&mut field, limit, || UploadViolation::FileTooLarge {
                    field: name.clone(),
                    limit,
                })
                .await?;

                parts.files.push(UploadedFile {
                    field: name,
                    file_name,
                    content_type,
                    data,
                });
            }
            None => {
                if parts.fields.len() + 1 > limits.max_fields {
                    return Err(UploadViolation::TooManyFields {
                        limit: limits.max_fields,
                    });
                }
                let limit = limits.max_field_value_bytes;
                let data = read_bounded(&mut field, limit, || UploadViolation::FieldValueTooLarge {
                    field: name.clone(),
                    limit,
                })
                .await?;
                let value = String::from_utf8(data.to_vec())
                    .map_err(|_| UploadViolation::InvalidFieldEncoding { field: name.clone() })?;

                parts.fields.push(FormField { name, value });
            }
        }
    }

    Ok(parts)
}

async fn read_bounded(
    field: &mut multer::Field<'static>,
    limit: usize,
    violation: impl Fn() -> UploadViolation,
) -> Result<Bytes, UploadViolation> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Err(violation());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
