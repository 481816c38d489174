//! Pipeline stages and request processing middleware.
//!
//! Each stage module exposes one `*_stage` function called by
//! [`crate::api::pipeline`] in its fixed order:
//!
//! 1. [`security`] - Origin filter, CORS preflight, security headers
//! 2. [`rate_limit`] - Per-client fixed-window limiting
//! 3. [`auth`] - Bearer credential verification
//! 4. [`multipart`] - Bounded multipart ingestion
//!
//! [`recovery`] and [`tracing`] wrap route dispatch and the whole pipeline.

pub mod auth;
pub mod multipart;
pub mod rate_limit;
pub mod recovery;
pub mod security;
pub mod tracing;
