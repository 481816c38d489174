//! # Marketplace Gateway
//!
//! The HTTP entry point of a classifieds marketplace backend, built with Axum.
//!
//! Every request passes one fixed pipeline before a route group sees it:
//! origin filtering, per-client rate limiting, bearer authentication and bounded
//! multipart ingestion. Every failure along the way, including handler panics and
//! timeouts, leaves as the same JSON error envelope.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Entities and repository traits
//! - **Application Layer** ([`application`]) - Rate limiter, credentials, upload guard
//!   and the reference route group services
//! - **Infrastructure Layer** ([`infrastructure`]) - In-memory repositories
//! - **API Layer** ([`api`]) - The pipeline, its stages, route groups and handlers
//!
//! ## Lifecycle
//!
//! [`shutdown::ShutdownCoordinator`] drives `Running → Draining → Stopped`; the
//! binary calls `begin_drain` on SIGTERM or Ctrl-C and exits `0` only if every
//! in-flight request completed within `SHUTDOWN_TIMEOUT_SECS`.
//!
//! ## Quick Start
//!
//! ```bash
//! export JWT_SECRET="change-me-to-at-least-32-random-bytes"
//! cargo run
//! ```
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;

pub mod config;
pub mod server;
pub mod shutdown;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::api::pipeline::{Pipeline, STAGES, Stage};
    pub use crate::api::routes::{Access, RouteGroup, RouteTable};
    pub use crate::application::services::{AuthService, RateLimiter, UploadLimits};
    pub use crate::config::{Config, Environment};
    pub use crate::error::{AppError, ErrorEnvelope, ErrorKind};
    pub use crate::shutdown::{Phase, ShutdownCoordinator};
    pub use crate::state::AppState;
}
