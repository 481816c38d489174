//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server starts.
//!
//! ## Required Variables
//!
//! - `JWT_SECRET` - shared secret used to sign and verify credentials
//!
//! ## Optional Variables
//!
//! - `HOST` / `PORT` - Bind address (default: `0.0.0.0` / `3001`)
//! - `APP_ENV` - `development` or `production` (default: `development`)
//! - `CORS_ALLOWED_ORIGINS` - Comma separated origin allowlist, production only
//! - `PUBLIC_HOST` - Host advertised by the API documentation in production
//! - `BEHIND_PROXY` - Read client IP from `X-Forwarded-For` / `X-Real-IP`
//! - `CREDENTIAL_TTL_SECS` - Credential lifetime (default: 3600)
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS` - Requests per window (default: 100 / 60)
//! - `RATE_LIMIT_SWEEP_SECS` - Idle counter eviction interval (default: 60)
//! - `UPLOAD_MAX_FIELD_NAME_BYTES`, `UPLOAD_MAX_FIELD_VALUE_BYTES`, `UPLOAD_MAX_FIELDS`,
//!   `UPLOAD_MAX_FILE_BYTES`, `UPLOAD_MAX_FILES`, `UPLOAD_MAX_HEADER_PAIRS` - Multipart limits
//! - `REQUEST_TIMEOUT_SECS` - Handler deadline (default: 30)
//! - `SHUTDOWN_TIMEOUT_SECS` - Drain deadline (default: 30)
//! - `RUST_LOG` / `LOG_LEVEL` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::application::services::upload_guard::UploadLimits;

/// Deployment mode.
///
/// Only the CORS allowlist and the documentation host depend on it; pipeline
/// semantics are identical in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("APP_ENV must be 'development' or 'production', got '{other}'"),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Origins accepted in production. Ignored in development, where every origin is allowed.
    pub cors_allowed_origins: Vec<String>,
    /// Host advertised in the OpenAPI document when running in production.
    pub public_host: String,
    /// When true, rate limiting reads client IP from X-Forwarded-For / X-Real-IP headers.
    /// Enable only when the service is behind a trusted reverse proxy.
    pub behind_proxy: bool,
    pub log_level: String,
    pub log_format: String,

    /// Shared HS256 secret. Read-only after startup.
    pub jwt_secret: String,
    pub credential_ttl: Duration,

    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// How often idle rate-limit counters are evicted.
    pub rate_limit_sweep_interval: Duration,

    pub upload_limits: UploadLimits,

    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Configuration with every optional setting at its default.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            environment: Environment::Development,
            cors_allowed_origins: Vec::new(),
            public_host: "api.futureclassifieds.com".to_string(),
            behind_proxy: false,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            jwt_secret: jwt_secret.into(),
            credential_ttl: Duration::from_secs(3600),
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_sweep_interval: Duration::from_secs(60),
            upload_limits: UploadLimits::default(),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or a variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let mut config = Self::with_secret(jwt_secret);

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        config.port = parse_var("PORT", config.port)?;
        if let Ok(value) = env::var("APP_ENV") {
            config.environment = value.parse()?;
        }
        config.cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();
        if let Ok(public_host) = env::var("PUBLIC_HOST") {
            config.public_host = public_host;
        }
        config.behind_proxy = env::var("BEHIND_PROXY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        config.log_level = env::var("RUST_LOG")
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or_else(|_| "info".to_string());
        config.log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        config.credential_ttl = secs_var("CREDENTIAL_TTL_SECS", config.credential_ttl)?;
        config.rate_limit_max = parse_var("RATE_LIMIT_MAX", config.rate_limit_max)?;
        config.rate_limit_window = secs_var("RATE_LIMIT_WINDOW_SECS", config.rate_limit_window)?;
        config.rate_limit_sweep_interval =
            secs_var("RATE_LIMIT_SWEEP_SECS", config.rate_limit_sweep_interval)?;

        let limits = &mut config.upload_limits;
        limits.max_field_name_bytes =
            parse_var("UPLOAD_MAX_FIELD_NAME_BYTES", limits.max_field_name_bytes)?;
        limits.max_field_value_bytes =
            parse_var("UPLOAD_MAX_FIELD_VALUE_BYTES", limits.max_field_value_bytes)?;
        limits.max_fields = parse_var("UPLOAD_MAX_FIELDS", limits.max_fields)?;
        limits.max_file_bytes = parse_var("UPLOAD_MAX_FILE_BYTES", limits.max_file_bytes)?;
        limits.max_files = parse_var("UPLOAD_MAX_FILES", limits.max_files)?;
        limits.max_header_pairs = parse_var("UPLOAD_MAX_HEADER_PAIRS", limits.max_header_pairs)?;

        config.request_timeout = secs_var("REQUEST_TIMEOUT_SECS", config.request_timeout)?;
        config.shutdown_timeout = secs_var("SHUTDOWN_TIMEOUT_SECS", config.shutdown_timeout)?;

        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `jwt_secret` is empty, or shorter than 32 bytes in production
    /// - `log_format` is not `text` or `json`
    /// - a limit, window, TTL or timeout is zero
    /// - production runs with an empty CORS allowlist entry
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if self.environment.is_production() && self.jwt_secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 bytes in production, got {}",
                self.jwt_secret.len()
            );
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if self.port == 0 {
            anyhow::bail!("PORT must be between 1 and 65535");
        }

        if self.credential_ttl.is_zero() {
            anyhow::bail!("CREDENTIAL_TTL_SECS must be greater than 0");
        }

        if self.rate_limit_max == 0 {
            anyhow::bail!("RATE_LIMIT_MAX must be at least 1");
        }
        if self.rate_limit_window.is_zero() {
            anyhow::bail!("RATE_LIMIT_WINDOW_SECS must be greater than 0");
        }
        if self.rate_limit_sweep_interval.is_zero() {
            anyhow::bail!("RATE_LIMIT_SWEEP_SECS must be greater than 0");
        }

        self.upload_limits.validate()?;

        if self.request_timeout.is_zero() {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if self.environment.is_production()
            && let Some(origin) = self
                .cors_allowed_origins
                .iter()
                .find(|o| !o.starts_with("http://") && !o.starts_with("https://"))
        {
            anyhow::bail!("CORS_ALLOWED_ORIGINS entries must be absolute origins, got '{origin}'");
        }

        Ok(())
    }

    /// Address the listener binds to, as `host:port`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr());
        tracing::info!("  Environment: {}", self.environment.as_str());
        tracing::info!("  JWT secret: {}", mask_secret(&self.jwt_secret));
        tracing::info!("  Credential TTL: {}s", self.credential_ttl.as_secs());
        tracing::info!(
            "  Rate limit: {} requests / {}s",
            self.rate_limit_max,
            self.rate_limit_window.as_secs()
        );
        if self.environment.is_production() {
            tracing::info!("  CORS origins: {:?}", self.cors_allowed_origins);
        } else {
            tracing::info!("  CORS origins: any (development)");
        }
        tracing::info!("  Upload limits: {:?}", self.upload_limits);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} has invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

fn secs_var(name: &str, default: Duration) -> Result<Duration> {
    parse_var(name, default.as_secs()).map(Duration::from_secs)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Masks a secret for logging, keeping only its length visible.
///
/// - `super-secret-value` → `***(18 bytes)`
fn mask_secret(secret: &str) -> String {
    format!("***({} bytes)", secret.len())
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if required variables are missing or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
