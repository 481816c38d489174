//! CLI administration tool for marketplace-gateway.
//!
//! Issues and inspects credentials with the same secret the server uses, and checks
//! a configuration before deploying it.
//!
//! # Usage
//!
//! ```bash
//! # Issue a credential for a subject
//! cargo run --bin admin -- token issue --subject 3f1c... --ttl 3600
//!
//! # Verify a credential and show its subject
//! cargo run --bin admin -- token verify eyJhbGciOi...
//!
//! # Validate the environment configuration
//! cargo run --bin admin -- config check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server; `JWT_SECRET` is required.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

use marketplace_gateway::application::services::AuthService;
use marketplace_gateway::config::{self, Config};

/// CLI tool for managing marketplace-gateway.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Issue and verify credentials
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Configuration tools
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Credential subcommands.
#[derive(Subcommand)]
enum TokenAction {
    /// Issue a credential
    Issue {
        /// Subject (account id) the credential is issued for
        #[arg(short, long)]
        subject: String,

        /// Lifetime in seconds (defaults to CREDENTIAL_TTL_SECS)
        #[arg(short, long)]
        ttl: Option<u64>,
    },

    /// Verify a credential
    Verify {
        /// Encoded credential
        token: String,
    },
}

/// Configuration subcommands.
#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the configuration from the environment
    Check,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Token { action } => {
            let config = config::load_from_env().context("Invalid configuration")?;
            handle_token_action(action, &config)
        }
        Commands::Config {
            action: ConfigAction::Check,
        } => check_config(),
    }
}

/// Dispatches credential commands.
fn handle_token_action(action: TokenAction, config: &Config) -> Result<()> {
    match action {
        TokenAction::Issue { subject, ttl } => {
            let ttl = ttl.map(Duration::from_secs).unwrap_or(config.credential_ttl);
            issue_token(config, &subject, ttl)
        }
        TokenAction::Verify { token } => verify_token(config, &token),
    }
}

/// Issues a credential and prints usage instructions.
fn issue_token(config: &Config, subject: &str, ttl: Duration) -> Result<()> {
    anyhow::ensure!(!subject.trim().is_empty(), "Subject must not be empty");
    anyhow::ensure!(!ttl.is_zero(), "TTL must be greater than 0");

    println!("{}", "Issue credential".bright_blue().bold());
    println!();

    let auth = AuthService::new(&config.jwt_secret, ttl);
    let credential = auth
        .issue(subject)
        .map_err(|e| anyhow::anyhow!("Failed to issue credential: {e}"))?;

    println!("{}", "Credential details:".bright_white().bold());
    println!("  Subject: {}", credential.subject.cyan());
    println!(
        "  Expires: {}",
        credential
            .expires_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .bright_black()
    );
    println!("  Token:   {}", credential.token.bright_yellow().bold());
    println!();
    println!("{}", "Add this to your requests:".bright_white());
    println!(
        "  {}: Bearer {}",
        "Authorization".bright_cyan(),
        credential.token.bright_yellow()
    );
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"Authorization: Bearer {}\" http://localhost:{}/api/users/profile",
        credential.token.bright_yellow(),
        config.port
    );
    println!();

    Ok(())
}

/// Verifies a credential against the configured secret.
fn verify_token(config: &Config, token: &str) -> Result<()> {
    let auth = AuthService::new(&config.jwt_secret, config.credential_ttl);

    match auth.verify(token.trim()) {
        Ok(subject) => {
            println!("{}", "Credential is valid".green().bold());
            println!("  Subject: {}", subject.cyan());
            Ok(())
        }
        Err(e) => {
            println!("{}", "Credential is not valid".red().bold());
            anyhow::bail!("{e}")
        }
    }
}

/// Loads, validates and prints the configuration.
fn check_config() -> Result<()> {
    println!("{}", "Configuration check".bright_blue().bold());
    println!();

    let config = match config::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  {} {e:#}", "Invalid:".red().bold());
            return Err(e);
        }
    };

    let limits = &config.upload_limits;
    println!("  Listen:      {}", config.listen_addr().cyan());
    println!("  Environment: {}", config.environment.as_str().cyan());
    println!(
        "  Rate limit:  {} / {}s",
        config.rate_limit_max.to_string().bright_white(),
        config.rate_limit_window.as_secs()
    );
    println!(
        "  Uploads:     {} files x {} bytes, {} fields",
        limits.max_files, limits.max_file_bytes, limits.max_fields
    );
    if config.environment.is_production() && config.cors_allowed_origins.is_empty() {
        println!(
            "  {}",
            "Warning: no CORS_ALLOWED_ORIGINS set, browsers will be rejected".yellow()
        );
    }
    println!();
    println!("{}", "Configuration is valid".green().bold());

    Ok(())
}
