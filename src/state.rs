//! Shared state handed to route group handlers.

use std::sync::Arc;
use std::time::Instant;

use crate::application::services::{AccountService, AuthService, CatalogService, ListingService};
use crate::config::{Config, Environment};
use crate::infrastructure::persistence::{
    InMemoryCategoryRepository, InMemoryListingRepository, InMemoryUserRepository,
};

/// Where the generated API description says the server lives.
#[derive(Debug, Clone)]
pub struct DocsInfo {
    pub host: String,
    pub scheme: &'static str,
}

impl DocsInfo {
    /// Production advertises `PUBLIC_HOST` over https; development the local port.
    pub fn from_config(config: &Config) -> Self {
        if config.environment.is_production() {
            Self {
                host: config.public_host.clone(),
                scheme: "https",
            }
        } else {
            Self {
                host: format!("localhost:{}", config.port),
                scheme: "http",
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub account_service: Arc<AccountService<InMemoryUserRepository>>,
    pub catalog_service: Arc<CatalogService<InMemoryCategoryRepository>>,
    pub listing_service:
        Arc<ListingService<InMemoryListingRepository, InMemoryCategoryRepository>>,
    pub auth_service: Arc<AuthService>,
    pub environment: Environment,
    pub started_at: Instant,
    pub docs: DocsInfo,
}

impl AppState {
    /// Wires the reference services over fresh in-memory stores.
    pub fn new(config: &Config, auth_service: Arc<AuthService>) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let categories = Arc::new(InMemoryCategoryRepository::seeded());
        let listings = Arc::new(InMemoryListingRepository::new());

        Self {
            account_service: Arc::new(AccountService::new(users)),
            catalog_service: Arc::new(CatalogService::new(categories.clone())),
            listing_service: Arc::new(ListingService::new(listings, categories)),
            auth_service,
            environment: config.environment,
            started_at: Instant::now(),
            docs: DocsInfo::from_config(config),
        }
    }
}
