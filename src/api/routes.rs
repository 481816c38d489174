//! Route group registration and the dispatch table.
//!
//! A [`RouteGroup`] owns a path prefix and the endpoints beneath it. Each endpoint
//! declares whether it is [`Access::Public`] or [`Access::Protected`], which the
//! authentication stage looks up before dispatch.
//!
//! [`RouteTable::build`] validates the whole set at startup: duplicate prefixes,
//! duplicate `(method, path)` endpoints and ambiguous path patterns are configuration
//! errors, never silent overrides.

use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;

use axum::{
    Router,
    extract::Request,
    handler::Handler,
    http::{Method, Uri},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter, on},
};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use crate::api::handlers;
use crate::api::middleware::recovery;
use crate::error::AppError;
use crate::state::AppState;

/// Whether an endpoint requires a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteConfigError {
    #[error("route prefix '{0}' is registered more than once")]
    DuplicatePrefix(String),

    #[error("route prefix '{0}' must start with '/' and must not end with '/'")]
    InvalidPrefix(String),

    #[error("endpoint {method} {path} is registered more than once")]
    DuplicateEndpoint { method: Method, path: String },

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),

    #[error("path '{path}' conflicts with another route: {reason}")]
    Conflict { path: String, reason: String },
}

struct Endpoint {
    method: Method,
    path: String,
    access: Access,
    route: MethodRouter<AppState>,
}

/// A set of endpoints mounted under one path prefix.
///
/// # Example
///
/// ```rust,ignore
/// let listings = RouteGroup::new("/api/listings", Access::Public)
///     .public(Method::GET, "/", list_listings_handler)
///     .protected(Method::POST, "/", create_listing_handler);
/// ```
pub struct RouteGroup {
    prefix: String,
    default_access: Access,
    rate_limited: bool,
    endpoints: Vec<Endpoint>,
    invalid_methods: Vec<Method>,
}

impl RouteGroup {
    /// Creates a group. `default_access` applies to paths under the prefix that match
    /// no endpoint, so unknown paths in a protected group still require a credential.
    pub fn new(prefix: impl Into<String>, default_access: Access) -> Self {
        Self {
            prefix: prefix.into(),
            default_access,
            rate_limited: true,
            endpoints: Vec::new(),
            invalid_methods: Vec::new(),
        }
    }

    /// Exempts the whole group from rate limiting.
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limited = false;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited
    }

    /// Registers `handler` for `method` at `path`, relative to the prefix.
    /// `"/"` addresses the prefix itself.
    pub fn endpoint<H, T>(mut self, method: Method, path: &str, access: Access, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        match MethodFilter::try_from(method.clone()) {
            Ok(filter) => self.endpoints.push(Endpoint {
                method,
                path: join(&self.prefix, path),
                access,
                route: on(filter, handler),
            }),
            Err(_) => self.invalid_methods.push(method),
        }
        self
    }

    pub fn public<H, T>(self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.endpoint(method, path, Access::Public, handler)
    }

    pub fn protected<H, T>(self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        self.endpoint(method, path, Access::Protected, handler)
    }
}

fn join(prefix: &str, path: &str) -> String {
    let path = path.trim_end_matches('/');
    match (prefix, path) {
        ("/", "") => "/".to_string(),
        ("/", p) => p.to_string(),
        (pre, "") => pre.to_string(),
        (pre, p) => format!("{pre}{p}"),
    }
}

/// A validated, mounted route group.
struct MountedGroup {
    prefix: String,
    default_access: Access,
    rate_limited: bool,
    access: matchit::Router<Vec<(Method, Access)>>,
    router: Router,
}

impl MountedGroup {
    fn owns(&self, path: &str) -> bool {
        self.prefix == "/"
            || path == self.prefix
            || path
                .strip_prefix(self.prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    fn access(&self, method: &Method, path: &str) -> Access {
        let Ok(found) = self.access.at(path) else {
            return self.default_access;
        };
        let lookup = |m: &Method| found.value.iter().find(|(em, _)| em == m).map(|(_, a)| *a);

        lookup(method)
            .or_else(|| (*method == Method::HEAD).then(|| lookup(&Method::GET)).flatten())
            .unwrap_or(self.default_access)
    }
}

/// Which group a request path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    index: usize,
    pub access: Access,
    pub rate_limited: bool,
}

/// Every route group, ordered for longest-prefix matching.
pub struct RouteTable {
    groups: Vec<MountedGroup>,
}

impl RouteTable {
    /// Validates and mounts `groups`.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteConfigError`] for duplicate prefixes, duplicate endpoints,
    /// unroutable methods or conflicting path patterns.
    pub fn build(groups: Vec<RouteGroup>, state: AppState) -> Result<Self, RouteConfigError> {
        let mut prefixes = HashSet::new();
        let mut mounted = Vec::with_capacity(groups.len());

        for group in groups {
            let prefix = group.prefix;
            if !prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/')) {
                return Err(RouteConfigError::InvalidPrefix(prefix));
            }
            if !prefixes.insert(prefix.clone()) {
                return Err(RouteConfigError::DuplicatePrefix(prefix));
            }
            if let Some(method) = group.invalid_methods.into_iter().next() {
                return Err(RouteConfigError::UnsupportedMethod(method));
            }

            let mut by_path: BTreeMap<String, Vec<Endpoint>> = BTreeMap::new();
            for endpoint in group.endpoints {
                let same_path = by_path.entry(endpoint.path.clone()).or_default();
                if same_path.iter().any(|e| e.method == endpoint.method) {
                    return Err(RouteConfigError::DuplicateEndpoint {
                        method: endpoint.method,
                        path: endpoint.path,
                    });
                }
                same_path.push(endpoint);
            }

            let mut access = matchit::Router::new();
            let mut router: Router<AppState> = Router::new();
            for (path, endpoints) in by_path {
                let methods = endpoints.iter().map(|e| (e.method.clone(), e.access)).collect();
                access
                    .insert(path.clone(), methods)
                    .map_err(|e| RouteConfigError::Conflict {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;

                let route = endpoints
                    .into_iter()
                    .fold(MethodRouter::new(), |merged, e| merged.merge(e.route));
                router = router.route(&path, route);
            }

            let router = router
                .fallback(route_not_found)
                .with_state(state.clone())
                .layer(CatchPanicLayer::custom(recovery::handle_panic));

            mounted.push(MountedGroup {
                prefix,
                default_access: group.default_access,
                rate_limited: group.rate_limited,
                access,
                router,
            });
        }

        mounted.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        for group in &mounted {
            tracing::debug!(
                prefix = %group.prefix,
                rate_limited = group.rate_limited,
                "Route group mounted"
            );
        }

        Ok(Self { groups: mounted })
    }

    /// Longest registered prefix owning `path`, with the access rule for `method`.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<Resolved> {
        self.groups
            .iter()
            .position(|g| g.owns(path))
            .map(|index| {
                let group = &self.groups[index];
                Resolved {
                    index,
                    access: group.access(method, path),
                    rate_limited: group.rate_limited,
                }
            })
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.prefix.as_str())
    }

    /// Runs the request through the resolved group's router.
    pub async fn dispatch(&self, resolved: Resolved, req: Request) -> Response {
        let router = self.groups[resolved.index].router.clone();
        router
            .oneshot(req)
            .await
            .unwrap_or_else(|never: Infallible| match never {})
    }
}

async fn route_not_found(method: Method, uri: Uri) -> AppError {
    AppError::not_found(method, uri.path())
}

/// Responds with the not-found envelope for a request no group owns.
pub fn unrouted(method: Method, uri: &Uri) -> Response {
    AppError::not_found(method, uri.path()).into_response()
}

/// The route groups served by the binary.
///
/// # Endpoints
///
/// - `GET    /health`                 - Liveness probe (not rate limited)
/// - `GET    /docs`                   - Documentation page
/// - `GET    /docs/openapi.json`      - API description
/// - `POST   /api/auth/login`         - Exchange email/password for a credential
/// - `POST   /api/auth/refresh`       - Fresh credential for a valid one (protected)
/// - `POST   /api/users/register`     - Create an account
/// - `GET    /api/users/profile`      - Current account (protected)
/// - `GET    /api/categories`         - Category catalog
/// - `GET    /api/categories/{slug}`  - One category
/// - `GET    /api/listings`           - Browse listings
/// - `GET    /api/listings/{id}`      - One listing
/// - `POST   /api/listings`           - Multipart listing create (protected)
/// - `DELETE /api/listings/{id}`      - Delete own listing (protected)
/// - `GET    /api/search`             - Search listings (protected)
pub fn default_groups() -> Vec<RouteGroup> {
    use handlers::{auth, categories, docs, health, listings, search, users};

    vec![
        RouteGroup::new("/health", Access::Public)
            .without_rate_limit()
            .public(Method::GET, "/", health::health_handler),
        RouteGroup::new("/docs", Access::Public)
            .public(Method::GET, "/", docs::docs_page_handler)
            .public(Method::GET, "/openapi.json", docs::openapi_handler),
        RouteGroup::new("/api/auth", Access::Public)
            .public(Method::POST, "/login", auth::login_handler)
            .protected(Method::POST, "/refresh", auth::refresh_handler),
        RouteGroup::new("/api/users", Access::Protected)
            .public(Method::POST, "/register", users::register_handler)
            .protected(Method::GET, "/profile", users::profile_handler),
        RouteGroup::new("/api/categories", Access::Public)
            .public(Method::GET, "/", categories::list_categories_handler)
            .public(Method::GET, "/{slug}", categories::get_category_handler),
        RouteGroup::new("/api/listings", Access::Public)
            .public(Method::GET, "/", listings::list_listings_handler)
            .public(Method::GET, "/{id}", listings::get_listing_handler)
            .protected(Method::POST, "/", listings::create_listing_handler)
            .protected(Method::DELETE, "/{id}", listings::delete_listing_handler),
        RouteGroup::new("/api/search", Access::Protected)
            .protected(Method::GET, "/", search::search_handler),
    ]
}
