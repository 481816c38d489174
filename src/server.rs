//! HTTP server initialization and lifecycle.
//!
//! Builds the pipeline from [`Config`], serves it, and runs the drain sequence once
//! the [`ShutdownCoordinator`] leaves `Running`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

use crate::api::middleware::security::OriginPolicy;
use crate::api::pipeline::{self, Pipeline};
use crate::api::routes::{RouteGroup, RouteTable};
use crate::application::services::{AuthService, RateLimiter};
use crate::config::Config;
use crate::shutdown::ShutdownCoordinator;
use crate::state::AppState;

/// Assembles the pipeline for `groups`.
///
/// # Errors
///
/// Returns an error if the route groups conflict.
pub fn build_pipeline(
    config: &Config,
    groups: Vec<RouteGroup>,
    coordinator: Arc<ShutdownCoordinator>,
) -> Result<Arc<Pipeline>> {
    let auth = Arc::new(AuthService::new(&config.jwt_secret, config.credential_ttl));
    let state = AppState::new(config, auth.clone());
    let routes = RouteTable::build(groups, state).context("Invalid route configuration")?;

    Ok(Arc::new(Pipeline {
        routes,
        origins: OriginPolicy::from_config(config),
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window,
        )),
        auth,
        upload_limits: config.upload_limits,
        behind_proxy: config.behind_proxy,
        request_timeout: config.request_timeout,
        coordinator,
    }))
}

/// Periodically evicts expired rate-limit windows until `stop` resolves.
fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    every: Duration,
    stop: impl Future<Output = ()> + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let evicted = limiter.evict_idle(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(
                            evicted,
                            tracked = limiter.len(),
                            "Evicted idle rate-limit windows"
                        );
                    }
                }
            }
        }
    })
}

/// Serves `pipeline` on `listener` until the coordinator starts draining, then
/// waits for in-flight requests.
///
/// # Errors
///
/// Returns an error if the server fails, the sweeper task fails, or requests are
/// still running when `shutdown_timeout` elapses.
pub async fn serve(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    sweep_interval: Duration,
    shutdown_timeout: Duration,
) -> Result<()> {
    let coordinator = pipeline.coordinator.clone();
    let sweeper = spawn_sweeper(
        pipeline.rate_limiter.clone(),
        sweep_interval,
        coordinator.draining(),
    );

    let app = NormalizePathLayer::trim_trailing_slash().layer(pipeline::router(pipeline));
    let server = axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(coordinator.draining());
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => {
            // The server stopped without a drain request.
            coordinator.stop();
            sweeper.abort();
            joined.context("Server task panicked")?.context("Server error")?;
            anyhow::bail!("Server stopped unexpectedly");
        }
        () = coordinator.draining() => {}
    }

    let deadline = Instant::now() + shutdown_timeout;
    let mut failure = None;

    if let Err(e) = coordinator.wait_drained(shutdown_timeout).await {
        tracing::error!(error = %e, "In-flight requests did not finish");
        failure = Some(anyhow::Error::new(e));
    }

    match tokio::time::timeout_at(deadline, &mut server).await {
        Ok(joined) => {
            if let Err(e) = joined
                .context("Server task panicked")
                .and_then(|r| r.context("Server error"))
            {
                tracing::error!(error = %e, "Server did not close cleanly");
                failure.get_or_insert(e);
            }
        }
        Err(_) => {
            server.abort();
            failure.get_or_insert_with(|| {
                anyhow::anyhow!("Connections still open after {shutdown_timeout:?}")
            });
        }
    }

    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Rate limiter sweeper failed");
        failure.get_or_insert_with(|| anyhow::Error::new(e).context("Rate limiter sweeper failed"));
    }

    coordinator.stop();

    match failure {
        Some(e) => Err(e),
        None => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}

/// Binds `HOST:PORT`. Host names are resolved, so `HOST=localhost` works.
///
/// # Errors
///
/// Returns an error if the address cannot be resolved or bound.
pub async fn bind(config: &Config) -> Result<TcpListener> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener
        .local_addr()
        .context("Failed to read bound address")?;
    tracing::info!("Listening on http://{local}");

    Ok(listener)
}

/// Runs the HTTP server with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Route configuration is invalid
/// - Server bind fails
/// - Server runtime error occurs
/// - Shutdown does not complete within `shutdown_timeout`
pub async fn run(config: Config, coordinator: Arc<ShutdownCoordinator>) -> Result<()> {
    let pipeline = build_pipeline(&config, crate::api::routes::default_groups(), coordinator)?;

    let listener = bind(&config).await?;

    serve(
        listener,
        pipeline,
        config.rate_limit_sweep_interval,
        config.shutdown_timeout,
    )
    .await
}
