//! HTTP request/response tracing middleware.

use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Creates the outermost tracing layer of the gateway.
///
/// Wraps the whole pipeline, so rejections from every stage (rate limiting,
/// authentication, upload limits) are logged with their final status and latency.
///
/// # Example Logs
///
/// ```text
/// INFO request{method=POST uri=/api/listings version=HTTP/1.1}: finished processing request
///     latency=12 ms status=201
/// INFO request{method=GET uri=/api/search version=HTTP/1.1}: finished processing request
///     latency=0 ms status=429
/// ```
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
