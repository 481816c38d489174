mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use tokio::net::TcpListener;

use marketplace_gateway::api::routes::{Access, RouteGroup, default_groups};
use marketplace_gateway::server::{build_pipeline, serve};
use marketplace_gateway::shutdown::{Phase, ShutdownCoordinator};

async fn slow_work() -> &'static str {
    tokio::time::sleep(Duration::from_millis(300)).await;
    "done"
}

async fn stuck() -> &'static str {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "never"
}

fn groups() -> Vec<RouteGroup> {
    let mut groups = default_groups();
    groups.push(
        RouteGroup::new("/api/work", Access::Public)
            .public(Method::GET, "/slow", slow_work)
            .public(Method::GET, "/stuck", stuck),
    );
    groups
}

async fn start(
    shutdown_timeout: Duration,
) -> (
    String,
    Arc<ShutdownCoordinator>,
    tokio::task::JoinHandle<anyhow::Result<()>>,
) {
    let mut config = common::test_config();
    config.request_timeout = Duration::from_secs(60);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let coordinator = Arc::new(ShutdownCoordinator::new());
    let pipeline = build_pipeline(&config, groups(), coordinator.clone()).unwrap();
    let server = tokio::spawn(serve(
        listener,
        pipeline,
        Duration::from_secs(60),
        shutdown_timeout,
    ));

    (base, coordinator, server)
}

async fn wait_for_in_flight(coordinator: &ShutdownCoordinator) {
    for _ in 0..200 {
        if coordinator.in_flight() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("request never reached the pipeline");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serves_over_tcp() {
    let (base, coordinator, server) = start(Duration::from_secs(5)).await;

    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");

    let response = reqwest::get(format!("{base}/health/")).await.unwrap();
    assert_eq!(response.status(), 200);

    coordinator.begin_drain();
    server.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drain_completes_in_flight_request() {
    let (base, coordinator, server) = start(Duration::from_secs(5)).await;

    let in_flight = tokio::spawn(reqwest::get(format!("{base}/api/work/slow")));
    wait_for_in_flight(&coordinator).await;

    assert!(coordinator.begin_drain());
    assert_eq!(coordinator.phase(), Phase::Draining);

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");

    server.await.unwrap().unwrap();
    assert_eq!(coordinator.phase(), Phase::Stopped);
    assert_eq!(coordinator.in_flight(), 0);

    assert!(reqwest::get(format!("{base}/health")).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drain_timeout_is_an_error() {
    let (base, coordinator, server) = start(Duration::from_millis(100)).await;

    let _stuck = tokio::spawn(reqwest::get(format!("{base}/api/work/stuck")));
    wait_for_in_flight(&coordinator).await;

    coordinator.begin_drain();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("serve should give up after the shutdown timeout")
        .unwrap();

    assert!(result.is_err());
    assert_eq!(coordinator.phase(), Phase::Stopped);
}
