#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use marketplace_gateway::api::pipeline::{self, Pipeline};
use marketplace_gateway::api::routes::{RouteGroup, default_groups};
use marketplace_gateway::config::Config;
use marketplace_gateway::server::build_pipeline;
use marketplace_gateway::shutdown::ShutdownCoordinator;
use serde_json::{Value, json};

pub const TEST_SECRET: &str = "integration-test-signing-secret-0123456789";
pub const BOUNDARY: &str = "X-TEST-BOUNDARY";

pub fn test_config() -> Config {
    let mut config = Config::with_secret(TEST_SECRET);
    config.request_timeout = Duration::from_secs(5);
    config.shutdown_timeout = Duration::from_secs(5);
    config
}

/// Pipeline over `groups`, with a fresh coordinator.
pub fn create_pipeline(config: &Config, groups: Vec<RouteGroup>) -> Arc<Pipeline> {
    build_pipeline(config, groups, Arc::new(ShutdownCoordinator::new())).unwrap()
}

pub fn create_test_server_with(
    config: &Config,
    groups: Vec<RouteGroup>,
) -> (TestServer, Arc<Pipeline>) {
    let pipeline = create_pipeline(config, groups);
    let server = TestServer::new(pipeline::router(pipeline.clone())).unwrap();
    (server, pipeline)
}

pub fn create_test_server() -> (TestServer, Arc<Pipeline>) {
    create_test_server_with(&test_config(), default_groups())
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Registers an account and logs in. Returns `(user_id, token)`.
pub async fn register_and_login(server: &TestServer, email: &str) -> (String, String) {
    let response = server
        .post("/api/users/register")
        .json(&json!({
            "email": email,
            "display_name": "Test User",
            "password": "correct-horse-battery"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let user_id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": "correct-horse-battery" }))
        .await;
    response.assert_status_ok();
    let token = response.json::<Value>()["token"].as_str().unwrap().to_string();

    (user_id, token)
}

/// Builds a multipart body; `files` entries are `(field, file_name, content_type, bytes)`.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &str, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in fields {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        out.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    for (name, file_name, content_type, data) in files {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        out.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
                .as_bytes(),
        );
        out.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// Asserts the envelope shape and returns it.
pub fn assert_envelope(body: &Value, status: u16, kind: &str) {
    assert_eq!(body["statusCode"], status, "envelope: {body}");
    assert_eq!(body["errorKind"], kind, "envelope: {body}");
    assert!(body["message"].is_string(), "envelope: {body}");
}
