mod common;

use serde_json::Value;

#[tokio::test]
async fn test_health_ok() {
    let (server, _) = common::create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["environment"], "development");
    assert!(json["uptime"].as_f64().unwrap() >= 0.0);
    assert!(json["timestamp"].is_string());
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_health_has_security_headers() {
    let (server, _) = common::create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["referrer-policy"], "no-referrer");
}

#[tokio::test]
async fn test_docs_are_public() {
    let (server, _) = common::create_test_server();

    server.get("/docs").await.assert_status_ok();

    let response = server.get("/docs/openapi.json").await;
    response.assert_status_ok();
    let json = response.json::<Value>();
    assert!(json["paths"]["/health"].is_object());
}
