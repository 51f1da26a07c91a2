mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "portal-frontend");
    // Debug mode is on in tests, so the tenant summary is included.
    let ids: Vec<&str> = body["tenants"]["ids"]
        .as_array()
        .expect("tenant ids missing")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(ids.contains(&"coosalud"));
}

#[tokio::test]
async fn responses_carry_security_and_timing_headers() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("x-process-time"));
}

#[tokio::test]
async fn request_id_round_trips() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(app.url("/health"))
        .header("x-request-id", "test-request-42")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.headers()["x-request-id"], "test-request-42");

    // Missing IDs are generated rather than echoed back empty.
    let response = client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");
    let generated = response.headers()["x-request-id"]
        .to_str()
        .expect("request id not ascii");
    assert!(!generated.is_empty());
}

#[tokio::test]
async fn metrics_expose_request_counters() {
    let app = TestApp::spawn().await;
    let client = app.client();

    // Drive at least one request through the metrics middleware first.
    client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .get(app.url("/metrics"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("http_requests_total"));
}
