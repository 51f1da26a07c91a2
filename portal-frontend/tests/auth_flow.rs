mod common;

use common::{future_exp, grant_body, make_token, past_exp, post_login, TestApp};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn login_round_trip_reaches_the_dashboard() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let access_token = make_token("maria", Some("coosalud"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("x-tenant-id", "coosalud"))
        .and(body_partial_json(serde_json::json!({
            "username": "maria",
            "tenant_id": "coosalud",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant_body(&access_token, "refresh-1")))
        .expect(1)
        .mount(&app.auth_api)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/stats"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "active_claims": 3 })),
        )
        .mount(&app.data_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "secret123").await;
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/dashboard");

    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.contains("maria"));
    assert!(body.contains("active_claims"));
}

#[tokio::test]
async fn rejected_login_shows_the_remote_detail() {
    let app = TestApp::spawn().await;
    let client = app.client();

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "detail": "Invalid username or password" })),
        )
        .mount(&app.auth_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "wrong").await;

    assert_eq!(response.status(), 303);
    let location = response.headers()["location"]
        .to_str()
        .expect("location not ascii");
    assert!(location.starts_with("/login?error="));
    assert!(location.contains("Invalid%20username%20or%20password"));
}

#[tokio::test]
async fn login_rejects_a_token_minted_for_another_tenant() {
    let app = TestApp::spawn().await;
    let client = app.client();

    // The grant itself is well formed, but its claims bind it to biomed.
    let foreign_token = make_token("maria", Some("biomed"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&foreign_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "secret123").await;

    assert_eq!(response.status(), 303);
    let location = response.headers()["location"]
        .to_str()
        .expect("location not ascii");
    assert!(location.contains("not%20valid%20for%20this%20portal"));

    // No session was created.
    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
}

#[tokio::test]
async fn cross_tenant_request_clears_the_session() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let access_token = make_token("maria", Some("coosalud"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&access_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "secret123").await;
    assert_eq!(response.status(), 303);

    // The coosalud session does not open biomed's portal; it is dropped.
    let response = client
        .get(app.url("/dashboard?tenant=biomed"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
    let location = response.headers()["location"]
        .to_str()
        .expect("location not ascii");
    assert!(location.starts_with("/login?next_url="));

    // Repeating the request is the same anonymous redirect, not an error.
    let response = client
        .get(app.url("/dashboard?tenant=biomed"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);

    // The original tenant's session is gone too.
    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_exactly_once() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let stale_token = make_token("maria", Some("coosalud"), &["member"], past_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&stale_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    let fresh_token = make_token("maria", Some("coosalud"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(header("x-tenant-id", "coosalud"))
        .and(body_partial_json(serde_json::json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": fresh_token,
            "refresh_token": "refresh-2",
        })))
        .expect(1)
        .mount(&app.auth_api)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/dashboard/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&app.data_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "secret123").await;
    assert_eq!(response.status(), 303);

    // First request refreshes, second finds the fresh token in the session.
    for _ in 0..2 {
        let response = client
            .get(app.url("/dashboard?tenant=coosalud"))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), 200);
    }
    // expect(1) on the refresh mock is verified when the server drops.
}

#[tokio::test]
async fn failed_refresh_clears_the_session() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let stale_token = make_token("maria", Some("coosalud"), &["member"], past_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&stale_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "detail": "Refresh token revoked",
        })))
        .expect(1)
        .mount(&app.auth_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "secret123").await;
    assert_eq!(response.status(), 303);

    // The failed refresh drops the session and the user lands on login.
    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
    let location = response.headers()["location"]
        .to_str()
        .expect("location not ascii");
    assert!(location.starts_with("/login?next_url="));

    // The cleared session must not trigger a second refresh attempt.
    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
}

#[tokio::test]
async fn logout_revokes_the_refresh_token_and_clears_the_session() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let access_token = make_token("maria", Some("coosalud"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&access_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(body_partial_json(serde_json::json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.auth_api)
        .await;

    let response = post_login(&app, &client, "coosalud", "maria", "secret123").await;
    assert_eq!(response.status(), 303);

    let response = client
        .get(app.url("/logout?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
    let location = response.headers()["location"]
        .to_str()
        .expect("location not ascii");
    assert!(location.starts_with("/login?message="));

    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
}

#[tokio::test]
async fn logout_clears_the_session_even_when_revocation_fails() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let access_token = make_token("maria", Some("coosalud"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&access_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.auth_api)
        .await;

    post_login(&app, &client, "coosalud", "maria", "secret123").await;

    let response = client
        .get(app.url("/logout?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);

    // The local session is gone regardless of the remote failure.
    let response = client
        .get(app.url("/dashboard?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 303);
}

#[tokio::test]
async fn signed_in_users_skip_the_login_page() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let access_token = make_token("maria", Some("coosalud"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&access_token, "refresh-1")),
        )
        .mount(&app.auth_api)
        .await;

    post_login(&app, &client, "coosalud", "maria", "secret123").await;

    let response = client
        .get(app.url("/login?tenant=coosalud"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/dashboard");
}

#[tokio::test]
async fn remember_me_is_stripped_when_the_tenant_disables_it() {
    let app = TestApp::spawn_with(|settings| {
        let dir = settings.tenancy.tenants_dir.clone();
        std::fs::create_dir_all(&dir).expect("Failed to create tenants dir");
        std::fs::write(
            dir.join("acme.json"),
            r#"{ "company_name": "Acme Health", "features": { "remember_me": false } }"#,
        )
        .expect("Failed to write tenant definition");
    })
    .await;
    let client = app.client();

    let access_token = make_token("maria", Some("acme"), &["member"], future_exp());
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(serde_json::json!({
            "username": "maria",
            "remember_me": false,
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(grant_body(&access_token, "refresh-1")),
        )
        .expect(1)
        .mount(&app.auth_api)
        .await;

    // The box is ticked, but the tenant has the feature off, so the wire
    // request must carry remember_me: false for the matcher to hit.
    let response = client
        .post(app.url("/login?tenant=acme"))
        .form(&[
            ("username", "maria"),
            ("password", "secret123"),
            ("remember_me", "true"),
        ])
        .send()
        .await
        .expect("Failed to send login request");

    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/dashboard");
}
