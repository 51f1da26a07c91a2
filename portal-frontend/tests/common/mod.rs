//! Test helper module for portal-frontend integration tests.
//!
//! Spawns the application on a random port against wiremock stand-ins for
//! the remote auth and data APIs.

#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use portal_frontend::config::{
    ObservabilitySettings, RemoteApiSettings, SecuritySettings, ServerSettings, SessionSettings,
    Settings, TenancySettings,
};
use portal_frontend::startup::Application;
use secrecy::Secret;
use tempfile::TempDir;
use wiremock::MockServer;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub auth_api: MockServer,
    pub data_api: MockServer,
    // Held so the tenant directory outlives the test.
    _tenants_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with configuration adjustments applied before build. The
    /// closure may also pre-populate the tenant directory; when it does,
    /// seeding is skipped and only those definitions exist.
    pub async fn spawn_with(customize: impl FnOnce(&mut Settings)) -> Self {
        let auth_api = MockServer::start().await;
        let data_api = MockServer::start().await;
        let tenants_dir = TempDir::new().expect("Failed to create temp dir");

        let mut settings = Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
                debug: true,
            },
            session: SessionSettings {
                secret: Secret::new("portal-test-session-secret".to_string()),
                cookie_name: "portal_session".to_string(),
                max_age_seconds: 86400,
                secure_cookies: false,
            },
            auth_api: RemoteApiSettings {
                base_url: auth_api.uri(),
                timeout_seconds: 5,
            },
            data_api: RemoteApiSettings {
                base_url: data_api.uri(),
                timeout_seconds: 5,
            },
            tenancy: TenancySettings {
                tenants_dir: tenants_dir.path().join("tenants"),
                default_tenant: "default".to_string(),
            },
            security: SecuritySettings::default(),
            observability: ObservabilitySettings::default(),
        };
        customize(&mut settings);

        let app = Application::build(settings)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            auth_api,
            data_api,
            _tenants_dir: tenants_dir,
        }
    }

    /// Client with a cookie jar and redirects disabled, so tests can assert
    /// on individual hops.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// JWT-shaped token whose claims the portal can decode. The signature part
/// is never verified by the portal, so any filler works.
pub fn make_token(sub: &str, tenant_id: Option<&str>, roles: &[&str], exp: i64) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let mut claims = serde_json::json!({
        "sub": sub,
        "username": sub,
        "roles": roles,
        "exp": exp,
        "iat": chrono::Utc::now().timestamp(),
    });
    if let Some(tenant_id) = tenant_id {
        claims["tenant_id"] = serde_json::json!(tenant_id);
    }
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());

    format!("{}.{}.test-signature", header, payload)
}

pub fn future_exp() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

pub fn past_exp() -> i64 {
    chrono::Utc::now().timestamp() - 3600
}

pub fn grant_body(access_token: &str, refresh_token: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "session_id": "sess-1",
    })
}

pub async fn post_login(
    app: &TestApp,
    client: &reqwest::Client,
    tenant: &str,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(app.url(&format!("/login?tenant={}", tenant)))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("Failed to send login request")
}
