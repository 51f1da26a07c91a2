use crate::config::RemoteApiSettings;
use crate::middleware::tenant::TENANT_HEADER;
use portal_core::error::AppError;
use portal_core::observability::TracedClientExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Thin HTTP wrapper over the remote authentication API.
///
/// Every call carries the tenant id header so the remote side scopes
/// credentials and tokens to the right portal.
pub struct AuthClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub remember_me: bool,
    pub tenant_id: &'a str,
}

impl AuthClient {
    pub fn new(settings: &RemoteApiSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn login(
        &self,
        request: &LoginRequest<'_>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .traced_post(&format!("{}/auth/login", self.base_url))
            .header(TENANT_HEADER, request.tenant_id)
            .json(request)
            .send()
            .await
    }

    pub async fn refresh(
        &self,
        tenant_id: &str,
        refresh_token: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .traced_post(&format!("{}/auth/refresh-token", self.base_url))
            .header(TENANT_HEADER, tenant_id)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
    }

    pub async fn revoke(
        &self,
        tenant_id: &str,
        refresh_token: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .traced_post(&format!("{}/auth/logout", self.base_url))
            .header(TENANT_HEADER, tenant_id)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
    }

    pub async fn register(
        &self,
        tenant_id: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .traced_post(&format!("{}/auth/register", self.base_url))
            .header(TENANT_HEADER, tenant_id)
            .json(body)
            .send()
            .await
    }

    pub async fn forgot_password(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .traced_post(&format!("{}/auth/forgot-password", self.base_url))
            .header(TENANT_HEADER, tenant_id)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
    }

    pub async fn reset_password(
        &self,
        tenant_id: &str,
        token: &str,
        new_password: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .traced_post(&format!("{}/auth/reset-password", self.base_url))
            .header(TENANT_HEADER, tenant_id)
            .json(&serde_json::json!({ "token": token, "new_password": new_password }))
            .send()
            .await
    }
}
