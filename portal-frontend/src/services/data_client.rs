use crate::config::RemoteApiSettings;
use crate::middleware::tenant::{TenantContext, TENANT_HEADER};
use portal_core::error::AppError;
use portal_core::observability::TracedClientExt;
use reqwest::Client;
use std::time::Duration;

/// Client for the tenant-scoped data API that backs the dashboard and the
/// JSON proxy endpoints.
pub struct DataClient {
    client: Client,
    base_url: String,
}

impl DataClient {
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

    /// Fetch a JSON document on behalf of the signed-in user. Tenants may
    /// point at their own API and tighten the timeout through their policy.
    pub async fn fetch_json(
        &self,
        tenant: &TenantContext,
        access_token: &str,
        path: &str,
    ) -> Result<serde_json::Value, AppError> {
        let base = tenant
            .record
            .policy
            .api_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        let url = format!("{}{}", base, path);

        let mut request = self
            .client
            .traced_get(&url)
            .bearer_auth(access_token)
            .header(TENANT_HEADER, &tenant.tenant_id);
        if let Some(seconds) = tenant.record.policy.api_timeout_seconds {
            request = request.timeout(Duration::from_secs(seconds));
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %url, "Data API request failed: {}", e);
            AppError::BadGateway("data API unreachable".to_string())
        })?;

        if !response.status().is_success() {
            tracing::warn!(
                url = %url,
                status = %response.status(),
                "Data API returned an error"
            );
            return Err(AppError::BadGateway(format!(
                "data API returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse data API response: {}", e);
            AppError::BadGateway("data API returned invalid JSON".to_string())
        })
    }

    pub async fn dashboard_stats(
        &self,
        tenant: &TenantContext,
        access_token: &str,
    ) -> Result<serde_json::Value, AppError> {
        self.fetch_json(tenant, access_token, "/api/v1/dashboard/stats")
            .await
    }
}
