use crate::middleware::tenant::TenantContext;
use crate::services::auth_client::{AuthClient, LoginRequest};
use crate::session::{AuthSession, SessionRecord};
use crate::utils::jwt::{decode_jwt_claims, is_token_expired};
use chrono::Utc;
use metrics::counter;
use portal_core::error::AppError;
use serde::Deserialize;

/// Token pair issued by the auth API on login.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Response to a refresh call. The refresh token only rotates when the auth
/// API decides to rotate it.
#[derive(Debug, Deserialize)]
struct RefreshGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The auth API rejected the credentials or the submitted data.
    #[error("{0}")]
    Rejected(String),
    /// The issued token belongs to another tenant's account.
    #[error("This account is not valid for this portal")]
    TenantMismatch,
    #[error("Authentication service unavailable")]
    Unavailable,
}

/// Session authority for the portal: exchanges credentials with the auth
/// API, enforces the session's tenant binding, and keeps access tokens
/// fresh. Any state it cannot vouch for is cleared rather than repaired.
pub struct AuthGate {
    client: AuthClient,
}

impl AuthGate {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for tokens. The tenant binding is checked before
    /// anything is stored, so a token minted for another portal never
    /// becomes a session.
    pub async fn login(
        &self,
        tenant: &TenantContext,
        request: &LoginRequest<'_>,
    ) -> Result<TokenGrant, LoginError> {
        let response = self.client.login(request).await.map_err(|e| {
            tracing::error!("Login request to auth API failed: {}", e);
            LoginError::Unavailable
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = rejection_detail(response, "Invalid username or password").await;
            tracing::info!(
                tenant_id = %tenant.tenant_id,
                status = %status,
                "Login rejected by auth API"
            );
            return Err(LoginError::Rejected(detail));
        }

        let grant: TokenGrant = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse login response: {}", e);
            LoginError::Unavailable
        })?;

        let claims = decode_jwt_claims(&grant.access_token).map_err(|e| {
            tracing::error!("Auth API issued an undecodable access token: {}", e);
            LoginError::Unavailable
        })?;

        if let Some(token_tenant) = &claims.tenant_id {
            if token_tenant != &tenant.tenant_id {
                tracing::warn!(
                    tenant_id = %tenant.tenant_id,
                    token_tenant = %token_tenant,
                    "Login produced a token for a different tenant"
                );
                return Err(LoginError::TenantMismatch);
            }
        }

        Ok(grant)
    }

    /// Store the session record for a fresh login in a single write.
    pub async fn create_session(
        &self,
        session: &AuthSession,
        tenant: &TenantContext,
        grant: &TokenGrant,
    ) -> Result<SessionRecord, AppError> {
        let claims = decode_jwt_claims(&grant.access_token).map_err(AppError::InternalError)?;
        let now = Utc::now();
        let record = SessionRecord {
            authenticated: true,
            tenant_id: tenant.tenant_id.clone(),
            user_id: claims.sub.clone(),
            username: claims.username.unwrap_or(claims.sub),
            user_roles: claims.roles,
            access_token: grant.access_token.clone(),
            refresh_token: grant.refresh_token.clone(),
            token_type: grant.token_type.clone(),
            remote_session_id: grant.session_id.clone(),
            login_time: now,
            last_activity: now,
        };

        session.save(&record).await?;
        tracing::info!(
            user_id = %record.user_id,
            tenant_id = %record.tenant_id,
            "User logged in successfully"
        );

        Ok(record)
    }

    /// Resolve the request's session to an authenticated record, or None for
    /// anonymous. A session created under another tenant is cleared here,
    /// and an expired access token gets exactly one refresh attempt.
    pub async fn authenticate(
        &self,
        session: &AuthSession,
        tenant: &TenantContext,
    ) -> Option<SessionRecord> {
        let record = session.load().await?;

        if !record.authenticated || record.access_token.is_empty() {
            session.clear().await;
            return None;
        }

        if record.tenant_id != tenant.tenant_id {
            tracing::warn!(
                session_tenant = %record.tenant_id,
                request_tenant = %tenant.tenant_id,
                "Session belongs to a different tenant, clearing"
            );
            self.clear_for(session, "tenant_mismatch").await;
            return None;
        }

        if is_token_expired(&record.access_token) {
            return self.refresh_session(session, tenant, record).await;
        }

        Some(record)
    }

    /// One refresh attempt per request. Any failure clears the session
    /// instead of retrying, so a dead refresh token cannot loop.
    async fn refresh_session(
        &self,
        session: &AuthSession,
        tenant: &TenantContext,
        mut record: SessionRecord,
    ) -> Option<SessionRecord> {
        let response = match self
            .client
            .refresh(&tenant.tenant_id, &record.refresh_token)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Token refresh request failed: {}", e);
                self.clear_for(session, "refresh_failed").await;
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::info!(
                tenant_id = %tenant.tenant_id,
                status = %response.status(),
                "Token refresh rejected, clearing session"
            );
            self.clear_for(session, "refresh_rejected").await;
            return None;
        }

        let grant: RefreshGrant = match response.json().await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!("Failed to parse refresh response: {}", e);
                self.clear_for(session, "refresh_failed").await;
                return None;
            }
        };

        let claims = match decode_jwt_claims(&grant.access_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("Refreshed access token is undecodable: {}", e);
                self.clear_for(session, "refresh_failed").await;
                return None;
            }
        };

        if let Some(token_tenant) = &claims.tenant_id {
            if token_tenant != &tenant.tenant_id {
                tracing::warn!(
                    tenant_id = %tenant.tenant_id,
                    token_tenant = %token_tenant,
                    "Refresh produced a token for a different tenant, clearing session"
                );
                self.clear_for(session, "tenant_mismatch").await;
                return None;
            }
        }

        record.access_token = grant.access_token;
        if let Some(refresh_token) = grant.refresh_token {
            record.refresh_token = refresh_token;
        }
        record.user_roles = claims.roles;

        if let Err(e) = session.save(&record).await {
            tracing::warn!("Failed to persist refreshed session: {}", e);
            session.clear().await;
            return None;
        }

        tracing::debug!(user_id = %record.user_id, "Access token refreshed");
        Some(record)
    }

    /// Revoke the refresh token remotely, then clear local state regardless
    /// of how the revocation went.
    pub async fn logout(&self, session: &AuthSession, tenant: &TenantContext) {
        if let Some(record) = session.load().await {
            if record.authenticated && !record.refresh_token.is_empty() {
                match self
                    .client
                    .revoke(&tenant.tenant_id, &record.refresh_token)
                    .await
                {
                    Ok(response) if response.status().is_success() => {
                        tracing::info!(user_id = %record.user_id, "Refresh token revoked");
                    }
                    Ok(response) => {
                        tracing::warn!(
                            status = %response.status(),
                            "Auth API refused token revocation"
                        );
                    }
                    Err(e) => {
                        tracing::warn!("Token revocation request failed: {}", e);
                    }
                }
            }
        }

        session.clear().await;
    }

    pub async fn register(
        &self,
        tenant: &TenantContext,
        body: &serde_json::Value,
    ) -> Result<(), LoginError> {
        let response = self
            .client
            .register(&tenant.tenant_id, body)
            .await
            .map_err(|e| {
                tracing::error!("Registration request to auth API failed: {}", e);
                LoginError::Unavailable
            })?;

        if !response.status().is_success() {
            let detail = rejection_detail(response, "Registration failed").await;
            return Err(LoginError::Rejected(detail));
        }

        Ok(())
    }

    /// Always resolves so the page cannot be used to probe which accounts
    /// exist. Failures are only logged.
    pub async fn forgot_password(&self, tenant: &TenantContext, email: &str) {
        match self.client.forgot_password(&tenant.tenant_id, email).await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    status = %response.status(),
                    "Password reset request refused by auth API"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Password reset request failed: {}", e);
            }
        }
    }

    pub async fn reset_password(
        &self,
        tenant: &TenantContext,
        token: &str,
        new_password: &str,
    ) -> Result<(), LoginError> {
        let response = self
            .client
            .reset_password(&tenant.tenant_id, token, new_password)
            .await
            .map_err(|e| {
                tracing::error!("Password reset request to auth API failed: {}", e);
                LoginError::Unavailable
            })?;

        if !response.status().is_success() {
            let detail = rejection_detail(response, "Password reset failed").await;
            return Err(LoginError::Rejected(detail));
        }

        Ok(())
    }

    async fn clear_for(&self, session: &AuthSession, reason: &'static str) {
        counter!("portal_sessions_cleared_total", "reason" => reason).increment(1);
        session.clear().await;
    }
}

/// Pull the human-readable rejection reason out of an error body.
async fn rejection_detail(response: reqwest::Response, fallback: &str) -> String {
    match response.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("detail")
            .and_then(|detail| detail.as_str())
            .map(|detail| detail.to_string())
            .unwrap_or_else(|| fallback.to_string()),
        Err(_) => fallback.to_string(),
    }
}
