use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use portal_core::error::AppError;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Reserved session key holding the whole authenticated-state record.
pub const SESSION_RECORD_KEY: &str = "portal.auth";

/// Everything the portal remembers about a logged-in user, kept under one
/// session key so it is written and cleared as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub authenticated: bool,
    /// Tenant the session was created under; every request re-checks it.
    pub tenant_id: String,
    pub user_id: String,
    pub username: String,
    pub user_roles: Vec<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    #[serde(default)]
    pub remote_session_id: Option<String>,
    pub login_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, max_age_seconds: u64, now: DateTime<Utc>) -> bool {
        now - self.last_activity > Duration::seconds(max_age_seconds as i64)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.user_roles.iter().any(|r| r == role)
    }
}

/// Typed view over the cookie-backed session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Session,
}

impl AuthSession {
    pub fn new(inner: Session) -> Self {
        Self { inner }
    }

    /// The auth record, or None for anonymous, absent, or unreadable state.
    pub async fn load(&self) -> Option<SessionRecord> {
        match self.inner.get::<SessionRecord>(SESSION_RECORD_KEY).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to read session record: {}", e);
                None
            }
        }
    }

    /// Replace the auth record in a single write.
    pub async fn save(&self, record: &SessionRecord) -> Result<(), AppError> {
        self.inner
            .insert(SESSION_RECORD_KEY, record)
            .await
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to write session record: {}", e))
            })
    }

    /// Drop all session state, returning the caller to anonymous.
    pub async fn clear(&self) {
        self.inner.clear().await;
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await.map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to extract session",
            )
                .into_response()
        })?;

        Ok(Self::new(session))
    }
}
