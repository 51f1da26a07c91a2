use crate::middleware::tenant::TenantContext;
use crate::session::AuthSession;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

/// Authentication outcome for the request, present even when anonymous.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<CurrentUser>,
}

/// Signed-in user view handed to handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub tenant_id: String,
    pub access_token: String,
    pub login_time: DateTime<Utc>,
}

impl CurrentUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Attach the authentication outcome to the request. Anonymous requests
/// proceed with an empty [`AuthState`]; deciding whether that is acceptable
/// for the route is the access policy's job.
pub async fn auth_gate_middleware(
    State(state): State<AppState>,
    session: AuthSession,
    mut request: Request,
    next: Next,
) -> Response {
    let tenant = request.extensions().get::<TenantContext>().cloned();

    let user = match tenant {
        Some(tenant) => state
            .auth
            .authenticate(&session, &tenant)
            .await
            .map(|record| CurrentUser {
                user_id: record.user_id,
                username: record.username,
                roles: record.user_roles,
                tenant_id: record.tenant_id,
                access_token: record.access_token,
                login_time: record.login_time,
            }),
        None => None,
    };

    request.extensions_mut().insert(AuthState { user });
    next.run(request).await
}

/// Extractor that sends anonymous visitors to the login page.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthState>()
            .and_then(|auth| auth.user.clone())
            .ok_or_else(|| Redirect::to("/login").into_response())
    }
}
