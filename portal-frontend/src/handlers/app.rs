use crate::middleware::auth::AuthState;
use crate::middleware::tenant::TenantContext;
use crate::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use serde_json::json;

/// Root route: straight to the dashboard or the login page.
pub async fn index(Extension(auth): Extension<AuthState>) -> impl IntoResponse {
    if auth.user.is_some() {
        Redirect::to("/dashboard")
    } else {
        Redirect::to("/login")
    }
}

/// Liveness endpoint. Debug mode adds tenant diagnostics.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut body = json!({
        "status": "ok",
        "service": "portal-frontend",
        "version": env!("CARGO_PKG_VERSION"),
    });

    if state.settings.server.debug {
        let ids = state.registry.tenant_ids();
        body["tenants"] = json!({ "count": ids.len(), "ids": ids });
    }

    Json(body)
}

/// Branded 403 page, the target of the policy's forbidden redirect.
pub async fn forbidden(tenant: TenantContext) -> impl IntoResponse {
    super::forbidden_page(&tenant.record)
}
