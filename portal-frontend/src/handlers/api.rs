use crate::middleware::auth::CurrentUser;
use crate::middleware::tenant::TenantContext;
use crate::AppState;
use axum::{extract::State, Json};
use portal_core::error::AppError;
use serde_json::json;

/// Session identity as JSON.
pub async fn me_handler(user: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({
        "user_id": user.user_id,
        "username": user.username,
        "roles": user.roles,
        "tenant_id": user.tenant_id,
        "login_time": user.login_time,
    }))
}

/// Bearer-token proxy of the data API statistics. Failures surface as the
/// JSON error taxonomy, never as a redirect.
pub async fn stats_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let stats = state
        .data_api
        .dashboard_stats(&tenant, &user.access_token)
        .await?;

    Ok(Json(stats))
}
