use crate::middleware::tenant::TenantContext;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use portal_core::error::AppError;
use serde_json::json;

/// Registry listing. 404 outside debug mode so production deployments do
/// not advertise their tenant set.
pub async fn tenant_list(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_debug(&state)?;

    let tenants: Vec<serde_json::Value> = state
        .registry
        .tenant_ids()
        .into_iter()
        .map(|tenant_id| {
            let record = state.registry.get(&tenant_id);
            json!({
                "tenant_id": tenant_id,
                "display_name": record.display_name(),
                "domains": record.domains,
                "subdomain_aliases": record.subdomain_aliases,
            })
        })
        .collect();

    Ok(Json(json!({ "count": tenants.len(), "tenants": tenants })))
}

/// How the current request's tenant was resolved.
pub async fn tenant_info(
    State(state): State<AppState>,
    tenant: TenantContext,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    require_debug(&state)?;

    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    Ok(Json(json!({
        "tenant_id": tenant.tenant_id,
        "display_name": tenant.record.display_name(),
        "strategy": tenant.strategy.as_str(),
        "detection_time_ms": tenant.detection_time.as_secs_f64() * 1000.0,
        "host": host,
    })))
}

fn require_debug(state: &AppState) -> Result<(), AppError> {
    if state.settings.server.debug {
        Ok(())
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Not found")))
    }
}
