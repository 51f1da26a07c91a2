//! Tenant resolution middleware.
//!
//! Runs before sessions and auth so every downstream layer can rely on a
//! resolved [`TenantContext`] in the request extensions.

use crate::tenants::record::{Feature, TenantRecord};
use crate::tenants::resolver::{RequestSignals, Strategy};
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use metrics::histogram;
use portal_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Header carrying an explicit tenant id, on requests and debug echoes.
pub const TENANT_HEADER: &str = "x-tenant-id";
/// Debug echo header with the resolved tenant's display name.
pub const TENANT_NAME_HEADER: &str = "x-tenant-name";
/// Query parameter carrying an explicit tenant id.
pub const TENANT_QUERY_PARAM: &str = "tenant";

/// Resolved tenant for the current request.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub record: Arc<TenantRecord>,
    pub strategy: Strategy,
    pub detection_time: Duration,
}

impl TenantContext {
    pub fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.record.feature_enabled(feature)
    }
}

/// Pull the tenant parameter out of a raw query string.
fn query_tenant(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == TENANT_QUERY_PARAM && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Resolve the tenant from request signals and stash it in the extensions.
/// In debug mode the resolution is echoed back on the response headers.
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();

    let query_tenant = request.uri().query().and_then(query_tenant);
    let header_tenant = request
        .headers()
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .or_else(|| request.uri().host().map(|host| host.to_string()));

    let signals = RequestSignals {
        query_tenant: query_tenant.as_deref(),
        header_tenant: header_tenant.as_deref(),
        host: host.as_deref(),
    };
    let resolution = state.resolver.resolve(&signals);
    let record = state.registry.get(&resolution.tenant_id);
    let detection_time = started.elapsed();

    histogram!("tenant_detection_seconds").record(detection_time.as_secs_f64());
    tracing::debug!(
        tenant_id = %resolution.tenant_id,
        strategy = %resolution.strategy,
        "Resolved request tenant"
    );

    let context = TenantContext {
        tenant_id: resolution.tenant_id,
        record,
        strategy: resolution.strategy,
        detection_time,
    };
    let echo = state.settings.server.debug.then(|| {
        (
            context.tenant_id.clone(),
            context.record.display_name().to_string(),
        )
    });
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;

    if let Some((tenant_id, tenant_name)) = echo {
        if let Ok(value) = tenant_id.parse() {
            response.headers_mut().insert(TENANT_HEADER, value);
        }
        if let Ok(value) = tenant_name.parse() {
            response.headers_mut().insert(TENANT_NAME_HEADER, value);
        }
    }

    response
}

/// Extractor for handlers that need the resolved tenant.
#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Tenant context not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_tenant_finds_the_parameter() {
        assert_eq!(
            query_tenant("next_url=%2Fdashboard&tenant=biomed"),
            Some("biomed".to_string())
        );
        assert_eq!(query_tenant("tenant="), None);
        assert_eq!(query_tenant("other=1"), None);
    }
}
