use crate::handlers;
use crate::middleware::auth::AuthState;
use crate::middleware::tenant::TenantContext;
use crate::policy::{Decision, PolicyInput};
use crate::tenants::registry::DEFAULT_TENANT_ID;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use portal_core::error::AppError;

/// Whether a request should get JSON errors instead of redirects.
///
/// A browser navigating pages sends `text/html` in its Accept list even when
/// JSON is also acceptable, so Accept only counts when html is absent.
pub fn is_api_request(path: &str, headers: &HeaderMap) -> bool {
    if path.starts_with("/api/") {
        return true;
    }

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if accept.contains("application/json") && !accept.contains("text/html") {
        return true;
    }

    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false)
}

/// Enforce the route access table. Runs innermost of the guard layers so it
/// only has to map established facts to a decision.
pub async fn access_policy_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let api = is_api_request(&path, request.headers());

    let auth = request
        .extensions()
        .get::<AuthState>()
        .cloned()
        .unwrap_or_default();
    let record = request
        .extensions()
        .get::<TenantContext>()
        .map(|tenant| tenant.record.clone())
        .unwrap_or_else(|| state.registry.get(DEFAULT_TENANT_ID));

    let roles: &[String] = auth
        .user
        .as_ref()
        .map(|user| user.roles.as_slice())
        .unwrap_or(&[]);
    let input = PolicyInput {
        authenticated: auth.user.is_some(),
        roles,
        record: &record,
    };

    match state.policy.check(&path, &input) {
        Decision::Allow => next.run(request).await,
        Decision::RedirectLogin => {
            if api {
                AppError::Unauthorized(anyhow::anyhow!("Authentication required")).into_response()
            } else {
                let target = format!("/login?next_url={}", urlencoding::encode(&path_and_query));
                Redirect::to(&target).into_response()
            }
        }
        Decision::RedirectHome => Redirect::to("/dashboard").into_response(),
        Decision::Forbidden => {
            if api {
                AppError::Forbidden(anyhow::anyhow!("Insufficient permissions")).into_response()
            } else {
                Redirect::to("/403").into_response()
            }
        }
        Decision::NotFound => {
            if api {
                AppError::NotFound(anyhow::anyhow!("Not found")).into_response()
            } else {
                handlers::not_found_page(&record).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_prefix_is_always_api() {
        assert!(is_api_request("/api/me", &HeaderMap::new()));
    }

    #[test]
    fn browser_accept_lists_stay_web() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json"),
        );
        assert!(!is_api_request("/dashboard", &headers));
    }

    #[test]
    fn json_only_accept_is_api() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(is_api_request("/dashboard", &headers));
    }

    #[test]
    fn json_body_is_api() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        assert!(is_api_request("/dashboard", &headers));
    }
}
