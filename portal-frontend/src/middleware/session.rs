use crate::middleware::tenant::TenantContext;
use crate::session::AuthSession;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use metrics::counter;

/// Enforce the per-tenant inactivity window and touch the activity stamp.
///
/// Expiry is judged against the activity recorded by the previous request;
/// only sessions that survive the check get their stamp moved forward.
pub async fn session_guard_middleware(
    State(state): State<AppState>,
    session: AuthSession,
    request: Request,
    next: Next,
) -> Response {
    if let Some(mut record) = session.load().await {
        if record.authenticated {
            let max_age = request
                .extensions()
                .get::<TenantContext>()
                .map(|tenant| tenant.record.policy.session_timeout_seconds)
                .unwrap_or(state.settings.session.max_age_seconds);
            let now = Utc::now();

            if record.is_expired(max_age, now) {
                tracing::info!(
                    user_id = %record.user_id,
                    tenant_id = %record.tenant_id,
                    "Session expired after inactivity, clearing"
                );
                counter!("portal_sessions_cleared_total", "reason" => "expired").increment(1);
                session.clear().await;
            } else {
                record.last_activity = now;
                if let Err(e) = session.save(&record).await {
                    tracing::warn!("Failed to update session activity: {}", e);
                }
            }
        }
    }

    next.run(request).await
}
