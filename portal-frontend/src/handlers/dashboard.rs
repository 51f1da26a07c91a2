use crate::handlers::{escape_html, render_page};
use crate::middleware::auth::CurrentUser;
use crate::middleware::tenant::TenantContext;
use crate::AppState;
use axum::{extract::State, response::IntoResponse};

/// Member landing page. Statistics come from the data API; when it is down
/// the page renders placeholders instead of failing.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    user: CurrentUser,
) -> impl IntoResponse {
    let stats = state
        .data_api
        .dashboard_stats(&tenant, &user.access_token)
        .await;

    let mut body = format!("<h2>Welcome back, {}</h2>", escape_html(&user.username));

    match stats {
        Ok(stats) => {
            body.push_str("<ul class=\"stats\">");
            if let Some(entries) = stats.as_object() {
                for (key, value) in entries {
                    body.push_str(&format!(
                        "<li><span>{}</span> <strong>{}</strong></li>",
                        escape_html(key),
                        escape_html(&display_value(value)),
                    ));
                }
            }
            body.push_str("</ul>");
        }
        Err(e) => {
            tracing::warn!("Dashboard statistics unavailable: {}", e);
            body.push_str(
                "<p class=\"notice\">Statistics are temporarily unavailable.</p>\
                 <ul class=\"stats\">\
                 <li><span>active_claims</span> <strong>N/A</strong></li>\
                 <li><span>pending_documents</span> <strong>N/A</strong></li>\
                 </ul>",
            );
        }
    }

    body.push_str(&format!(
        "<p>Signed in as {} on {}</p><p><a href=\"/logout\">Sign out</a></p>",
        escape_html(&user.username),
        escape_html(&user.tenant_id),
    ));

    render_page(&tenant.record, "Dashboard", &body)
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
