use crate::handlers::{escape_html, render_page};
use crate::middleware::auth::CurrentUser;
use crate::middleware::tenant::TenantContext;
use crate::AppState;
use axum::{extract::State, response::IntoResponse};

/// Registry overview for operators. Role enforcement happens in the access
/// policy before this handler runs.
pub async fn admin_dashboard_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    user: CurrentUser,
) -> impl IntoResponse {
    let mut rows = String::new();
    for tenant_id in state.registry.tenant_ids() {
        if let Some(record) = state.registry.find(&tenant_id) {
            let features = [
                ("registration", record.features.registration),
                ("password_reset", record.features.password_reset),
                ("remember_me", record.features.remember_me),
                ("two_factor", record.features.two_factor),
            ]
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");

            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&tenant_id),
                escape_html(&record.company_name),
                record.domains.len(),
                escape_html(&features),
            ));
        }
    }

    let body = format!(
        "<h2>Tenant administration</h2>\
         <p>Signed in as {} with roles: {}</p>\
         <table>\
         <thead><tr><th>Tenant</th><th>Company</th><th>Domains</th><th>Features</th></tr></thead>\
         <tbody>{}</tbody>\
         </table>",
        escape_html(&user.username),
        escape_html(&user.roles.join(", ")),
        rows,
    );

    render_page(&tenant.record, "Administration", &body)
}
