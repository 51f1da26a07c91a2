pub mod admin;
pub mod api;
pub mod app;
pub mod auth;
pub mod dashboard;
pub mod debug;
pub mod metrics;

use crate::tenants::record::TenantRecord;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Minimal HTML escaping for values interpolated into inline pages.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Shared inline page shell. Branding values come straight from the tenant
/// record; every interpolation point is escaped.
pub fn render_page(record: &TenantRecord, title: &str, body: &str) -> Html<String> {
    let name = escape_html(record.display_name());
    let footer = escape_html(&record.branding.footer_text);
    let support = escape_html(&record.branding.support_email);

    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} | {name}</title>\n\
         <style>:root {{ --primary: {primary}; --secondary: {secondary}; }}\n\
         body {{ margin: 0; font-family: sans-serif; background: var(--secondary); }}\n\
         header {{ background: var(--primary); color: #fff; padding: 1rem; }}\n\
         main {{ max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }}\n\
         footer {{ text-align: center; color: #666; padding: 1rem; }}</style>\n\
         </head>\n\
         <body>\n\
         <header><h1>{name}</h1></header>\n\
         <main>\n{body}\n</main>\n\
         <footer>{footer} {support}</footer>\n\
         </body>\n\
         </html>",
        title = escape_html(title),
        name = name,
        primary = escape_html(&record.branding.primary_color),
        secondary = escape_html(&record.branding.secondary_color),
        body = body,
        footer = footer,
        support = support,
    ))
}

/// Branded not-found page. Also used by the access policy when a
/// feature-gated route pretends not to exist.
pub fn not_found_page(record: &TenantRecord) -> Response {
    let body = "<h2>Page not found</h2><p>The page you are looking for does not exist.</p>";
    (StatusCode::NOT_FOUND, render_page(record, "Not found", body)).into_response()
}

pub fn forbidden_page(record: &TenantRecord) -> Response {
    let body = "<h2>Access denied</h2><p>You do not have permission to view this page.</p>";
    (StatusCode::FORBIDDEN, render_page(record, "Forbidden", body)).into_response()
}
