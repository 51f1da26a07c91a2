use crate::handlers::{escape_html, render_page};
use crate::middleware::tenant::TenantContext;
use crate::services::auth_client::LoginRequest;
use crate::session::AuthSession;
use crate::tenants::record::Feature;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct LoginPageParams {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub next_url: Option<String>,
}

pub async fn login_page(
    tenant: TenantContext,
    Query(params): Query<LoginPageParams>,
) -> impl IntoResponse {
    let record = &tenant.record;
    let mut body = String::new();

    if let Some(error) = &params.error {
        body.push_str(&format!(
            "<p class=\"error\">{}</p>",
            escape_html(error)
        ));
    }
    if let Some(message) = &params.message {
        body.push_str(&format!(
            "<p class=\"message\">{}</p>",
            escape_html(message)
        ));
    }
    if !record.branding.welcome_message.is_empty() {
        body.push_str(&format!(
            "<p>{}</p>",
            escape_html(&record.branding.welcome_message)
        ));
    }

    let next_url = params.next_url.as_deref().unwrap_or("");
    body.push_str(&format!(
        "<form method=\"post\" action=\"/login\">\
         <input type=\"hidden\" name=\"next_url\" value=\"{}\">\
         <label>Username <input type=\"text\" name=\"username\" autofocus></label>\
         <label>Password <input type=\"password\" name=\"password\"></label>",
        escape_html(next_url)
    ));
    if record.feature_enabled(Feature::RememberMe) {
        body.push_str(
            "<label><input type=\"checkbox\" name=\"remember_me\" value=\"true\"> \
             Remember me</label>",
        );
    }
    body.push_str("<button type=\"submit\">Sign in</button></form>");

    if record.feature_enabled(Feature::Registration) {
        body.push_str("<p><a href=\"/register\">Create an account</a></p>");
    }
    if record.feature_enabled(Feature::PasswordReset) {
        body.push_str("<p><a href=\"/forgot-password\">Forgot your password?</a></p>");
    }

    render_page(record, "Sign in", &body)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox: present when ticked, absent otherwise.
    #[serde(default)]
    pub remember_me: Option<String>,
    #[serde(default)]
    pub next_url: Option<String>,
}

pub async fn login_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    session: AuthSession,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return login_error_redirect(
            "Username and password are required",
            form.next_url.as_deref(),
        );
    }

    // Login attempts are throttled per tenant, so one portal under attack
    // cannot lock the others out.
    if let Err(wait) = state
        .login_limiter
        .check(&tenant.tenant_id, tenant.record.policy.max_login_attempts)
    {
        tracing::warn!(tenant_id = %tenant.tenant_id, "Login attempts throttled");
        return login_error_redirect(
            &format!("Too many login attempts. Try again in {} seconds", wait),
            form.next_url.as_deref(),
        );
    }

    let remember_me = form.remember_me.is_some() && tenant.is_feature_enabled(Feature::RememberMe);
    let request = LoginRequest {
        username,
        password: &form.password,
        remember_me,
        tenant_id: &tenant.tenant_id,
    };

    let grant = match state.auth.login(&tenant, &request).await {
        Ok(grant) => grant,
        Err(e) => return login_error_redirect(&e.to_string(), form.next_url.as_deref()),
    };

    if let Err(e) = state.auth.create_session(&session, &tenant, &grant).await {
        tracing::error!("Failed to persist login session: {}", e);
        return login_error_redirect(
            "Authentication service unavailable",
            form.next_url.as_deref(),
        );
    }

    Redirect::to(safe_next_url(form.next_url.as_deref())).into_response()
}

pub async fn logout_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    session: AuthSession,
) -> impl IntoResponse {
    state.auth.logout(&session, &tenant).await;
    Redirect::to("/login?message=You%20have%20been%20signed%20out")
}

#[derive(Debug, Deserialize)]
pub struct RegisterPageParams {
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn register_page(
    tenant: TenantContext,
    Query(params): Query<RegisterPageParams>,
) -> impl IntoResponse {
    let mut body = String::new();
    if let Some(error) = &params.error {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape_html(error)));
    }
    body.push_str(
        "<form method=\"post\" action=\"/register\">\
         <label>Username <input type=\"text\" name=\"username\"></label>\
         <label>Email <input type=\"email\" name=\"email\"></label>\
         <label>Password <input type=\"password\" name=\"password\"></label>\
         <label>Confirm password <input type=\"password\" name=\"confirm_password\"></label>\
         <label><input type=\"checkbox\" name=\"terms_accepted\" value=\"true\"> \
         I accept the terms of service</label>\
         <button type=\"submit\">Create account</button>\
         </form>\
         <p><a href=\"/login\">Back to sign in</a></p>",
    );

    render_page(&tenant.record, "Create account", &body)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[serde(default)]
    pub terms_accepted: Option<String>,
}

pub async fn register_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    Form(form): Form<RegisterForm>,
) -> Response {
    if let Err(errors) = form.validate() {
        return register_error_redirect(&first_validation_message(&errors));
    }
    if form.terms_accepted.is_none() {
        return register_error_redirect("You must accept the terms to register");
    }

    let body = serde_json::json!({
        "username": form.username,
        "email": form.email,
        "password": form.password,
    });

    match state.auth.register(&tenant, &body).await {
        Ok(()) => Redirect::to("/login?message=Registration%20successful.%20Please%20sign%20in")
            .into_response(),
        Err(e) => register_error_redirect(&e.to_string()),
    }
}

pub async fn forgot_password_page(tenant: TenantContext) -> impl IntoResponse {
    let body = "<p>Enter your email address and we will send you a reset link.</p>\
                <form method=\"post\" action=\"/forgot-password\">\
                <label>Email <input type=\"email\" name=\"email\"></label>\
                <button type=\"submit\">Send reset link</button>\
                </form>\
                <p><a href=\"/login\">Back to sign in</a></p>";

    render_page(&tenant.record, "Forgot password", body)
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

pub async fn forgot_password_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    let email = form.email.trim();
    if !email.is_empty() {
        state.auth.forgot_password(&tenant, email).await;
    }

    // Same response whether or not the account exists.
    Redirect::to("/login?message=If%20the%20account%20exists%2C%20a%20reset%20link%20has%20been%20sent")
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordParams {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn reset_password_page(
    tenant: TenantContext,
    Query(params): Query<ResetPasswordParams>,
) -> Response {
    let Some(token) = params.token.filter(|token| !token.is_empty()) else {
        return Redirect::to("/forgot-password").into_response();
    };

    let mut body = String::new();
    if let Some(error) = &params.error {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape_html(error)));
    }
    body.push_str(&format!(
        "<form method=\"post\" action=\"/reset-password\">\
         <input type=\"hidden\" name=\"token\" value=\"{}\">\
         <label>New password <input type=\"password\" name=\"password\"></label>\
         <label>Confirm password <input type=\"password\" name=\"confirm_password\"></label>\
         <button type=\"submit\">Update password</button>\
         </form>",
        escape_html(&token)
    ));

    render_page(&tenant.record, "Reset password", &body).into_response()
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

pub async fn reset_password_handler(
    State(state): State<AppState>,
    tenant: TenantContext,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    if form.token.is_empty() {
        return Redirect::to("/forgot-password").into_response();
    }
    if let Err(errors) = form.validate() {
        return reset_error_redirect(&form.token, &first_validation_message(&errors));
    }

    match state
        .auth
        .reset_password(&tenant, &form.token, &form.password)
        .await
    {
        Ok(()) => Redirect::to("/login?message=Password%20updated.%20Please%20sign%20in")
            .into_response(),
        Err(e) => reset_error_redirect(&form.token, &e.to_string()),
    }
}

/// Only same-site absolute paths may come back from the login form.
fn safe_next_url(next_url: Option<&str>) -> &str {
    match next_url {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/dashboard",
    }
}

fn login_error_redirect(error: &str, next_url: Option<&str>) -> Response {
    let mut target = format!("/login?error={}", urlencoding::encode(error));
    if let Some(next) = next_url {
        if !next.is_empty() {
            target.push_str(&format!("&next_url={}", urlencoding::encode(next)));
        }
    }
    Redirect::to(&target).into_response()
}

fn register_error_redirect(error: &str) -> Response {
    Redirect::to(&format!("/register?error={}", urlencoding::encode(error))).into_response()
}

fn reset_error_redirect(token: &str, error: &str) -> Response {
    Redirect::to(&format!(
        "/reset-password?token={}&error={}",
        urlencoding::encode(token),
        urlencoding::encode(error)
    ))
    .into_response()
}

/// First human-readable message out of a validation error set.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(_, field_errors)| field_errors.iter())
        .find_map(|error| error.message.as_ref().map(|message| message.to_string()))
        .unwrap_or_else(|| "Invalid form data".to_string())
}
