use crate::config::Settings;
use crate::handlers::{
    admin::admin_dashboard_handler,
    api::{me_handler, stats_handler},
    app::{forbidden, health_check, index},
    auth::{
        forgot_password_handler, forgot_password_page, login_handler, login_page, logout_handler,
        register_handler, register_page, reset_password_handler, reset_password_page,
    },
    dashboard::dashboard_handler,
    debug::{tenant_info, tenant_list},
};
use crate::middleware::{
    auth::auth_gate_middleware, policy::access_policy_middleware,
    session::session_guard_middleware, tenant::tenant_context_middleware,
};
use crate::policy::AccessPolicy;
use crate::services::{auth_client::AuthClient, auth_gate::AuthGate, data_client::DataClient};
use crate::tenants::{registry::TenantRegistry, resolver::TenantResolver};
use crate::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use portal_core::error::AppError;
use portal_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, KeyedRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Install the Prometheus recorder once per process. Tests spawn several
/// applications and share the recorder.
fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("Prometheus recorder can be installed")
        })
        .clone()
}

/// Stretch the configured secret into the 64 bytes of key material the
/// cookie signer wants.
fn session_signing_key(secret: &str) -> tower_sessions::cookie::Key {
    let first = Sha256::digest(secret.as_bytes());
    let second = Sha256::digest(first.as_slice());
    let mut material = [0u8; 64];
    material[..32].copy_from_slice(first.as_slice());
    material[32..].copy_from_slice(second.as_slice());
    tower_sessions::cookie::Key::from(&material)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Load the tenant registry, construct the remote API clients, and bind
    /// the listener (port 0 picks a free port for tests).
    pub async fn build(settings: Settings) -> Result<Self, AppError> {
        let registry = Arc::new(TenantRegistry::load(&settings.tenancy.tenants_dir)?);
        let resolver = Arc::new(TenantResolver::new(
            registry.clone(),
            settings.tenancy.default_tenant.clone(),
        ));
        let auth = Arc::new(AuthGate::new(AuthClient::new(&settings.auth_api)?));
        let data_api = Arc::new(DataClient::new(&settings.data_api)?);
        let policy = Arc::new(AccessPolicy::standard(&settings.security));

        let state = AppState {
            settings: Arc::new(settings),
            registry,
            resolver,
            auth,
            data_api,
            policy,
            login_limiter: Arc::new(KeyedRateLimiter::new()),
            metrics: metrics_handle(),
        };

        let address = format!(
            "{}:{}",
            state.settings.server.host, state.settings.server.port
        );
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// The port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(state.settings.session.cookie_name.clone())
        .with_secure(state.settings.session.secure_cookies)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(
            state.settings.session.max_age_seconds as i64,
        )))
        .with_signed(session_signing_key(
            state.settings.session.secret.expose_secret(),
        ));

    // Layers run top-down from the last one added: security headers and
    // rate limiting first, then tenant resolution, sessions, auth, and the
    // access policy right before the handlers.
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(crate::handlers::metrics::metrics))
        .route("/403", get(forbidden))
        .route("/login", get(login_page).post(login_handler))
        .route("/logout", get(logout_handler))
        .route("/register", get(register_page).post(register_handler))
        .route(
            "/forgot-password",
            get(forgot_password_page).post(forgot_password_handler),
        )
        .route(
            "/reset-password",
            get(reset_password_page).post(reset_password_handler),
        )
        .route("/dashboard", get(dashboard_handler))
        .route("/admin", get(admin_dashboard_handler))
        .route("/api/me", get(me_handler))
        .route("/api/stats", get(stats_handler))
        .route("/debug/tenants", get(tenant_list))
        .route("/debug/tenant", get(tenant_info))
        .layer(from_fn_with_state(state.clone(), access_policy_middleware))
        .layer(from_fn_with_state(state.clone(), auth_gate_middleware))
        .layer(from_fn_with_state(state.clone(), session_guard_middleware))
        .layer(session_layer)
        .layer(from_fn_with_state(state.clone(), tenant_context_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware));

    if state.settings.security.rate_limit_enabled {
        let limiter = create_ip_rate_limiter(state.settings.security.rate_limit_per_minute, 60);
        router = router.layer(from_fn_with_state(limiter, ip_rate_limit_middleware));
    }

    router
        .layer(from_fn(security_headers_middleware))
        .with_state(state)
}
