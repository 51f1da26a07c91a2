pub mod config;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod services;
pub mod session;
pub mod startup;
pub mod tenants;
pub mod utils;

use config::Settings;
use metrics_exporter_prometheus::PrometheusHandle;
use policy::AccessPolicy;
use portal_core::middleware::rate_limit::KeyedRateLimiter;
use services::{auth_gate::AuthGate, data_client::DataClient};
use std::sync::Arc;
use tenants::{registry::TenantRegistry, resolver::TenantResolver};

/// Shared application state handed to handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<TenantRegistry>,
    pub resolver: Arc<TenantResolver>,
    pub auth: Arc<AuthGate>,
    pub data_api: Arc<DataClient>,
    pub policy: Arc<AccessPolicy>,
    pub login_limiter: Arc<KeyedRateLimiter>,
    pub metrics: PrometheusHandle,
}
