use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub session: SessionSettings,
    pub auth_api: RemoteApiSettings,
    pub data_api: RemoteApiSettings,
    #[serde(default)]
    pub tenancy: TenancySettings,
    #[serde(default)]
    pub security: SecuritySettings,
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Debug mode exposes the tenant inspection endpoints and echoes
    /// resolution headers on every response.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Deserialize, Clone)]
pub struct SessionSettings {
    pub secret: Secret<String>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Inactivity window for tenants that do not override it.
    #[serde(default = "default_session_max_age")]
    pub max_age_seconds: u64,
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_cookie_name() -> String {
    "portal_session".to_string()
}

fn default_session_max_age() -> u64 {
    86400
}

#[derive(Deserialize, Clone)]
pub struct RemoteApiSettings {
    pub base_url: String,
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_timeout() -> u64 {
    30
}

#[derive(Deserialize, Clone)]
pub struct TenancySettings {
    /// Directory of per-tenant JSON definitions, one file per tenant.
    #[serde(default = "default_tenants_dir")]
    pub tenants_dir: PathBuf,
    /// Tenant served for localhost and unmatched hosts.
    #[serde(default = "default_tenant_id")]
    pub default_tenant: String,
}

impl Default for TenancySettings {
    fn default() -> Self {
        Self {
            tenants_dir: default_tenants_dir(),
            default_tenant: default_tenant_id(),
        }
    }
}

fn default_tenants_dir() -> PathBuf {
    PathBuf::from("config/tenants")
}

fn default_tenant_id() -> String {
    "default".to_string()
}

#[derive(Deserialize, Clone)]
pub struct SecuritySettings {
    /// Roles that satisfy any role requirement on a route.
    #[serde(default = "default_admin_roles")]
    pub admin_roles: Vec<String>,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "default_rate_limit_enabled")]
    pub rate_limit_enabled: bool,
    /// Additional public paths; a trailing `*` makes the entry a prefix.
    #[serde(default)]
    pub extra_public_paths: Vec<String>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            admin_roles: default_admin_roles(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            rate_limit_enabled: default_rate_limit_enabled(),
            extra_public_paths: Vec::new(),
        }
    }
}

fn default_admin_roles() -> Vec<String> {
    vec!["admin".to_string(), "superuser".to_string()]
}

fn default_rate_limit_per_minute() -> u32 {
    300
}

fn default_rate_limit_enabled() -> bool {
    true
}

#[derive(Deserialize, Clone)]
pub struct ObservabilitySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");

    // Check if we're already in portal-frontend directory or need to navigate to it
    let configuration_directory = if base_path.ends_with("portal-frontend") {
        base_path.join("config")
    } else {
        base_path.join("portal-frontend").join("config")
    };

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
