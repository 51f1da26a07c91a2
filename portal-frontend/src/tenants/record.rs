use serde::{Deserialize, Serialize};

/// Feature switches a tenant can turn on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Registration,
    PasswordReset,
    RememberMe,
    TwoFactor,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Registration => "registration",
            Feature::PasswordReset => "password_reset",
            Feature::RememberMe => "remember_me",
            Feature::TwoFactor => "two_factor",
        }
    }
}

/// One tenant definition, loaded from a JSON file in the tenants directory.
/// The file stem is the authoritative tenant id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    #[serde(default)]
    pub tenant_id: String,
    pub company_name: String,
    /// Full host names that resolve to this tenant.
    #[serde(default)]
    pub domains: Vec<String>,
    /// Subdomain labels that resolve to this tenant, in addition to the
    /// tenant id itself.
    #[serde(default)]
    pub subdomain_aliases: Vec<String>,
    #[serde(default)]
    pub branding: Branding,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub policy: TenantPolicy,
}

impl TenantRecord {
    pub fn feature_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Registration => self.features.registration,
            Feature::PasswordReset => self.features.password_reset,
            Feature::RememberMe => self.features.remember_me,
            Feature::TwoFactor => self.features.two_factor,
        }
    }

    /// Name shown in page titles: the branded app name when set, otherwise
    /// the company name.
    pub fn display_name(&self) -> &str {
        if self.branding.app_name.is_empty() {
            &self.company_name
        } else {
            &self.branding.app_name
        }
    }
}

/// Presentation fields, passed through to rendered pages untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branding {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default = "default_primary_color")]
    pub primary_color: String,
    #[serde(default = "default_secondary_color")]
    pub secondary_color: String,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default)]
    pub footer_text: String,
    #[serde(default)]
    pub support_email: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            logo_url: String::new(),
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            welcome_message: String::new(),
            footer_text: String::new(),
            support_email: String::new(),
        }
    }
}

fn default_primary_color() -> String {
    "#005caa".to_string()
}

fn default_secondary_color() -> String {
    "#f4f6f8".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub registration: bool,
    #[serde(default = "default_true")]
    pub password_reset: bool,
    #[serde(default = "default_true")]
    pub remember_me: bool,
    #[serde(default)]
    pub two_factor: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            registration: true,
            password_reset: true,
            remember_me: true,
            two_factor: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-tenant operational overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantPolicy {
    /// Inactivity window after which the session is dropped.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,
    /// Login attempts allowed per minute for this tenant.
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    /// Data API base url override; the global one applies when absent.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Data API timeout override in seconds.
    #[serde(default)]
    pub api_timeout_seconds: Option<u64>,
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self {
            session_timeout_seconds: default_session_timeout(),
            max_login_attempts: default_max_login_attempts(),
            api_base_url: None,
            api_timeout_seconds: None,
        }
    }
}

fn default_session_timeout() -> u64 {
    86400
}

fn default_max_login_attempts() -> u32 {
    5
}
