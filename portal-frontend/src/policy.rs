use crate::config::SecuritySettings;
use crate::tenants::record::{Feature, TenantRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn exact(path: impl Into<String>) -> Self {
        PathPattern::Exact(path.into())
    }

    pub fn prefix(path: impl Into<String>) -> Self {
        PathPattern::Prefix(path.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// Who a route is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Anyone, signed in or not.
    Anyone,
    /// Only signed-out visitors; signed-in users are sent home.
    GuestOnly,
    /// Only signed-in users.
    Authenticated,
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: PathPattern,
    pub audience: Audience,
    pub required_roles: Vec<String>,
    pub required_feature: Option<Feature>,
}

impl RouteRule {
    pub fn new(pattern: PathPattern, audience: Audience) -> Self {
        Self {
            pattern,
            audience,
            required_roles: Vec::new(),
            required_feature: None,
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.required_roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.required_feature = Some(feature);
        self
    }
}

/// The policy's verdict for one request. How each verdict is rendered (JSON
/// status vs redirect) is the pipeline's business, not the policy's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectLogin,
    RedirectHome,
    Forbidden,
    /// Feature-gated routes deny by pretending not to exist.
    NotFound,
}

/// Request facts the policy decides on.
pub struct PolicyInput<'a> {
    pub authenticated: bool,
    pub roles: &'a [String],
    pub record: &'a TenantRecord,
}

/// Declarative route access table: an unconditional public set plus ordered
/// rules carrying audience, role, and feature requirements.
pub struct AccessPolicy {
    public: Vec<PathPattern>,
    rules: Vec<RouteRule>,
    admin_roles: Vec<String>,
}

impl AccessPolicy {
    pub fn new(public: Vec<PathPattern>, rules: Vec<RouteRule>, admin_roles: Vec<String>) -> Self {
        Self {
            public,
            rules,
            admin_roles,
        }
    }

    /// The portal's route table. Only genuinely unconditional paths live in
    /// the public set; the login and self-service pages are guest-only rules
    /// so their feature gates and signed-in redirects still apply.
    pub fn standard(settings: &SecuritySettings) -> Self {
        let mut public = vec![
            PathPattern::exact("/health"),
            PathPattern::exact("/metrics"),
            PathPattern::exact("/favicon.ico"),
            PathPattern::exact("/403"),
            PathPattern::prefix("/static/"),
            PathPattern::prefix("/debug/"),
        ];
        for entry in &settings.extra_public_paths {
            match entry.strip_suffix('*') {
                Some(prefix) => public.push(PathPattern::prefix(prefix)),
                None => public.push(PathPattern::exact(entry)),
            }
        }

        let rules = vec![
            RouteRule::new(PathPattern::exact("/"), Audience::Anyone),
            RouteRule::new(PathPattern::exact("/login"), Audience::GuestOnly),
            RouteRule::new(PathPattern::exact("/logout"), Audience::Anyone),
            RouteRule::new(PathPattern::exact("/register"), Audience::GuestOnly)
                .with_feature(Feature::Registration),
            RouteRule::new(PathPattern::exact("/forgot-password"), Audience::GuestOnly)
                .with_feature(Feature::PasswordReset),
            RouteRule::new(PathPattern::exact("/reset-password"), Audience::GuestOnly)
                .with_feature(Feature::PasswordReset),
            RouteRule::new(PathPattern::exact("/dashboard"), Audience::Authenticated),
            RouteRule::new(PathPattern::exact("/admin"), Audience::Authenticated)
                .with_roles(&["admin"]),
            RouteRule::new(PathPattern::prefix("/admin/"), Audience::Authenticated)
                .with_roles(&["admin"]),
            RouteRule::new(PathPattern::exact("/api/me"), Audience::Authenticated),
            RouteRule::new(PathPattern::exact("/api/stats"), Audience::Authenticated),
        ];

        Self::new(public, rules, settings.admin_roles.clone())
    }

    pub fn check(&self, path: &str, input: &PolicyInput<'_>) -> Decision {
        // The public set bypasses every other check.
        if self.public.iter().any(|pattern| pattern.matches(path)) {
            return Decision::Allow;
        }

        let Some(rule) = self.rules.iter().find(|rule| rule.pattern.matches(path)) else {
            // Everything without an explicit rule requires a login.
            return if input.authenticated {
                Decision::Allow
            } else {
                Decision::RedirectLogin
            };
        };

        // Feature gates hide the route outright, admins included.
        if let Some(feature) = rule.required_feature {
            if !input.record.feature_enabled(feature) {
                return Decision::NotFound;
            }
        }

        match rule.audience {
            Audience::Anyone => Decision::Allow,
            Audience::GuestOnly => {
                if input.authenticated {
                    Decision::RedirectHome
                } else {
                    Decision::Allow
                }
            }
            Audience::Authenticated => {
                if !input.authenticated {
                    return Decision::RedirectLogin;
                }
                if rule.required_roles.is_empty() {
                    return Decision::Allow;
                }
                let is_admin = input
                    .roles
                    .iter()
                    .any(|role| self.admin_roles.contains(role));
                let has_required = rule
                    .required_roles
                    .iter()
                    .any(|required| input.roles.contains(required));
                if is_admin || has_required {
                    Decision::Allow
                } else {
                    Decision::Forbidden
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenants::record::FeatureFlags;

    fn tenant(registration: bool) -> TenantRecord {
        let mut record: TenantRecord =
            serde_json::from_str(r#"{ "company_name": "Acme" }"#).unwrap();
        record.tenant_id = "acme".to_string();
        record.features = FeatureFlags {
            registration,
            ..FeatureFlags::default()
        };
        record
    }

    fn policy() -> AccessPolicy {
        AccessPolicy::standard(&SecuritySettings::default())
    }

    fn anonymous(record: &TenantRecord) -> PolicyInput<'_> {
        PolicyInput {
            authenticated: false,
            roles: &[],
            record,
        }
    }

    #[test]
    fn public_paths_allow_anonymous() {
        let record = tenant(true);
        let policy = policy();

        assert_eq!(policy.check("/health", &anonymous(&record)), Decision::Allow);
        assert_eq!(
            policy.check("/static/app.css", &anonymous(&record)),
            Decision::Allow
        );
        assert_eq!(
            policy.check("/debug/tenant", &anonymous(&record)),
            Decision::Allow
        );
    }

    #[test]
    fn root_rule_is_exact_match_only() {
        let record = tenant(true);
        let policy = policy();

        assert_eq!(policy.check("/", &anonymous(&record)), Decision::Allow);
        assert_eq!(
            policy.check("/dashboard", &anonymous(&record)),
            Decision::RedirectLogin
        );
    }

    #[test]
    fn guest_pages_redirect_signed_in_users_home() {
        let record = tenant(true);
        let roles = vec!["member".to_string()];
        let input = PolicyInput {
            authenticated: true,
            roles: &roles,
            record: &record,
        };

        assert_eq!(policy().check("/login", &input), Decision::RedirectHome);
        assert_eq!(policy().check("/register", &input), Decision::RedirectHome);
    }

    #[test]
    fn disabled_feature_is_not_found_even_for_admins() {
        let record = tenant(false);
        let roles = vec!["admin".to_string()];
        let input = PolicyInput {
            authenticated: true,
            roles: &roles,
            record: &record,
        };

        assert_eq!(policy().check("/register", &input), Decision::NotFound);
        assert_eq!(
            policy().check("/register", &anonymous(&record)),
            Decision::NotFound
        );
    }

    #[test]
    fn role_gated_route_forbids_plain_members() {
        let record = tenant(true);
        let roles = vec!["member".to_string()];
        let input = PolicyInput {
            authenticated: true,
            roles: &roles,
            record: &record,
        };

        assert_eq!(policy().check("/admin", &input), Decision::Forbidden);
        assert_eq!(policy().check("/admin/users", &input), Decision::Forbidden);
    }

    #[test]
    fn admin_roles_satisfy_any_role_requirement() {
        let record = tenant(true);
        let policy = AccessPolicy::new(
            Vec::new(),
            vec![
                RouteRule::new(PathPattern::exact("/reports"), Audience::Authenticated)
                    .with_roles(&["analyst"]),
            ],
            vec!["admin".to_string(), "superuser".to_string()],
        );

        let superuser = vec!["superuser".to_string()];
        let input = PolicyInput {
            authenticated: true,
            roles: &superuser,
            record: &record,
        };

        assert_eq!(policy.check("/reports", &input), Decision::Allow);
    }

    #[test]
    fn unmatched_paths_require_login() {
        let record = tenant(true);
        let roles = vec!["member".to_string()];

        assert_eq!(
            policy().check("/something/else", &anonymous(&record)),
            Decision::RedirectLogin
        );
        assert_eq!(
            policy().check(
                "/something/else",
                &PolicyInput {
                    authenticated: true,
                    roles: &roles,
                    record: &record,
                }
            ),
            Decision::Allow
        );
    }

    #[test]
    fn extra_public_paths_support_prefix_wildcards() {
        let settings = SecuritySettings {
            extra_public_paths: vec!["/kiosk".to_string(), "/assets/*".to_string()],
            ..SecuritySettings::default()
        };
        let policy = AccessPolicy::standard(&settings);
        let record = tenant(true);

        assert_eq!(policy.check("/kiosk", &anonymous(&record)), Decision::Allow);
        assert_eq!(
            policy.check("/kiosk/inner", &anonymous(&record)),
            Decision::RedirectLogin
        );
        assert_eq!(
            policy.check("/assets/logo.png", &anonymous(&record)),
            Decision::Allow
        );
    }
}
