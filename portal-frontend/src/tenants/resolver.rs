use super::registry::{TenantRegistry, DEFAULT_TENANT_ID};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How a request's tenant was determined, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    QueryParam,
    Header,
    Subdomain,
    Domain,
    Default,
    Fallback,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::QueryParam => "query_param",
            Strategy::Header => "header",
            Strategy::Subdomain => "subdomain",
            Strategy::Domain => "domain",
            Strategy::Default => "default",
            Strategy::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The raw tenant hints carried by one request.
#[derive(Debug, Default)]
pub struct RequestSignals<'a> {
    pub query_tenant: Option<&'a str>,
    pub header_tenant: Option<&'a str>,
    pub host: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub tenant_id: String,
    pub strategy: Strategy,
}

/// Resolves a tenant id for each request from explicit hints (query, header)
/// and the host name, validating every candidate against the registry so an
/// unknown hint falls through to the next strategy instead of failing.
pub struct TenantResolver {
    registry: Arc<TenantRegistry>,
    exact_domains: HashMap<String, String>,
    /// Mapped domains ordered longest-first for the substring fallback.
    substring_domains: Vec<(String, String)>,
    subdomains: HashMap<String, String>,
    default_tenant: String,
}

impl TenantResolver {
    /// Build the host lookup tables from the registry's `domains` and
    /// `subdomain_aliases` fields. Local development hosts map to the
    /// configured default tenant.
    pub fn new(registry: Arc<TenantRegistry>, default_tenant: impl Into<String>) -> Self {
        let default_tenant = default_tenant.into();
        let mut exact_domains = HashMap::new();
        let mut substring_domains: Vec<(String, String)> = Vec::new();
        let mut subdomains = HashMap::new();

        for record in registry.records() {
            for domain in &record.domains {
                let domain = domain.to_ascii_lowercase();
                exact_domains.insert(domain.clone(), record.tenant_id.clone());
                substring_domains.push((domain, record.tenant_id.clone()));
            }
            for alias in &record.subdomain_aliases {
                subdomains.insert(alias.to_ascii_lowercase(), record.tenant_id.clone());
            }
            subdomains.insert(record.tenant_id.to_ascii_lowercase(), record.tenant_id.clone());
        }

        // Longest mapping first so the most specific domain wins a substring
        // match; the lexical tie-break keeps resolution deterministic.
        substring_domains
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        exact_domains
            .entry("localhost".to_string())
            .or_insert_with(|| default_tenant.clone());
        exact_domains
            .entry("127.0.0.1".to_string())
            .or_insert_with(|| default_tenant.clone());

        Self {
            registry,
            exact_domains,
            substring_domains,
            subdomains,
            default_tenant,
        }
    }

    /// First-match wins: query parameter, header, subdomain, full domain
    /// (exact, then substring), configured default. Ends at the registry's
    /// default tenant when even the configured default is unknown.
    pub fn resolve(&self, signals: &RequestSignals<'_>) -> Resolution {
        if let Some(id) = signals.query_tenant.and_then(|c| self.validate(c)) {
            return Resolution {
                tenant_id: id,
                strategy: Strategy::QueryParam,
            };
        }

        if let Some(id) = signals.header_tenant.and_then(|c| self.validate(c)) {
            return Resolution {
                tenant_id: id,
                strategy: Strategy::Header,
            };
        }

        if let Some(host) = signals.host {
            let host = normalize_host(host);

            if let Some(sub) = subdomain_of(&host) {
                if let Some(mapped) = self.subdomains.get(sub) {
                    if self.registry.exists(mapped) {
                        return Resolution {
                            tenant_id: mapped.clone(),
                            strategy: Strategy::Subdomain,
                        };
                    }
                }
            }

            if let Some(mapped) = self.exact_domains.get(host.as_str()) {
                if self.registry.exists(mapped) {
                    return Resolution {
                        tenant_id: mapped.clone(),
                        strategy: Strategy::Domain,
                    };
                }
            }

            // Hosts with extra labels (country suffixes, staging prefixes)
            // still match the mapped domain they contain.
            for (domain, mapped) in &self.substring_domains {
                if host.contains(domain.as_str()) && self.registry.exists(mapped) {
                    return Resolution {
                        tenant_id: mapped.clone(),
                        strategy: Strategy::Domain,
                    };
                }
            }
        }

        if self.registry.exists(&self.default_tenant) {
            return Resolution {
                tenant_id: self.default_tenant.clone(),
                strategy: Strategy::Default,
            };
        }

        Resolution {
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            strategy: Strategy::Fallback,
        }
    }

    fn validate(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim().to_ascii_lowercase();
        if candidate.is_empty() || !self.registry.exists(&candidate) {
            return None;
        }
        Some(candidate)
    }
}

/// Lowercase the host and strip any `:port` suffix.
fn normalize_host(host: &str) -> String {
    host.split(':').next().unwrap_or(host).to_ascii_lowercase()
}

/// Leftmost label, only when the host has enough labels to actually carry a
/// subdomain (`tenant.portal.example` yes, `portal.example` no).
fn subdomain_of(host: &str) -> Option<&str> {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        Some(labels[0])
    } else {
        None
    }
}
