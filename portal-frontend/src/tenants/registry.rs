use super::record::{Branding, FeatureFlags, TenantPolicy, TenantRecord};
use portal_core::error::AppError;
use std::{collections::HashMap, fs, path::Path, sync::Arc};

/// Id of the tenant every request can fall back to.
pub const DEFAULT_TENANT_ID: &str = "default";

/// In-memory catalog of tenant definitions, loaded once at startup.
pub struct TenantRegistry {
    records: HashMap<String, Arc<TenantRecord>>,
    fallback: Arc<TenantRecord>,
}

impl TenantRegistry {
    /// Load every `*.json` definition from `dir`. A missing or empty
    /// directory is seeded with the bundled demo tenants first. Definitions
    /// that fail to parse are skipped with a warning so one bad file cannot
    /// take the portal down.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        let has_definitions = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.path().extension().map_or(false, |ext| ext == "json"));
        if !has_definitions {
            tracing::info!(dir = %dir.display(), "No tenant definitions found, writing seed tenants");
            write_seed_definitions(dir)?;
        }

        let mut records: HashMap<String, Arc<TenantRecord>> = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match load_record(&path) {
                Ok(record) => {
                    tracing::debug!(tenant_id = %record.tenant_id, "Loaded tenant definition");
                    records.insert(record.tenant_id.clone(), Arc::new(record));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Skipping invalid tenant definition: {}",
                        e
                    );
                }
            }
        }

        // Resolution must always land somewhere, so the default record exists
        // even when its file was deleted or corrupt.
        let fallback = records
            .get(DEFAULT_TENANT_ID)
            .cloned()
            .unwrap_or_else(|| Arc::new(seed_default()));
        records
            .entry(DEFAULT_TENANT_ID.to_string())
            .or_insert_with(|| fallback.clone());

        tracing::info!(count = records.len(), "Tenant registry loaded");
        Ok(Self { records, fallback })
    }

    pub fn exists(&self, tenant_id: &str) -> bool {
        self.records.contains_key(tenant_id)
    }

    pub fn find(&self, tenant_id: &str) -> Option<Arc<TenantRecord>> {
        self.records.get(tenant_id).cloned()
    }

    /// Record for `tenant_id`, or the default record when unknown.
    pub fn get(&self, tenant_id: &str) -> Arc<TenantRecord> {
        self.records
            .get(tenant_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<TenantRecord>> {
        self.records.values()
    }

    pub fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn load_record(path: &Path) -> anyhow::Result<TenantRecord> {
    let raw = fs::read_to_string(path)?;
    let mut record: TenantRecord = serde_json::from_str(&raw)?;
    // The file stem is authoritative over any id in the body.
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        record.tenant_id = stem.to_string();
    }
    if record.tenant_id.is_empty() {
        anyhow::bail!("tenant definition has no usable id");
    }
    Ok(record)
}

fn write_seed_definitions(dir: &Path) -> Result<(), AppError> {
    for record in [
        seed_default(),
        seed_coosalud(),
        seed_biomed(),
        seed_medicorp(),
    ] {
        let path = dir.join(format!("{}.json", record.tenant_id));
        let body = serde_json::to_string_pretty(&record)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        fs::write(&path, body)?;
    }
    Ok(())
}

fn seed_default() -> TenantRecord {
    TenantRecord {
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        company_name: "Portal".to_string(),
        domains: Vec::new(),
        subdomain_aliases: vec!["demo".to_string(), "test".to_string()],
        branding: Branding {
            welcome_message: "Welcome to the portal".to_string(),
            ..Branding::default()
        },
        features: FeatureFlags::default(),
        policy: TenantPolicy::default(),
    }
}

fn seed_coosalud() -> TenantRecord {
    TenantRecord {
        tenant_id: "coosalud".to_string(),
        company_name: "Coosalud EPS".to_string(),
        domains: vec![
            "coosalud.com".to_string(),
            "www.coosalud.com".to_string(),
            "portal-coosalud.com".to_string(),
        ],
        subdomain_aliases: Vec::new(),
        branding: Branding {
            app_name: "Portal Coosalud".to_string(),
            primary_color: "#00843d".to_string(),
            welcome_message: "Bienvenido al portal de Coosalud".to_string(),
            support_email: "soporte@coosalud.com".to_string(),
            ..Branding::default()
        },
        features: FeatureFlags::default(),
        policy: TenantPolicy::default(),
    }
}

fn seed_biomed() -> TenantRecord {
    TenantRecord {
        tenant_id: "biomed".to_string(),
        company_name: "Biomed Laboratorios".to_string(),
        domains: vec!["biomed.com".to_string(), "portal-biomed.com".to_string()],
        subdomain_aliases: Vec::new(),
        branding: Branding {
            app_name: "Biomed Portal".to_string(),
            primary_color: "#1565c0".to_string(),
            support_email: "soporte@biomed.com".to_string(),
            ..Branding::default()
        },
        features: FeatureFlags {
            two_factor: true,
            ..FeatureFlags::default()
        },
        policy: TenantPolicy::default(),
    }
}

fn seed_medicorp() -> TenantRecord {
    TenantRecord {
        tenant_id: "medicorp".to_string(),
        company_name: "Medicorp Salud".to_string(),
        domains: vec!["medicorp.com".to_string()],
        subdomain_aliases: Vec::new(),
        branding: Branding {
            app_name: "Medicorp".to_string(),
            primary_color: "#7b1fa2".to_string(),
            support_email: "soporte@medicorp.com".to_string(),
            ..Branding::default()
        },
        features: FeatureFlags {
            registration: false,
            two_factor: true,
            ..FeatureFlags::default()
        },
        policy: TenantPolicy::default(),
    }
}
