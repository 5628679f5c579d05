//! Layered configuration: defaults -> YAML file -> `SCOPE_AUDIT__*` env.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use scope_enforcer::StaticFeatureFlags;
use scope_harness::{HarnessConfig, InMemoryRecordStore};
use scopekit_security::{RoleHierarchy, RoleTableConfig};
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "SCOPE_AUDIT__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeAuditConfig {
    pub harness: HarnessConfig,
    /// Role table; the built-in table when absent.
    pub roles: Option<RoleTableConfig>,
    /// Capabilities switched off per tenant.
    pub feature_flags: StaticFeatureFlags,
    /// Index layout per collection, each index an ordered key list.
    pub indexes: BTreeMap<String, Vec<Vec<String>>>,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Findings listed per section before the remainder is summarized.
    pub max_listed: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { max_listed: 10 }
    }
}

impl ScopeAuditConfig {
    /// Load defaults, then the YAML file if given, then the environment.
    ///
    /// # Errors
    /// Fails if the file is missing or any layer does not fit the schema.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid scope-audit configuration")
    }

    /// # Errors
    /// Fails if the configuration cannot be rendered.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("render configuration as YAML")
    }

    /// Role hierarchy from config, or the built-in one.
    ///
    /// # Errors
    /// Fails if the configured role table is inconsistent.
    pub fn role_hierarchy(&self) -> Result<RoleHierarchy> {
        match &self.roles {
            Some(table) => RoleHierarchy::from_config(table).context("invalid role table"),
            None => Ok(RoleHierarchy::builtin()),
        }
    }

    /// In-memory store carrying the configured index layout.
    #[must_use]
    pub fn index_layout_store(&self) -> InMemoryRecordStore {
        let store = InMemoryRecordStore::new();
        for (collection, indexes) in &self.indexes {
            for keys in indexes {
                let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
                store.create_index(collection, &keys);
            }
        }
        store
    }
}
