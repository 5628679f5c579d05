use serde::{Deserialize, Serialize};

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Maximum number of test cases in flight against the store.
    pub max_concurrency: usize,
    /// Timeout for each metadata probe during the index audit.
    pub probe_timeout_ms: u64,
    /// Shape of the synthetic ownership universe.
    pub universe: UniverseConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            probe_timeout_ms: 5_000,
            universe: UniverseConfig::default(),
        }
    }
}

/// Number of tenants, departments and users the generator spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UniverseConfig {
    pub tenants: usize,
    pub departments_per_tenant: usize,
    pub users_per_department: usize,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            tenants: 3,
            departments_per_tenant: 2,
            users_per_department: 2,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: HarnessConfig =
            serde_json::from_value(serde_json::json!({"universe": {"tenants": 4}})).unwrap();
        assert_eq!(cfg.universe.tenants, 4);
        assert_eq!(cfg.universe.departments_per_tenant, 2);
        assert_eq!(cfg.max_concurrency, 8);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let res: Result<HarnessConfig, _> =
            serde_json::from_value(serde_json::json!({"parallelism": 4}));
        assert!(res.is_err());
    }
}
