//! Capability gate, orthogonal to record ownership.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use scopekit_security::{Capability, Principal, RoleHierarchy, RoleTable};

use crate::error::EnforcerError;

/// Per-tenant feature switches, owned by an external configuration source.
///
/// Flags can only take capabilities away.
pub trait FeatureFlags: Send + Sync {
    /// Returns false if `capability` is switched off for the tenant.
    fn is_enabled(&self, tenant_id: Option<&str>, capability: &str) -> bool;
}

/// Every capability enabled for every tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllFeaturesEnabled;

impl FeatureFlags for AllFeaturesEnabled {
    fn is_enabled(&self, _tenant_id: Option<&str>, _capability: &str) -> bool {
        true
    }
}

/// Fixed table of disabled capabilities per tenant.
///
/// ```yaml
/// company_2: [benchmark:read, export_reports]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StaticFeatureFlags {
    disabled: BTreeMap<String, BTreeSet<String>>,
}

impl StaticFeatureFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn disable(mut self, tenant_id: impl Into<String>, capability: impl Into<String>) -> Self {
        self.disabled
            .entry(tenant_id.into())
            .or_default()
            .insert(capability.into());
        self
    }
}

impl FeatureFlags for StaticFeatureFlags {
    fn is_enabled(&self, tenant_id: Option<&str>, capability: &str) -> bool {
        tenant_id
            .and_then(|t| self.disabled.get(t))
            .is_none_or(|caps| !caps.contains(capability))
    }
}

/// Answers `has_capability(principal, capability)`.
#[derive(Clone)]
pub struct PermissionGate {
    roles: Arc<RoleTable>,
    flags: Arc<dyn FeatureFlags>,
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

impl PermissionGate {
    #[must_use]
    pub fn new(roles: Arc<RoleTable>) -> Self {
        Self {
            roles,
            flags: Arc::new(AllFeaturesEnabled),
        }
    }

    #[must_use]
    pub fn with_feature_flags(mut self, flags: Arc<dyn FeatureFlags>) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn has_capability(&self, principal: &Principal, capability: &str) -> bool {
        let hierarchy = self.roles.snapshot();
        self.has_capability_in(&hierarchy, principal, capability)
    }

    /// Capability check against an explicit hierarchy snapshot.
    ///
    /// Role capabilities plus the principal's extra scopes, minus anything
    /// the tenant's feature flags switch off. An unrecognized role holds
    /// nothing, extra scopes included.
    #[must_use]
    pub fn has_capability_in(
        &self,
        hierarchy: &RoleHierarchy,
        principal: &Principal,
        capability: &str,
    ) -> bool {
        let role = principal.role();
        if !role.is_recognized() {
            return false;
        }
        let granted = hierarchy.role_grants(role, capability)
            || principal.extra_scopes().contains(capability);
        granted && self.flags.is_enabled(principal.tenant_id(), capability)
    }

    /// # Errors
    /// Returns [`EnforcerError::CapabilityDenied`] if the capability is not held.
    pub fn require(&self, principal: &Principal, capability: &str) -> Result<(), EnforcerError> {
        let hierarchy = self.roles.snapshot();
        self.require_in(&hierarchy, principal, capability)
    }

    pub(crate) fn require_in(
        &self,
        hierarchy: &RoleHierarchy,
        principal: &Principal,
        capability: &str,
    ) -> Result<(), EnforcerError> {
        if self.has_capability_in(hierarchy, principal, capability) {
            Ok(())
        } else {
            Err(EnforcerError::CapabilityDenied {
                capability: Capability::from(capability),
            })
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use scopekit_security::Role;
    use scopekit_security::capabilities::names;

    fn principal(role: Role) -> Principal {
        Principal::builder()
            .id("user_1")
            .role(role)
            .tenant_id("company_1")
            .department_id("dept_1")
            .build()
    }

    fn gate() -> PermissionGate {
        PermissionGate::new(Arc::new(RoleTable::builtin()))
    }

    #[test]
    fn leader_reads_but_cannot_create_benchmarks() {
        let g = gate();
        let leader = principal(Role::Leader);
        assert!(g.has_capability(&leader, names::BENCHMARK_READ));
        assert!(!g.has_capability(&leader, names::BENCHMARK_CREATE));
    }

    #[test]
    fn equal_rank_roles_hold_disjoint_capabilities() {
        let g = gate();
        let leader = principal(Role::Leader);
        let dept_admin = principal(Role::DepartmentAdmin);
        assert!(!g.has_capability(&leader, names::EXPORT_REPORTS));
        assert!(g.has_capability(&dept_admin, names::EXPORT_REPORTS));
        assert!(!g.has_capability(&dept_admin, names::BENCHMARK_READ));
    }

    #[test]
    fn unrecognized_role_holds_nothing() {
        let g = gate();
        let p = Principal::builder()
            .id("user_1")
            .role(Role::parse("auditor"))
            .tenant_id("company_1")
            .extra_scope(names::VIEW_DASHBOARD)
            .build();
        for cap in [names::VIEW_DASHBOARD, names::RESPOND_SURVEYS, names::GLOBAL_SETTINGS] {
            assert!(!g.has_capability(&p, cap));
        }
    }

    #[test]
    fn extra_scopes_add_capabilities() {
        let g = gate();
        let p = Principal::builder()
            .id("user_1")
            .role(Role::Employee)
            .tenant_id("company_1")
            .extra_scope(names::VIEW_DASHBOARD)
            .build();
        assert!(g.has_capability(&p, names::VIEW_DASHBOARD));
        assert!(!g.has_capability(&p, names::EXPORT_REPORTS));
    }

    #[test]
    fn feature_flags_only_narrow() {
        let flags = StaticFeatureFlags::new().disable("company_1", names::BENCHMARK_READ);
        let g = gate().with_feature_flags(Arc::new(flags));

        let leader = principal(Role::Leader);
        assert!(!g.has_capability(&leader, names::BENCHMARK_READ));
        assert!(!g.has_capability(&leader, names::BENCHMARK_CREATE));

        let other_tenant = Principal::builder()
            .id("user_9")
            .role(Role::Leader)
            .tenant_id("company_2")
            .department_id("dept_1")
            .build();
        assert!(g.has_capability(&other_tenant, names::BENCHMARK_READ));
    }

    #[test]
    fn static_flags_deserialize_from_tenant_map() {
        let flags: StaticFeatureFlags =
            serde_json::from_value(serde_json::json!({"company_2": ["export_reports"]})).unwrap();
        assert!(!flags.is_enabled(Some("company_2"), "export_reports"));
        assert!(flags.is_enabled(Some("company_1"), "export_reports"));
        assert!(flags.is_enabled(None, "export_reports"));
    }

    #[test]
    fn require_reports_denied_capability() {
        let err = gate()
            .require(&principal(Role::Employee), names::MANAGE_QUESTIONS)
            .unwrap_err();
        assert!(matches!(
            err,
            EnforcerError::CapabilityDenied { ref capability } if capability.as_str() == names::MANAGE_QUESTIONS
        ));
    }
}
