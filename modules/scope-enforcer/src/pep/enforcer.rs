//! Request-path enforcement: capability gate, scope resolution, merge.

use std::sync::Arc;

use scopekit_security::{Capability, Predicate, Principal, ResourceType, RoleHierarchy, RoleTable};
use serde_json::Value;

use super::gate::{FeatureFlags, PermissionGate};
use super::resolver::ScopeResolver;
use super::rewriter::{EffectiveQuery, merge};
use crate::error::EnforcerError;

/// What a handler asks the enforcer for: the capabilities the action
/// requires and the caller's own filter.
///
/// ```
/// use scope_enforcer::AccessRequest;
/// use scopekit_security::Predicate;
///
/// let request = AccessRequest::new()
///     .require("benchmark:read")
///     .filter(Predicate::eq("industry", "retail"));
/// assert_eq!(request.capabilities().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct AccessRequest {
    capabilities: Vec<Capability>,
    filter: Predicate,
}

impl Default for AccessRequest {
    fn default() -> Self {
        Self {
            capabilities: Vec::new(),
            filter: Predicate::match_all(),
        }
    }
}

impl AccessRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required capability. All of them must be held.
    pub fn require(mut self, capability: impl Into<Capability>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Set the caller's filter.
    pub fn filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    #[must_use]
    pub fn caller_filter(&self) -> &Predicate {
        &self.filter
    }
}

/// The enforcement pipeline handed to request handlers.
///
/// Constructed once at startup and shared. One role table snapshot is taken
/// per call, so a concurrent reload never mixes two tables in one decision.
#[derive(Debug, Clone)]
pub struct ScopeEnforcer {
    roles: Arc<RoleTable>,
    gate: PermissionGate,
}

impl ScopeEnforcer {
    #[must_use]
    pub fn new(roles: Arc<RoleTable>) -> Self {
        let gate = PermissionGate::new(Arc::clone(&roles));
        Self { roles, gate }
    }

    #[must_use]
    pub fn with_feature_flags(mut self, flags: Arc<dyn FeatureFlags>) -> Self {
        self.gate = self.gate.with_feature_flags(flags);
        self
    }

    #[must_use]
    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    #[must_use]
    pub fn resolver(&self) -> ScopeResolver {
        ScopeResolver::new(Arc::clone(&self.roles))
    }

    #[must_use]
    pub fn role_table(&self) -> &Arc<RoleTable> {
        &self.roles
    }

    /// Gate, resolve and merge for one data access.
    ///
    /// # Errors
    /// - [`EnforcerError::CapabilityDenied`] before any scope work is done
    /// - [`EnforcerError::Resolution`] if the resource cannot be scoped
    pub fn scoped_query(
        &self,
        principal: &Principal,
        resource: &ResourceType,
        request: &AccessRequest,
    ) -> Result<EffectiveQuery, EnforcerError> {
        self.scoped_query_with(&self.roles.snapshot(), principal, resource, request)
    }

    /// [`Self::scoped_query`] against a snapshot the caller already holds.
    ///
    /// # Errors
    /// As [`Self::scoped_query`].
    pub fn scoped_query_with(
        &self,
        hierarchy: &RoleHierarchy,
        principal: &Principal,
        resource: &ResourceType,
        request: &AccessRequest,
    ) -> Result<EffectiveQuery, EnforcerError> {
        self.authorize(hierarchy, principal, resource, request.capabilities())?;
        Self::scope(hierarchy, principal, resource, request.caller_filter().clone())
    }

    /// [`Self::scoped_query`] with the caller filter in document-store syntax.
    ///
    /// The capability check runs before the filter is even parsed.
    ///
    /// # Errors
    /// As [`Self::scoped_query`], plus [`EnforcerError::InvalidFilter`].
    pub fn scoped_document_query(
        &self,
        principal: &Principal,
        resource: &ResourceType,
        capabilities: &[Capability],
        caller: &Value,
    ) -> Result<EffectiveQuery, EnforcerError> {
        let hierarchy = self.roles.snapshot();
        self.authorize(&hierarchy, principal, resource, capabilities)?;
        let filter = Predicate::from_document(caller).inspect_err(|e| {
            tracing::debug!(resource = resource.name, error = %e, "caller filter rejected");
        })?;
        Self::scope(&hierarchy, principal, resource, filter)
    }

    fn authorize(
        &self,
        hierarchy: &RoleHierarchy,
        principal: &Principal,
        resource: &ResourceType,
        capabilities: &[Capability],
    ) -> Result<(), EnforcerError> {
        for capability in capabilities {
            self.gate
                .require_in(hierarchy, principal, capability.as_str())
                .inspect_err(|_| {
                    tracing::warn!(
                        principal = %principal.id(),
                        role = %principal.role(),
                        resource = resource.name,
                        capability = %capability,
                        "capability denied"
                    );
                })?;
        }
        Ok(())
    }

    fn scope(
        hierarchy: &RoleHierarchy,
        principal: &Principal,
        resource: &ResourceType,
        caller: Predicate,
    ) -> Result<EffectiveQuery, EnforcerError> {
        let scope = ScopeResolver::resolve_with(hierarchy, principal, resource).inspect_err(|e| {
            tracing::warn!(
                principal = %principal.id(),
                role = %principal.role(),
                resource = resource.name,
                error = %e,
                "scope resolution failed"
            );
        })?;
        let query = merge(caller, &scope);
        tracing::debug!(
            principal = %principal.id(),
            resource = resource.name,
            scope_class = %scope.scope_class(),
            "scoped query built"
        );
        Ok(query)
    }
}
