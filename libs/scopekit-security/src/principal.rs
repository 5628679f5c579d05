use std::collections::BTreeSet;

use crate::capabilities::Capability;
use crate::role::Role;

/// The authenticated actor of one request.
///
/// Reconstructed per request from session state and immutable afterwards.
/// `tenant_id` is optional only so that a `super_admin` without a home company
/// is representable; restricted scope classes treat a missing tenant or
/// department as a resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    id: String,
    role: Role,
    tenant_id: Option<String>,
    department_id: Option<String>,
    #[serde(default)]
    extra_scopes: BTreeSet<Capability>,
}

impl Principal {
    #[must_use]
    pub fn builder() -> PrincipalBuilder {
        PrincipalBuilder::default()
    }

    /// Subject identifier (user id).
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Company (tenant) the principal belongs to.
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn department_id(&self) -> Option<&str> {
        self.department_id.as_deref()
    }

    /// Capabilities granted to this principal on top of its role.
    #[inline]
    #[must_use]
    pub fn extra_scopes(&self) -> &BTreeSet<Capability> {
        &self.extra_scopes
    }
}

#[derive(Default)]
pub struct PrincipalBuilder {
    id: Option<String>,
    role: Option<Role>,
    tenant_id: Option<String>,
    department_id: Option<String>,
    extra_scopes: BTreeSet<Capability>,
}

impl PrincipalBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    #[must_use]
    pub fn department_id(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    #[must_use]
    pub fn extra_scope(mut self, capability: impl Into<Capability>) -> Self {
        self.extra_scopes.insert(capability.into());
        self
    }

    /// Build the principal. A missing role becomes an unrecognized (empty)
    /// role, which fails closed everywhere.
    #[must_use]
    pub fn build(self) -> Principal {
        Principal {
            id: self.id.unwrap_or_default(),
            role: self
                .role
                .unwrap_or_else(|| Role::Unrecognized(String::new())),
            tenant_id: self.tenant_id,
            department_id: self.department_id,
            extra_scopes: self.extra_scopes,
        }
    }
}
