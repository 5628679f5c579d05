//! Error types for the scope enforcer.

use scopekit_errors::Problem;
use scopekit_errors::catalog::{FORBIDDEN, INVALID_FILTER};
use scopekit_security::{Capability, FilterParseError, ScopeClass};
use thiserror::Error;

/// A resource type cannot be scoped for a principal.
///
/// Always a hard deny: the caller must never fall back to an unscoped query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScopeResolutionError {
    /// The resource type declares no ownership fields, so only unrestricted
    /// principals can reach it.
    #[error("resource type '{resource}' declares no ownership fields for {scope_class} scope")]
    NoOwnershipFields {
        resource: &'static str,
        scope_class: ScopeClass,
    },

    #[error("resource type '{resource}' declares no tenant field for {scope_class} scope")]
    NoTenantField {
        resource: &'static str,
        scope_class: ScopeClass,
    },

    #[error("resource type '{resource}' declares no department field for department scope")]
    NoDepartmentField { resource: &'static str },

    #[error("resource type '{resource}' declares no identity field for individual scope")]
    NoIdentityField { resource: &'static str },

    #[error("principal has no tenant for {scope_class} scope")]
    PrincipalWithoutTenant { scope_class: ScopeClass },

    #[error("principal has no department for department scope")]
    PrincipalWithoutDepartment,

    #[error("principal has no subject id for individual scope")]
    PrincipalWithoutId,
}

/// Failure of the enforcement pipeline.
///
/// The `Display` output is for logs only. Anything returned to an end user
/// must go through [`EnforcerError::to_problem`].
#[derive(Debug, Error)]
pub enum EnforcerError {
    /// The principal lacks a capability the action requires.
    #[error("capability '{capability}' denied")]
    CapabilityDenied { capability: Capability },

    /// The scope predicate could not be resolved.
    #[error("scope resolution failed: {0}")]
    Resolution(#[from] ScopeResolutionError),

    /// The caller's filter could not be parsed.
    #[error("invalid caller filter: {0}")]
    InvalidFilter(#[from] FilterParseError),
}

impl EnforcerError {
    /// Caller-facing problem. Every denial maps to the same generic 403.
    pub fn to_problem(&self) -> Problem {
        match self {
            EnforcerError::CapabilityDenied { .. } | EnforcerError::Resolution(_) => {
                FORBIDDEN.to_problem()
            }
            EnforcerError::InvalidFilter(_) => INVALID_FILTER.to_problem(),
        }
    }
}
