#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Scope Enforcer
//!
//! Decides, for an authenticated [`Principal`](scopekit_security::Principal)
//! and a resource type, which records the principal may see or mutate:
//!
//! - [`PermissionGate`] - capability check, independent of record ownership
//! - [`ScopeResolver`] - principal + descriptor -> [`ScopePredicate`]
//! - [`merge`] - caller filter + scope predicate -> [`EffectiveQuery`]
//! - [`ScopeEnforcer`] - the request pipeline: gate, resolve, merge
//!
//! Nothing here performs I/O; the effective query is executed by the
//! resource-specific record store collaborator.
//!
//! ```
//! use std::sync::Arc;
//! use scope_enforcer::{AccessRequest, ScopeEnforcer};
//! use scopekit_security::{Predicate, Principal, Role, RoleTable, catalog};
//!
//! let enforcer = ScopeEnforcer::new(Arc::new(RoleTable::builtin()));
//! let principal = Principal::builder()
//!     .id("user_3")
//!     .role(Role::DepartmentAdmin)
//!     .tenant_id("company_1")
//!     .department_id("dept_1")
//!     .build();
//!
//! let query = enforcer
//!     .scoped_query(
//!         &principal,
//!         &catalog::ACTION_PLANS,
//!         &AccessRequest::new().filter(Predicate::eq("status", "active")),
//!     )
//!     .unwrap();
//! assert!(query.filter().referenced_fields().contains("company_id"));
//! ```

pub mod error;
pub mod pep;

pub use error::{EnforcerError, ScopeResolutionError};
pub use pep::{
    AccessRequest, AllFeaturesEnabled, EffectiveQuery, FeatureFlags, PermissionGate,
    ScopeEnforcer, ScopePredicate, ScopeResolver, StaticFeatureFlags, merge, merge_document,
};
