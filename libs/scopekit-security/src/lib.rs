#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! ScopeKit security model.
//!
//! Pure data types shared by the scope enforcer and the scope test harness:
//!
//! - [`Role`], [`ScopeClass`], [`RoleHierarchy`] - the role hierarchy model
//! - [`RoleTable`] - process-wide, atomically swappable role table handle
//! - [`Principal`] - the authenticated actor of one request
//! - [`ResourceType`], [`OwnershipField`] - static ownership declarations
//! - [`Predicate`] - the filter algebra scope predicates and caller queries share
//!
//! Nothing in this crate performs I/O.

pub mod capabilities;
pub mod catalog;
pub mod predicate;
pub mod principal;
pub mod resource;
pub mod role;
pub mod role_table;

pub use capabilities::Capability;
pub use predicate::{FilterParseError, Predicate};
pub use principal::{Principal, PrincipalBuilder};
pub use resource::{OwnershipField, OwnershipKind, ResourceType};
pub use role::{
    Role, RoleConfigError, RoleDefinition, RoleEntryConfig, RoleHierarchy, RoleTableConfig,
    ScopeClass,
};
pub use role_table::RoleTable;
