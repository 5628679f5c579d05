//! Policy enforcement point.
//!
//! Program order is the ordering guarantee: the gate completes before the
//! resolver runs, and the resolver completes before a query is produced.

pub mod enforcer;
pub mod gate;
pub mod resolver;
pub mod rewriter;

pub use enforcer::{AccessRequest, ScopeEnforcer};
pub use gate::{AllFeaturesEnabled, FeatureFlags, PermissionGate, StaticFeatureFlags};
pub use resolver::{ScopePredicate, ScopeResolver};
pub use rewriter::{EffectiveQuery, merge, merge_document};
