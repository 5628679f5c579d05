#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Scope Test Harness
//!
//! Runs synthetic principals against synthetic records through the scope
//! enforcer and compares what they can reach with an independently computed
//! expectation. Also audits a record store for ownership fields without a
//! supporting index.
//!
//! - [`ScopeHarness::run_comprehensive_test`] - role x resource matrix
//! - [`ScopeHarness::validate_database_scoping`] - index audit
//!
//! Findings are aggregated into reports, never raised as errors.

pub mod audit;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod memory;
pub mod oracle;
pub mod report;
pub mod runner;
pub mod store;

pub use audit::{DatabaseScopingReport, InconclusiveProbe, IndexIssue, IndexIssueKind};
pub use config::{HarnessConfig, UniverseConfig};
pub use error::{HarnessError, StoreError};
pub use fixtures::{
    CallerFilter, OwnershipCell, OwnershipMatrixGenerator, PrincipalFixture, RecordGenerator,
    ScopeTestCase, Universe, standard_fixtures,
};
pub use memory::InMemoryRecordStore;
pub use report::{FindingSeverity, ScopeTestResult, ScopeTestSuite};
pub use runner::ScopeHarness;
pub use store::{IndexSpec, RecordStore};
