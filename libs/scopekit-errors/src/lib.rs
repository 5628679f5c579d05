#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Error boundary of the scopekit crates.
//!
//! Internal errors stay typed and detailed for logs. What reaches an end user
//! is a [`Problem`] rendered from a fixed [`ErrDef`] in [`catalog`].

pub mod catalog;
pub mod problem;

pub use catalog::ErrDef;
pub use problem::Problem;
