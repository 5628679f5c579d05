//! RFC 9457 problem documents.

use serde::{Deserialize, Serialize};

/// Caller-facing problem document.
///
/// Built only from a catalog [`ErrDef`](crate::ErrDef), so its text is fixed
/// per error kind. Predicate structure, tenant ids and role names never
/// appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Stable machine-readable code, e.g. `FORBIDDEN`.
    pub code: String,
}
