//! Capability names and the [`Capability`] newtype.

use std::fmt;

/// Well-known capability names used by the builtin role table.
///
/// Capabilities are opaque strings; these constants only exist so call sites
/// and the builtin table agree on spelling.
pub mod names {
    pub const GLOBAL_SETTINGS: &str = "GLOBAL_SETTINGS";
    pub const MANAGE_COMPANIES: &str = "manage_companies";
    pub const MANAGE_USERS: &str = "manage_users";
    pub const MANAGE_DEPARTMENTS: &str = "manage_departments";
    pub const MANAGE_QUESTIONS: &str = "manage_questions";
    pub const MANAGE_SURVEYS: &str = "manage_surveys";
    pub const RESPOND_SURVEYS: &str = "respond_surveys";
    pub const MANAGE_ACTION_PLANS: &str = "manage_action_plans";
    pub const VIEW_ACTION_PLANS: &str = "view_action_plans";
    pub const EXPORT_REPORTS: &str = "export_reports";
    pub const VIEW_DASHBOARD: &str = "view_dashboard";
    pub const BENCHMARK_READ: &str = "benchmark:read";
    pub const BENCHMARK_CREATE: &str = "benchmark:create";
    pub const BENCHMARK_UPDATE: &str = "benchmark:update";
    pub const BENCHMARK_DELETE: &str = "benchmark:delete";
}

/// A named, role-gated permission to perform an action, independent of any record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `name` is usable as a capability name:
    /// non-empty, ASCII alphanumerics plus `_`, `:`, `.` and `-`.
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
    }
}

impl From<&str> for Capability {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for Capability {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn capability_names_are_validated() {
        assert!(Capability::is_valid_name(names::BENCHMARK_READ));
        assert!(Capability::is_valid_name(names::GLOBAL_SETTINGS));
        assert!(!Capability::is_valid_name(""));
        assert!(!Capability::is_valid_name("manage questions"));
        assert!(!Capability::is_valid_name("export/*"));
    }

    #[test]
    fn capability_serializes_as_plain_string() {
        let cap = Capability::from(names::MANAGE_QUESTIONS);
        let json = serde_json::to_string(&cap).unwrap();
        assert_eq!(json, r#""manage_questions""#);
    }
}
