//! Caller filter + scope predicate -> effective query.

use scopekit_security::{FilterParseError, Predicate};
use serde_json::Value;

use super::resolver::ScopePredicate;

/// The filter handed to the record store.
///
/// Only [`merge`] builds one, so every effective query carries its scope
/// predicate's constraints.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EffectiveQuery {
    filter: Predicate,
}

impl EffectiveQuery {
    #[must_use]
    pub fn filter(&self) -> &Predicate {
        &self.filter
    }

    #[must_use]
    pub fn into_filter(self) -> Predicate {
        self.filter
    }

    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        self.filter.matches(doc)
    }

    /// Render for a document store.
    #[must_use]
    pub fn to_document(&self) -> Value {
        self.filter.to_document()
    }
}

/// Intersect the caller's filter with the scope predicate.
///
/// The result matches a subset of what `scope` alone matches. For an
/// unrestricted scope it is the caller's filter unchanged.
#[must_use]
pub fn merge(caller: Predicate, scope: &ScopePredicate) -> EffectiveQuery {
    if scope.is_unrestricted() {
        return EffectiveQuery { filter: caller };
    }
    EffectiveQuery {
        filter: scope.predicate().clone().and(caller),
    }
}

/// [`merge`] for a caller filter given in document-store syntax.
///
/// # Errors
/// Returns [`FilterParseError`] if the caller document uses an unsupported
/// shape or operator.
pub fn merge_document(
    caller: &Value,
    scope: &ScopePredicate,
) -> Result<EffectiveQuery, FilterParseError> {
    let caller = Predicate::from_document(caller)?;
    Ok(merge(caller, scope))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::pep::resolver::ScopeResolver;
    use scopekit_security::{Principal, Role, RoleHierarchy, catalog};
    use serde_json::json;

    fn scope(role: Role) -> ScopePredicate {
        let p = Principal::builder()
            .id("user_3")
            .role(role)
            .tenant_id("company_1")
            .department_id("dept_1")
            .build();
        ScopeResolver::resolve_with(&RoleHierarchy::builtin(), &p, &catalog::ACTION_PLANS).unwrap()
    }

    fn records() -> Vec<Value> {
        let mut out = Vec::new();
        for company in ["company_1", "company_2"] {
            for dept in ["dept_1", "dept_2"] {
                for status in ["active", "closed"] {
                    out.push(json!({
                        "company_id": company,
                        "department_id": dept,
                        "status": status,
                        "assigned_to": ["user_3"],
                    }));
                }
            }
        }
        out
    }

    #[test]
    fn caller_cannot_override_tenant_key() {
        let s = scope(Role::CompanyAdmin);
        let q = merge_document(&json!({"company_id": "company_2"}), &s).unwrap();
        assert_eq!(records().iter().filter(|r| q.matches(r)).count(), 0);
    }

    #[test]
    fn caller_disjunction_stays_inside_scope() {
        let s = scope(Role::DepartmentAdmin);
        let widening = Predicate::any_of(vec![
            Predicate::match_all(),
            Predicate::eq("company_id", "company_2"),
        ]);
        let q = merge(widening, &s);
        for r in records() {
            if q.matches(&r) {
                assert!(s.matches(&r));
            }
        }
        assert_eq!(records().iter().filter(|r| q.matches(r)).count(), 2);
    }

    #[test]
    fn merge_keeps_every_scope_clause() {
        let s = scope(Role::DepartmentAdmin);
        let q = merge(
            Predicate::all_of(vec![
                Predicate::eq("status", "active"),
                Predicate::eq("department_id", "dept_2"),
            ]),
            &s,
        );
        let Predicate::And { predicates } = q.filter() else {
            panic!("expected conjunction, got {:?}", q.filter());
        };
        assert!(predicates.contains(&Predicate::eq("company_id", "company_1")));
        assert!(predicates.contains(&Predicate::eq("department_id", "dept_1")));
        assert!(predicates.contains(&Predicate::eq("department_id", "dept_2")));
    }

    #[test]
    fn unrestricted_scope_returns_caller_filter() {
        let s = scope(Role::SuperAdmin);
        let caller = Predicate::eq("status", "active");
        assert_eq!(merge(caller.clone(), &s).into_filter(), caller);
    }

    #[test]
    fn match_all_caller_yields_scope_alone() {
        let s = scope(Role::CompanyAdmin);
        let q = merge(Predicate::match_all(), &s);
        assert_eq!(q.filter(), s.predicate());
        assert_eq!(q.to_document(), json!({"company_id": {"$eq": "company_1"}}));
    }

    #[test]
    fn unsupported_caller_operator_is_rejected() {
        let s = scope(Role::CompanyAdmin);
        let err = merge_document(&json!({"$where": "1 == 1"}), &s).unwrap_err();
        assert!(matches!(err, FilterParseError::UnsupportedOperator { .. }));
    }
}
