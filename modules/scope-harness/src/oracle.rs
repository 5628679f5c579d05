//! Expected visibility computed straight from the ownership rules.
//!
//! Reads record fields directly and never goes through the predicate
//! algebra, so a defect in resolution or merging shows up as a mismatch
//! instead of being reproduced here. The scope class is derived here too,
//! without the hierarchy's fallback lookup.

use scopekit_security::{OwnershipKind, Principal, ResourceType, Role, RoleHierarchy, ScopeClass};
use serde_json::Value;

/// Scope class `role` must be confined to under `hierarchy`.
///
/// `super_admin` is the only unrestricted role and an unrecognized role is
/// individual, whatever the table says. Other roles take their configured
/// class, except that a missing or unrestricted entry counts as individual.
#[must_use]
pub fn expected_scope_class(hierarchy: &RoleHierarchy, role: &Role) -> ScopeClass {
    match role {
        Role::SuperAdmin => ScopeClass::Unrestricted,
        Role::Unrecognized(_) => ScopeClass::Individual,
        known => match hierarchy.definition(known).map(|d| d.scope_class) {
            Some(ScopeClass::Unrestricted) | None => ScopeClass::Individual,
            Some(class) => class,
        },
    }
}

/// Whether `principal`, holding `scope_class`, should reach `doc`.
#[must_use]
pub fn expected_visible(
    principal: &Principal,
    scope_class: ScopeClass,
    resource: &ResourceType,
    doc: &Value,
) -> bool {
    if scope_class == ScopeClass::Unrestricted {
        return true;
    }

    let Some(tenant) = principal.tenant_id().filter(|t| !t.is_empty()) else {
        return false;
    };
    let in_tenant = resource
        .fields_of(OwnershipKind::Tenant)
        .next()
        .is_some_and(|f| holds(doc.get(f.field), tenant));
    if !in_tenant {
        return false;
    }

    match scope_class {
        ScopeClass::Unrestricted | ScopeClass::Tenant => true,
        ScopeClass::Department => principal
            .department_id()
            .filter(|d| !d.is_empty())
            .is_some_and(|dept| {
                resource
                .ownership
                .iter()
                .filter(|f| {
                    matches!(
                        f.kind,
                        OwnershipKind::Department | OwnershipKind::TargetDepartments
                    )
                })
                .any(|f| holds(doc.get(f.field), dept))
            }),
        ScopeClass::Individual => {
            let id = principal.id();
            !id.is_empty()
                && resource
                    .ownership
                    .iter()
                    .filter(|f| {
                        matches!(
                            f.kind,
                            OwnershipKind::AssignedTo
                                | OwnershipKind::CreatedBy
                                | OwnershipKind::UserId
                        )
                    })
                    .any(|f| holds(doc.get(f.field), id))
        }
    }
}

/// A scalar equal to `want`, or an array with `want` among its elements.
fn holds(value: Option<&Value>, want: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == want,
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(want)),
        _ => false,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use scopekit_security::catalog;
    use serde_json::json;

    fn principal(dept: Option<&str>) -> Principal {
        let b = Principal::builder()
            .id("user_3")
            .role(Role::Leader)
            .tenant_id("company_1");
        match dept {
            Some(d) => b.department_id(d).build(),
            None => b.build(),
        }
    }

    #[test]
    fn tenant_mismatch_is_never_visible() {
        let doc = json!({"company_id": "company_2", "department_id": "dept_1"});
        for class in [ScopeClass::Tenant, ScopeClass::Department, ScopeClass::Individual] {
            assert!(!expected_visible(&principal(Some("dept_1")), class, &catalog::ACTION_PLANS, &doc));
        }
        assert!(expected_visible(
            &principal(Some("dept_1")),
            ScopeClass::Unrestricted,
            &catalog::ACTION_PLANS,
            &doc
        ));
    }

    #[test]
    fn department_matches_target_list() {
        let doc = json!({"company_id": "company_1", "target_departments": ["dept_9", "dept_1"]});
        assert!(expected_visible(&principal(Some("dept_1")), ScopeClass::Department, &catalog::SURVEYS, &doc));
        assert!(!expected_visible(&principal(None), ScopeClass::Department, &catalog::SURVEYS, &doc));
    }

    #[test]
    fn individual_matches_any_identity_field() {
        let doc = json!({"company_id": "company_1", "assigned_to": ["user_1"], "created_by": "user_3"});
        assert!(expected_visible(&principal(None), ScopeClass::Individual, &catalog::ACTION_PLANS, &doc));
    }

    #[test]
    fn scope_class_ignores_table_for_fixed_roles() {
        let builtin = RoleHierarchy::builtin();
        assert_eq!(
            expected_scope_class(&builtin, &Role::parse("auditor")),
            ScopeClass::Individual
        );
        assert_eq!(
            expected_scope_class(&builtin, &Role::SuperAdmin),
            ScopeClass::Unrestricted
        );
        assert_eq!(
            expected_scope_class(&builtin, &Role::Supervisor),
            ScopeClass::Department
        );

        let mut config = builtin.to_config();
        if let Some(entry) = config.roles.get_mut("leader") {
            entry.scope = ScopeClass::Tenant;
        }
        let widened = RoleHierarchy::from_config(&config).unwrap();
        assert_eq!(expected_scope_class(&widened, &Role::Leader), ScopeClass::Tenant);
        assert_eq!(
            expected_scope_class(&widened, &Role::parse("leader ")),
            ScopeClass::Individual
        );
    }

    #[test]
    fn blank_principal_context_sees_nothing() {
        let blank = Principal::builder()
            .id("user_3")
            .role(Role::DepartmentAdmin)
            .tenant_id("")
            .department_id("")
            .build();
        let doc = json!({"company_id": "", "department_id": ""});
        for class in [ScopeClass::Tenant, ScopeClass::Department] {
            assert!(!expected_visible(&blank, class, &catalog::ACTION_PLANS, &doc));
        }
    }

    #[test]
    fn orphan_record_only_for_unrestricted() {
        let doc = json!({"_id": "x"});
        assert!(!expected_visible(&principal(None), ScopeClass::Tenant, &catalog::QUESTIONS, &doc));
        assert!(expected_visible(&principal(None), ScopeClass::Unrestricted, &catalog::QUESTIONS, &doc));
    }
}
