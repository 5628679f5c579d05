//! Principal + resource descriptor -> scope predicate.

use std::sync::Arc;

use scopekit_security::{
    OwnershipField, OwnershipKind, Predicate, Principal, ResourceType, RoleHierarchy, RoleTable,
    ScopeClass,
};
use serde_json::Value;

use crate::error::ScopeResolutionError;

/// Resolved row-level restriction for one principal on one resource type.
///
/// Only the resolver constructs these, so a value of this type always
/// carries the tenant clause unless the scope class is unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScopePredicate {
    scope_class: ScopeClass,
    predicate: Predicate,
}

impl ScopePredicate {
    fn new(scope_class: ScopeClass, predicate: Predicate) -> Self {
        Self {
            scope_class,
            predicate,
        }
    }

    #[must_use]
    pub fn scope_class(&self) -> ScopeClass {
        self.scope_class
    }

    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// True if the predicate imposes no restriction.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.scope_class == ScopeClass::Unrestricted
    }

    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        self.predicate.matches(doc)
    }
}

/// Computes scope predicates against the current role table.
///
/// Holds no per-request state. Every call reads the table snapshot afresh,
/// so predicates are never cached by role.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    roles: Arc<RoleTable>,
}

impl ScopeResolver {
    #[must_use]
    pub fn new(roles: Arc<RoleTable>) -> Self {
        Self { roles }
    }

    /// Resolve against the current role table snapshot.
    ///
    /// # Errors
    /// Returns [`ScopeResolutionError`] if the resource type cannot be scoped
    /// for the principal's scope class. Callers must deny.
    pub fn resolve(
        &self,
        principal: &Principal,
        resource: &ResourceType,
    ) -> Result<ScopePredicate, ScopeResolutionError> {
        let hierarchy = self.roles.snapshot();
        Self::resolve_with(&hierarchy, principal, resource)
    }

    /// Resolve against an explicit hierarchy.
    ///
    /// An unrecognized role resolves to the most restrictive class.
    ///
    /// # Errors
    /// See [`Self::resolve`].
    pub fn resolve_with(
        hierarchy: &RoleHierarchy,
        principal: &Principal,
        resource: &ResourceType,
    ) -> Result<ScopePredicate, ScopeResolutionError> {
        let scope_class = hierarchy.scope_class_of(principal.role());
        Self::resolve_for_class(scope_class, principal, resource)
    }

    /// Build the predicate for a given scope class.
    ///
    /// # Errors
    /// See [`Self::resolve`].
    pub fn resolve_for_class(
        scope_class: ScopeClass,
        principal: &Principal,
        resource: &ResourceType,
    ) -> Result<ScopePredicate, ScopeResolutionError> {
        let predicate = match scope_class {
            ScopeClass::Unrestricted => Predicate::match_all(),
            ScopeClass::Tenant => tenant_clause(scope_class, principal, resource)?,
            ScopeClass::Department => tenant_clause(scope_class, principal, resource)?
                .and(department_clause(principal, resource)?),
            ScopeClass::Individual => tenant_clause(scope_class, principal, resource)?
                .and(identity_clause(principal, resource)?),
        };
        Ok(ScopePredicate::new(scope_class, predicate))
    }
}

fn tenant_clause(
    scope_class: ScopeClass,
    principal: &Principal,
    resource: &ResourceType,
) -> Result<Predicate, ScopeResolutionError> {
    if resource.is_unowned() {
        return Err(ScopeResolutionError::NoOwnershipFields {
            resource: resource.name,
            scope_class,
        });
    }
    let field = resource
        .field_for(OwnershipKind::Tenant)
        .ok_or(ScopeResolutionError::NoTenantField {
            resource: resource.name,
            scope_class,
        })?;
    let tenant_id = principal
        .tenant_id()
        .filter(|t| !t.is_empty())
        .ok_or(ScopeResolutionError::PrincipalWithoutTenant { scope_class })?;
    Ok(Predicate::eq(field.field, tenant_id))
}

fn department_clause(
    principal: &Principal,
    resource: &ResourceType,
) -> Result<Predicate, ScopeResolutionError> {
    let department_id = principal
        .department_id()
        .filter(|d| !d.is_empty())
        .ok_or(ScopeResolutionError::PrincipalWithoutDepartment)?;
    let clauses: Vec<Predicate> = resource
        .department_fields()
        .map(|f| membership(f, department_id))
        .collect();
    disjunction(clauses).ok_or(ScopeResolutionError::NoDepartmentField {
        resource: resource.name,
    })
}

fn identity_clause(
    principal: &Principal,
    resource: &ResourceType,
) -> Result<Predicate, ScopeResolutionError> {
    let subject = principal.id();
    if subject.is_empty() {
        return Err(ScopeResolutionError::PrincipalWithoutId);
    }
    let clauses: Vec<Predicate> = resource
        .identity_fields()
        .map(|f| membership(f, subject))
        .collect();
    disjunction(clauses).ok_or(ScopeResolutionError::NoIdentityField {
        resource: resource.name,
    })
}

fn membership(field: &OwnershipField, value: &str) -> Predicate {
    if field.kind.is_multi_valued() {
        Predicate::contains(field.field, value)
    } else {
        Predicate::eq(field.field, value)
    }
}

/// `None` for no clauses; a single clause is returned unwrapped.
fn disjunction(mut clauses: Vec<Predicate>) -> Option<Predicate> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(Predicate::any_of(clauses)),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use scopekit_security::{Role, catalog};
    use serde_json::json;

    fn principal(role: Role) -> Principal {
        Principal::builder()
            .id("user_3")
            .role(role)
            .tenant_id("company_1")
            .department_id("dept_1")
            .build()
    }

    fn resolve(role: Role, resource: &ResourceType) -> Result<ScopePredicate, ScopeResolutionError> {
        ScopeResolver::resolve_with(&RoleHierarchy::builtin(), &principal(role), resource)
    }

    #[test]
    fn super_admin_is_identity() {
        let scope = resolve(Role::SuperAdmin, &catalog::ACTION_PLANS).unwrap();
        assert!(scope.is_unrestricted());
        assert!(scope.predicate().is_match_all());
    }

    #[test]
    fn super_admin_reaches_unowned_types() {
        let scope = resolve(Role::SuperAdmin, &catalog::QUESTIONS).unwrap();
        assert!(scope.predicate().is_match_all());
    }

    #[test]
    fn company_admin_gets_tenant_equality() {
        let scope = resolve(Role::CompanyAdmin, &catalog::ACTION_PLANS).unwrap();
        assert_eq!(scope.scope_class(), ScopeClass::Tenant);
        assert_eq!(scope.predicate(), &Predicate::eq("company_id", "company_1"));
    }

    #[test]
    fn tenant_bound_to_id_for_companies() {
        let scope = resolve(Role::CompanyAdmin, &catalog::COMPANIES).unwrap();
        assert_eq!(scope.predicate(), &Predicate::eq("_id", "company_1"));
    }

    #[test]
    fn department_scope_uses_plain_equality_without_targets() {
        let scope = resolve(Role::DepartmentAdmin, &catalog::ACTION_PLANS).unwrap();
        assert_eq!(
            scope.predicate(),
            &Predicate::all_of(vec![
                Predicate::eq("company_id", "company_1"),
                Predicate::eq("department_id", "dept_1"),
            ])
        );
    }

    #[test]
    fn department_scope_matches_target_departments() {
        let scope = resolve(Role::Leader, &catalog::SURVEYS).unwrap();
        assert!(scope.matches(&json!({
            "company_id": "company_1",
            "target_departments": ["dept_2", "dept_1"],
        })));
        assert!(!scope.matches(&json!({
            "company_id": "company_1",
            "target_departments": ["dept_2"],
        })));
    }

    #[test]
    fn department_scope_without_department_field_is_rejected() {
        let err = resolve(Role::Supervisor, &catalog::COMPANIES).unwrap_err();
        assert_eq!(
            err,
            ScopeResolutionError::NoDepartmentField {
                resource: "companies"
            }
        );
    }

    #[test]
    fn individual_scope_ors_identity_fields() {
        let scope = resolve(Role::Employee, &catalog::ACTION_PLANS).unwrap();
        assert_eq!(scope.scope_class(), ScopeClass::Individual);
        let fields = scope.predicate().referenced_fields();
        assert!(fields.contains("company_id"));
        assert!(fields.contains("assigned_to"));
        assert!(fields.contains("created_by"));
        assert!(!fields.contains("department_id"));

        assert!(scope.matches(&json!({"company_id": "company_1", "created_by": "user_3"})));
        assert!(!scope.matches(&json!({"company_id": "company_2", "created_by": "user_3"})));
    }

    #[test]
    fn individual_scope_without_identity_field_is_rejected() {
        let err = resolve(Role::Employee, &catalog::DEPARTMENTS).unwrap_err();
        assert_eq!(
            err,
            ScopeResolutionError::NoIdentityField {
                resource: "departments"
            }
        );
    }

    #[test]
    fn unowned_type_is_rejected_for_every_restricted_class() {
        for class in [
            ScopeClass::Tenant,
            ScopeClass::Department,
            ScopeClass::Individual,
        ] {
            let err = ScopeResolver::resolve_for_class(
                class,
                &principal(Role::CompanyAdmin),
                &catalog::QUESTIONS,
            )
            .unwrap_err();
            assert!(matches!(
                err,
                ScopeResolutionError::NoOwnershipFields { resource: "questions", .. }
            ));
        }
    }

    #[test]
    fn missing_principal_context_fails_closed() {
        let no_tenant = Principal::builder().id("u").role(Role::CompanyAdmin).build();
        let err = ScopeResolver::resolve_with(
            &RoleHierarchy::builtin(),
            &no_tenant,
            &catalog::SURVEYS,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScopeResolutionError::PrincipalWithoutTenant {
                scope_class: ScopeClass::Tenant
            }
        );

        let no_dept = Principal::builder()
            .id("u")
            .role(Role::Leader)
            .tenant_id("company_1")
            .build();
        let err =
            ScopeResolver::resolve_with(&RoleHierarchy::builtin(), &no_dept, &catalog::SURVEYS)
                .unwrap_err();
        assert_eq!(err, ScopeResolutionError::PrincipalWithoutDepartment);

        let no_id = Principal::builder()
            .role(Role::Employee)
            .tenant_id("company_1")
            .build();
        let err =
            ScopeResolver::resolve_with(&RoleHierarchy::builtin(), &no_id, &catalog::SURVEYS)
                .unwrap_err();
        assert_eq!(err, ScopeResolutionError::PrincipalWithoutId);
    }

    #[test]
    fn blank_principal_context_fails_closed() {
        let p: Principal = serde_json::from_value(json!({
            "id": "user_3",
            "role": "department_admin",
            "tenant_id": "",
            "department_id": "",
        }))
        .unwrap();
        let err = ScopeResolver::resolve_with(&RoleHierarchy::builtin(), &p, &catalog::ACTION_PLANS)
            .unwrap_err();
        assert_eq!(
            err,
            ScopeResolutionError::PrincipalWithoutTenant {
                scope_class: ScopeClass::Department
            }
        );

        let blank_dept = Principal::builder()
            .id("user_3")
            .role(Role::DepartmentAdmin)
            .tenant_id("company_1")
            .department_id("")
            .build();
        let err = ScopeResolver::resolve_with(
            &RoleHierarchy::builtin(),
            &blank_dept,
            &catalog::ACTION_PLANS,
        )
        .unwrap_err();
        assert_eq!(err, ScopeResolutionError::PrincipalWithoutDepartment);
    }

    #[test]
    fn unrecognized_role_resolves_as_individual() {
        let scope = resolve(Role::parse("auditor"), &catalog::ACTION_PLANS).unwrap();
        assert_eq!(scope.scope_class(), ScopeClass::Individual);
    }

    #[test]
    fn resolution_reads_swapped_table() {
        let table = Arc::new(RoleTable::builtin());
        let resolver = ScopeResolver::new(Arc::clone(&table));
        let p = principal(Role::Leader);
        assert_eq!(
            resolver.resolve(&p, &catalog::ACTION_PLANS).unwrap().scope_class(),
            ScopeClass::Department
        );

        let mut config = RoleHierarchy::builtin().to_config();
        if let Some(entry) = config.roles.get_mut("leader") {
            entry.scope = ScopeClass::Tenant;
        }
        table.replace(RoleHierarchy::from_config(&config).unwrap());
        assert_eq!(
            resolver.resolve(&p, &catalog::ACTION_PLANS).unwrap().scope_class(),
            ScopeClass::Tenant
        );
    }
}
