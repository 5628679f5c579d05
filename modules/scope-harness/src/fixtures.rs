//! Synthetic principals, ownership universe and record generation.

use std::collections::BTreeSet;

use scopekit_security::{OwnershipKind, Predicate, Principal, ResourceType, Role};
use serde_json::{Map, Value, json};

use crate::config::UniverseConfig;

/// One combination of owners a synthetic record can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipCell {
    pub tenant: String,
    pub department: String,
    pub user: String,
}

/// The tenants, departments and users synthetic records are spread over.
///
/// Names are `company_{t}`, `dept_{t}_{d}` and `user_{t}_{d}_{u}`. Besides
/// one cell per user, every tenant after the first gets a cell reusing the
/// first tenant's department and user ids, so a missing tenant clause cannot
/// hide behind globally unique department ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    tenants: Vec<String>,
    departments: Vec<String>,
    users: Vec<String>,
    cells: Vec<OwnershipCell>,
}

impl Universe {
    #[must_use]
    pub fn from_config(cfg: &UniverseConfig) -> Self {
        let mut tenants = Vec::new();
        let mut departments = Vec::new();
        let mut users = Vec::new();
        let mut cells = Vec::new();

        for t in 1..=cfg.tenants {
            let tenant = format!("company_{t}");
            for d in 1..=cfg.departments_per_tenant {
                let department = format!("dept_{t}_{d}");
                for u in 1..=cfg.users_per_department {
                    let user = format!("user_{t}_{d}_{u}");
                    cells.push(OwnershipCell {
                        tenant: tenant.clone(),
                        department: department.clone(),
                        user: user.clone(),
                    });
                    users.push(user);
                }
                departments.push(department);
            }
            tenants.push(tenant);
        }

        if let Some(first) = cells.first().cloned() {
            for tenant in tenants.iter().skip(1) {
                cells.push(OwnershipCell {
                    tenant: tenant.clone(),
                    ..first.clone()
                });
            }
        }

        Self {
            tenants,
            departments,
            users,
            cells,
        }
    }

    #[must_use]
    pub fn tenants(&self) -> &[String] {
        &self.tenants
    }

    #[must_use]
    pub fn cells(&self) -> &[OwnershipCell] {
        &self.cells
    }

    /// Cell the standard fixtures are drawn from.
    #[must_use]
    pub fn home_cell(&self) -> Option<&OwnershipCell> {
        self.cells.first()
    }

    /// A tenant other than `tenant`, if the universe has one.
    #[must_use]
    pub fn foreign_tenant(&self, tenant: &str) -> Option<&str> {
        self.tenants
            .iter()
            .map(String::as_str)
            .find(|t| *t != tenant)
    }

    fn neighbour<'a>(pool: &'a [String], of: &'a str) -> &'a str {
        pool.iter()
            .map(String::as_str)
            .find(|x| *x != of)
            .unwrap_or(of)
    }

    fn other_department<'a>(&'a self, of: &'a str) -> &'a str {
        Self::neighbour(&self.departments, of)
    }

    fn other_user<'a>(&'a self, of: &'a str) -> &'a str {
        Self::neighbour(&self.users, of)
    }
}

/// A named principal the matrix is run for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalFixture {
    pub name: String,
    pub principal: Principal,
}

impl PrincipalFixture {
    #[must_use]
    pub fn new(name: impl Into<String>, principal: Principal) -> Self {
        Self {
            name: name.into(),
            principal,
        }
    }
}

/// One fixture per known role drawn from the home cell, plus an
/// unrecognized role and a department admin without a department.
#[must_use]
pub fn standard_fixtures(universe: &Universe) -> Vec<PrincipalFixture> {
    let Some(home) = universe.home_cell() else {
        return Vec::new();
    };
    let in_home = |role: Role| {
        Principal::builder()
            .id(home.user.clone())
            .role(role)
            .tenant_id(home.tenant.clone())
            .department_id(home.department.clone())
            .build()
    };

    let mut fixtures: Vec<PrincipalFixture> = Role::known()
        .into_iter()
        .map(|role| PrincipalFixture::new(role.as_str().to_owned(), in_home(role)))
        .collect();
    fixtures.push(PrincipalFixture::new(
        "unrecognized_role",
        in_home(Role::parse("auditor")),
    ));
    fixtures.push(PrincipalFixture::new(
        "department_admin_without_department",
        Principal::builder()
            .id(home.user.clone())
            .role(Role::DepartmentAdmin)
            .tenant_id(home.tenant.clone())
            .build(),
    ));
    fixtures
}

/// The caller-side filter a case runs with.
///
/// Every variant accepts every record on its own, so the expected visible
/// set is determined by the principal alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerFilter {
    /// No caller restriction.
    MatchAll,
    /// `everything OR company_id = <foreign tenant>`: a widening attempt.
    CrossTenantWidening,
}

impl CallerFilter {
    pub const ALL: [CallerFilter; 2] = [CallerFilter::MatchAll, CallerFilter::CrossTenantWidening];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallerFilter::MatchAll => "match_all",
            CallerFilter::CrossTenantWidening => "cross_tenant_widening",
        }
    }

    #[must_use]
    pub fn predicate(self, resource: &ResourceType, foreign_tenant: &str) -> Predicate {
        match self {
            CallerFilter::MatchAll => Predicate::match_all(),
            CallerFilter::CrossTenantWidening => {
                let tenant_field = resource
                    .field_for(OwnershipKind::Tenant)
                    .map_or("company_id", |f| f.field);
                Predicate::any_of(vec![
                    Predicate::match_all(),
                    Predicate::eq(tenant_field, foreign_tenant),
                ])
            }
        }
    }
}

/// Produces synthetic records for a resource type.
pub trait RecordGenerator: Send + Sync {
    /// # Errors
    /// Any error fails the case it was generating for.
    fn generate(&self, resource: &ResourceType, universe: &Universe) -> anyhow::Result<Vec<Value>>;
}

/// Default generator: one record per ownership cell, varying multi-valued
/// and creator fields so that both matching and non-matching shapes occur,
/// plus one record with no ownership fields at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipMatrixGenerator;

impl RecordGenerator for OwnershipMatrixGenerator {
    fn generate(&self, resource: &ResourceType, universe: &Universe) -> anyhow::Result<Vec<Value>> {
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(universe.cells().len() + 1);

        for (n, cell) in universe.cells().iter().enumerate() {
            let mut doc = Map::new();
            doc.insert("_id".to_owned(), json!(format!("{}_{n}", resource.name)));
            for field in resource.ownership {
                let value = match field.kind {
                    OwnershipKind::Tenant => json!(cell.tenant),
                    OwnershipKind::Department => json!(cell.department),
                    OwnershipKind::UserId => json!(cell.user),
                    OwnershipKind::TargetDepartments => {
                        let other = universe.other_department(&cell.department);
                        match n % 3 {
                            0 => json!([cell.department]),
                            1 => json!([other, cell.department]),
                            _ => json!([other]),
                        }
                    }
                    OwnershipKind::AssignedTo => {
                        let other = universe.other_user(&cell.user);
                        match n % 3 {
                            0 => json!([cell.user]),
                            1 => json!([other, cell.user]),
                            _ => json!([other]),
                        }
                    }
                    OwnershipKind::CreatedBy => {
                        if n % 2 == 0 {
                            json!(cell.user)
                        } else {
                            json!(universe.other_user(&cell.user))
                        }
                    }
                };
                doc.insert(field.field.to_owned(), value);
            }

            let id = doc.get("_id").map(Value::to_string).unwrap_or_default();
            if seen.insert(id) {
                records.push(Value::Object(doc));
            }
        }

        records.push(json!({ "_id": format!("{}_orphan", resource.name) }));
        Ok(records)
    }
}

/// A fully prepared case: the records it seeds and the ids the principal
/// is expected to reach.
#[derive(Debug, Clone)]
pub struct ScopeTestCase {
    pub name: String,
    pub fixture: PrincipalFixture,
    pub resource: &'static ResourceType,
    pub caller: CallerFilter,
    pub records: Vec<Value>,
    pub expected_visible_ids: BTreeSet<String>,
}

/// Stable identifier of a synthetic record.
#[must_use]
pub fn record_id(doc: &Value) -> String {
    match doc.get("_id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => doc.to_string(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use scopekit_security::catalog;

    fn universe() -> Universe {
        Universe::from_config(&UniverseConfig::default())
    }

    #[test]
    fn universe_names_and_collision_cells() {
        let u = universe();
        assert_eq!(u.tenants(), ["company_1", "company_2", "company_3"]);
        // 3 tenants x 2 departments x 2 users, plus one collision cell per foreign tenant.
        assert_eq!(u.cells().len(), 14);
        let collisions: Vec<_> = u
            .cells()
            .iter()
            .filter(|c| c.department == "dept_1_1" && c.tenant != "company_1")
            .collect();
        assert_eq!(collisions.len(), 2);
        assert_eq!(u.foreign_tenant("company_1"), Some("company_2"));
    }

    #[test]
    fn standard_fixtures_cover_every_role() {
        let fixtures = standard_fixtures(&universe());
        let names: Vec<&str> = fixtures.iter().map(|f| f.name.as_str()).collect();
        for role in Role::known() {
            assert!(names.contains(&role.as_str()));
        }
        assert!(names.contains(&"unrecognized_role"));
        let no_dept = fixtures
            .iter()
            .find(|f| f.name == "department_admin_without_department")
            .unwrap();
        assert_eq!(no_dept.principal.department_id(), None);
    }

    #[test]
    fn generator_varies_multi_valued_fields() {
        let records = OwnershipMatrixGenerator
            .generate(&catalog::SURVEYS, &universe())
            .unwrap();
        let shapes: BTreeSet<usize> = records
            .iter()
            .filter_map(|r| r.get("target_departments"))
            .filter_map(Value::as_array)
            .map(Vec::len)
            .collect();
        assert_eq!(shapes, BTreeSet::from([1, 2]));
        assert!(records.iter().any(|r| record_id(r) == "surveys_orphan"));
    }

    #[test]
    fn generator_deduplicates_id_bound_records() {
        let records = OwnershipMatrixGenerator
            .generate(&catalog::COMPANIES, &universe())
            .unwrap();
        let ids: Vec<String> = records.iter().map(record_id).collect();
        assert_eq!(
            ids,
            ["company_1", "company_2", "company_3", "companies_orphan"]
        );
    }

    #[test]
    fn widening_filter_targets_resource_tenant_field() {
        let p = CallerFilter::CrossTenantWidening.predicate(&catalog::COMPANIES, "company_2");
        assert!(p.referenced_fields().contains("_id"));
        assert!(p.matches(&json!({"_id": "company_9"})));
    }
}
