//! Comprehensive role x resource matrix run.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use scope_enforcer::{AccessRequest, EnforcerError, ScopeEnforcer};
use scopekit_security::{ResourceType, RoleHierarchy, ScopeClass, catalog};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, StoreError};
use crate::fixtures::{
    CallerFilter, OwnershipMatrixGenerator, PrincipalFixture, RecordGenerator, ScopeTestCase,
    Universe, record_id,
};
use crate::oracle::{expected_scope_class, expected_visible};
use crate::report::{ScopeTestResult, ScopeTestSuite};
use crate::store::RecordStore;

const SUITE_NAME: &str = "comprehensive_scope_test";

/// Verifier for the scope enforcer against a record store.
#[derive(Clone)]
pub struct ScopeHarness {
    enforcer: ScopeEnforcer,
    store: Arc<dyn RecordStore>,
    generator: Arc<dyn RecordGenerator>,
    resources: &'static [ResourceType],
    universe: Arc<Universe>,
    pub(crate) config: HarnessConfig,
}

impl std::fmt::Debug for ScopeHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeHarness")
            .field("enforcer", &self.enforcer)
            .field("resources", &self.resources.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// What a spawned case is, kept outside the task so a panic can still be
/// attributed and cleaned up.
#[derive(Clone)]
struct CaseMeta {
    name: String,
    fixture: PrincipalFixture,
    resource: &'static ResourceType,
    caller: CallerFilter,
    namespace: String,
}

impl ScopeHarness {
    /// # Errors
    /// Returns [`HarnessError::InvalidConfig`] if the configuration cannot
    /// produce a meaningful matrix.
    pub fn new(
        enforcer: ScopeEnforcer,
        store: Arc<dyn RecordStore>,
        config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        if config.max_concurrency == 0 {
            return Err(HarnessError::InvalidConfig(
                "max_concurrency must be at least 1".to_owned(),
            ));
        }
        let u = &config.universe;
        if u.tenants < 2 || u.departments_per_tenant < 2 || u.users_per_department < 2 {
            return Err(HarnessError::InvalidConfig(
                "universe needs at least 2 tenants, 2 departments per tenant and 2 users per department"
                    .to_owned(),
            ));
        }
        Ok(Self {
            enforcer,
            store,
            generator: Arc::new(OwnershipMatrixGenerator),
            resources: catalog::ALL,
            universe: Arc::new(Universe::from_config(&config.universe)),
            config,
        })
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn RecordGenerator>) -> Self {
        self.generator = generator;
        self
    }

    #[must_use]
    pub fn with_resources(mut self, resources: &'static [ResourceType]) -> Self {
        self.resources = resources;
        self
    }

    #[must_use]
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    #[must_use]
    pub fn resources(&self) -> &'static [ResourceType] {
        self.resources
    }

    pub(crate) fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Run every fixture against every resource type with every caller
    /// filter, each case in its own collection namespace.
    ///
    /// Cases run concurrently, bounded by `max_concurrency`. A case that
    /// errors or panics is recorded as failed with an execution fault.
    pub async fn run_comprehensive_test(&self, fixtures: &[PrincipalFixture]) -> ScopeTestSuite {
        let started = Instant::now();
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, CaseMeta> = HashMap::new();

        tracing::info!(
            run_id = %run_id,
            fixtures = fixtures.len(),
            resources = self.resources.len(),
            "starting scope test run"
        );

        let mut index = 0usize;
        for fixture in fixtures {
            for resource in self.resources {
                for caller in CallerFilter::ALL {
                    index += 1;
                    let meta = CaseMeta {
                        name: format!("{}::{}::{}", resource.name, fixture.name, caller.as_str()),
                        fixture: fixture.clone(),
                        resource,
                        caller,
                        namespace: format!("scope_test_{run_id}_{index}_{}", resource.collection),
                    };
                    let ctx = self.clone();
                    let permits = Arc::clone(&permits);
                    let task_meta = meta.clone();
                    let handle = tasks.spawn(async move {
                        let _permit = permits.acquire_owned().await;
                        ctx.run_case(task_meta).await
                    });
                    pending.insert(handle.id(), meta);
                }
            }
        }

        let mut results = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    pending.remove(&id);
                    results.push(result);
                }
                Err(err) => {
                    let Some(meta) = pending.remove(&err.id()) else {
                        tracing::error!(error = %err, "unattributed scope test task failure");
                        continue;
                    };
                    tracing::error!(test = %meta.name, error = %err, "scope test case aborted");
                    self.cleanup(&meta.namespace).await;
                    results.push(faulted(
                        &meta,
                        format!("case aborted: {}", describe_join_error(&err)),
                    ));
                }
            }
        }

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let suite = ScopeTestSuite::from_results(SUITE_NAME, results, elapsed);
        if suite.overall_passed {
            tracing::info!(
                passed = suite.passed_tests,
                total = suite.total_tests,
                "scope test run passed"
            );
        } else {
            tracing::warn!(
                passed = suite.passed_tests,
                total = suite.total_tests,
                violations = suite.violation_count(),
                faults = suite.fault_count(),
                "scope test run failed"
            );
        }
        suite
    }

    /// Prepare the records and expectation for one case.
    fn prepare_case(
        &self,
        meta: &CaseMeta,
        scope_class: ScopeClass,
    ) -> anyhow::Result<ScopeTestCase> {
        let records = self.generator.generate(meta.resource, &self.universe)?;
        let principal = &meta.fixture.principal;
        let expected_visible_ids = records
            .iter()
            .filter(|r| expected_visible(principal, scope_class, meta.resource, r))
            .map(record_id)
            .collect();
        Ok(ScopeTestCase {
            name: meta.name.clone(),
            fixture: meta.fixture.clone(),
            resource: meta.resource,
            caller: meta.caller,
            records,
            expected_visible_ids,
        })
    }

    async fn run_case(&self, meta: CaseMeta) -> ScopeTestResult {
        // One table snapshot serves both the expectation and the enforcer.
        let hierarchy = self.enforcer.role_table().snapshot();
        let scope_class = expected_scope_class(&hierarchy, meta.fixture.principal.role());
        let case = match self.prepare_case(&meta, scope_class) {
            Ok(case) => case,
            Err(err) => {
                tracing::warn!(test = %meta.name, error = %err, "record generation failed");
                return faulted(&meta, format!("record generation failed: {err:#}"));
            }
        };

        let outcome = self
            .execute(&case, &hierarchy, scope_class, &meta.namespace)
            .await;
        self.cleanup(&meta.namespace).await;

        match outcome {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(test = %meta.name, error = %err, "store operation failed");
                faulted(&meta, format!("store operation failed: {err}"))
            }
        }
    }

    async fn execute(
        &self,
        case: &ScopeTestCase,
        hierarchy: &RoleHierarchy,
        scope_class: ScopeClass,
        namespace: &str,
    ) -> Result<ScopeTestResult, StoreError> {
        let principal = &case.fixture.principal;
        let foreign = principal
            .tenant_id()
            .and_then(|t| self.universe.foreign_tenant(t))
            .or_else(|| self.universe.tenants().last().map(String::as_str))
            .unwrap_or_default();
        let request = AccessRequest::new().filter(case.caller.predicate(case.resource, foreign));

        self.store
            .insert_many(namespace, case.records.clone())
            .await?;

        let (accessible, denied) = match self.enforcer.scoped_query_with(
            hierarchy,
            principal,
            case.resource,
            &request,
        ) {
            Ok(query) => {
                let found = self.store.find(namespace, &query).await?;
                (found.iter().map(record_id).collect::<BTreeSet<_>>(), false)
            }
            Err(EnforcerError::Resolution(err)) => {
                tracing::debug!(test = %case.name, error = %err, "access denied by resolver");
                (BTreeSet::new(), true)
            }
            Err(err) => {
                return Ok(ScopeTestResult {
                    execution_faults: vec![format!("enforcer error: {err}")],
                    ..base_result(case, Some(scope_class))
                });
            }
        };

        let violations: Vec<String> = accessible
            .difference(&case.expected_visible_ids)
            .cloned()
            .collect();
        let under_grants: Vec<String> = case
            .expected_visible_ids
            .difference(&accessible)
            .cloned()
            .collect();
        if !violations.is_empty() {
            tracing::error!(
                test = %case.name,
                count = violations.len(),
                "scope violation detected"
            );
        }

        let test_passed = violations.is_empty() && under_grants.is_empty();
        Ok(ScopeTestResult {
            denied,
            accessible_records: accessible.len(),
            violations,
            under_grants,
            test_passed,
            ..base_result(case, Some(scope_class))
        })
    }

    async fn cleanup(&self, namespace: &str) {
        if let Err(err) = self.store.drop_collection(namespace).await {
            tracing::warn!(namespace, error = %err, "failed to drop test collection");
        }
    }
}

fn base_result(case: &ScopeTestCase, scope_class: Option<ScopeClass>) -> ScopeTestResult {
    ScopeTestResult {
        test_name: case.name.clone(),
        principal: case.fixture.name.clone(),
        role: case.fixture.principal.role().to_string(),
        resource_type: case.resource.name.to_owned(),
        caller_filter: case.caller.as_str().to_owned(),
        scope_class,
        denied: false,
        total_records: case.records.len(),
        accessible_records: 0,
        expected_records: case.expected_visible_ids.len(),
        violations: Vec::new(),
        under_grants: Vec::new(),
        execution_faults: Vec::new(),
        test_passed: false,
    }
}

fn faulted(meta: &CaseMeta, fault: String) -> ScopeTestResult {
    ScopeTestResult {
        test_name: meta.name.clone(),
        principal: meta.fixture.name.clone(),
        role: meta.fixture.principal.role().to_string(),
        resource_type: meta.resource.name.to_owned(),
        caller_filter: meta.caller.as_str().to_owned(),
        scope_class: None,
        denied: false,
        total_records: 0,
        accessible_records: 0,
        expected_records: 0,
        violations: Vec::new(),
        under_grants: Vec::new(),
        execution_faults: vec![fault],
        test_passed: false,
    }
}

fn describe_join_error(err: &tokio::task::JoinError) -> String {
    if err.is_panic() {
        "panicked".to_owned()
    } else if err.is_cancelled() {
        "cancelled".to_owned()
    } else {
        err.to_string()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::fixtures::standard_fixtures;
    use crate::memory::InMemoryRecordStore;
    use scopekit_security::RoleTable;
    use tracing_test::traced_test;

    static PLANS: [ResourceType; 1] = [catalog::ACTION_PLANS];

    fn harness() -> ScopeHarness {
        let enforcer = ScopeEnforcer::new(Arc::new(RoleTable::builtin()));
        ScopeHarness::new(
            enforcer,
            Arc::new(InMemoryRecordStore::new()),
            HarnessConfig {
                max_concurrency: 1,
                ..HarnessConfig::default()
            },
        )
        .unwrap()
        .with_resources(&PLANS)
    }

    #[tokio::test]
    #[traced_test]
    async fn run_is_logged() {
        let h = harness();
        let suite = h.run_comprehensive_test(&standard_fixtures(h.universe())).await;
        assert!(suite.overall_passed);
        assert!(logs_contain("starting scope test run"));
        assert!(logs_contain("scope test run passed"));
    }

    #[tokio::test]
    async fn case_names_identify_resource_fixture_and_filter() {
        let h = harness();
        let suite = h.run_comprehensive_test(&standard_fixtures(h.universe())[..1]).await;
        let names: Vec<&str> = suite.results.iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(
            names,
            [
                "action_plans::super_admin::cross_tenant_widening",
                "action_plans::super_admin::match_all",
            ]
        );
        assert_eq!(suite.test_name, SUITE_NAME);
    }

    #[tokio::test]
    async fn employee_sees_only_own_plans() {
        let h = harness();
        let fixtures = standard_fixtures(h.universe());
        let employee: Vec<_> = fixtures
            .into_iter()
            .filter(|f| f.name == "employee")
            .collect();
        let suite = h.run_comprehensive_test(&employee).await;
        for r in &suite.results {
            assert_eq!(r.scope_class, Some(ScopeClass::Individual));
            assert!(r.accessible_records > 0);
            assert!(r.accessible_records < r.total_records);
            assert!(r.test_passed);
        }
    }
}
