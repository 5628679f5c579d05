//! Static audit of the store's indexes against declared ownership fields.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use scope_enforcer::ScopeResolver;
use scopekit_security::{OwnershipKind, Principal, ResourceType, Role, ScopeClass};
use serde::Serialize;

use crate::error::StoreError;
use crate::report::{FindingSeverity, write_capped};
use crate::runner::ScopeHarness;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexIssueKind {
    /// No index can serve an equality on the field.
    MissingIndex,
    /// Documents with no tenant value; no restricted principal can reach them.
    MissingTenantValue { documents: u64, total: u64 },
}

/// A finding on one collection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexIssue {
    pub collection: String,
    pub field: String,
    /// Always [`FindingSeverity::IndexAdvisory`]; never blocks a deployment.
    pub severity: FindingSeverity,
    #[serde(flatten)]
    pub kind: IndexIssueKind,
}

impl IndexIssue {
    fn new(collection: &str, field: impl Into<String>, kind: IndexIssueKind) -> Self {
        Self {
            collection: collection.to_owned(),
            field: field.into(),
            severity: FindingSeverity::IndexAdvisory,
            kind,
        }
    }
}

impl fmt::Display for IndexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IndexIssueKind::MissingIndex => write!(
                f,
                "{}.{}: no index supports scoping on this field",
                self.collection, self.field
            ),
            IndexIssueKind::MissingTenantValue { documents, total } => write!(
                f,
                "{}.{}: {documents} of {total} document(s) have no tenant value",
                self.collection, self.field
            ),
        }
    }
}

/// A metadata probe that timed out or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InconclusiveProbe {
    pub collection: String,
    pub probe: String,
    pub reason: String,
}

/// Result of [`ScopeHarness::validate_database_scoping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseScopingReport {
    /// True only if every probe completed and found nothing.
    pub passed: bool,
    pub issues: Vec<IndexIssue>,
    /// Index creation statements, one per missing index.
    pub recommendations: Vec<String>,
    pub inconclusive: Vec<InconclusiveProbe>,
}

impl DatabaseScopingReport {
    #[must_use]
    pub fn to_markdown(&self, max_listed: usize) -> String {
        AuditMarkdown {
            report: self,
            max_listed,
        }
        .to_string()
    }
}

struct AuditMarkdown<'a> {
    report: &'a DatabaseScopingReport,
    max_listed: usize,
}

impl fmt::Display for AuditMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "# Database Scoping Audit")?;
        writeln!(f)?;
        writeln!(
            f,
            "- Result: **{}**",
            if report.passed { "PASSED" } else { "FAILED" }
        )?;
        writeln!(
            f,
            "- Issues: {} | Inconclusive probes: {}",
            report.issues.len(),
            report.inconclusive.len()
        )?;

        if !report.issues.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Issues")?;
            let lines: Vec<String> = report.issues.iter().map(ToString::to_string).collect();
            write_capped(f, &lines, self.max_listed)?;
        }
        if !report.recommendations.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Recommendations")?;
            writeln!(f)?;
            writeln!(f, "```js")?;
            for rec in &report.recommendations {
                writeln!(f, "{rec}")?;
            }
            writeln!(f, "```")?;
        }
        if !report.inconclusive.is_empty() {
            writeln!(f)?;
            writeln!(f, "## Inconclusive")?;
            let lines: Vec<String> = report
                .inconclusive
                .iter()
                .map(|p| format!("{} ({}): {}", p.collection, p.probe, p.reason))
                .collect();
            write_capped(f, &lines, self.max_listed)?;
        }
        Ok(())
    }
}

/// Shell statement creating a single-field ascending index.
#[must_use]
pub fn index_recommendation(collection: &str, field: &str) -> String {
    format!("db.{collection}.createIndex({{ {field}: 1 }})")
}

impl ScopeHarness {
    /// Check that every field a restricted scope predicate references is
    /// backed by an index, and count documents lacking a tenant value
    /// against the collection size.
    ///
    /// Each probe runs under the configured timeout. A probe that times out
    /// or fails is reported as inconclusive and fails the audit.
    pub async fn validate_database_scoping(&self) -> DatabaseScopingReport {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        let mut inconclusive = Vec::new();

        for resource in self.resources().iter().filter(|r| !r.is_unowned()) {
            let collection = resource.collection;
            match probe(timeout, self.store().list_indexes(collection)).await {
                Ok(indexes) => {
                    let tenant_field = tenant_field(resource);
                    for field in scoped_fields(resource) {
                        if !indexes.iter().any(|i| i.supports(&field, tenant_field)) {
                            recommendations.push(index_recommendation(collection, &field));
                            issues.push(IndexIssue::new(
                                collection,
                                field,
                                IndexIssueKind::MissingIndex,
                            ));
                        }
                    }
                }
                Err(reason) => inconclusive.push(InconclusiveProbe {
                    collection: collection.to_owned(),
                    probe: "list_indexes".to_owned(),
                    reason,
                }),
            }

            let Some(tenant_field) = tenant_field(resource) else {
                continue;
            };
            let documents =
                match probe(timeout, self.store().count_missing(collection, tenant_field)).await {
                    Ok(0) => continue,
                    Ok(documents) => documents,
                    Err(reason) => {
                        inconclusive.push(InconclusiveProbe {
                            collection: collection.to_owned(),
                            probe: "count_missing".to_owned(),
                            reason,
                        });
                        continue;
                    }
                };
            match probe(timeout, self.store().count(collection)).await {
                Ok(total) => issues.push(IndexIssue::new(
                    collection,
                    tenant_field,
                    IndexIssueKind::MissingTenantValue { documents, total },
                )),
                Err(reason) => inconclusive.push(InconclusiveProbe {
                    collection: collection.to_owned(),
                    probe: "count".to_owned(),
                    reason,
                }),
            }
        }

        let passed = issues.is_empty() && inconclusive.is_empty();
        if passed {
            tracing::info!("database scoping audit passed");
        } else {
            tracing::warn!(
                issues = issues.len(),
                inconclusive = inconclusive.len(),
                "database scoping audit found problems"
            );
        }
        DatabaseScopingReport {
            passed,
            issues,
            recommendations,
            inconclusive,
        }
    }
}

/// Fields the resolver references in any restricted scope predicate for
/// `resource`. Fields bound to `_id` are always indexed.
fn scoped_fields(resource: &ResourceType) -> BTreeSet<String> {
    let probe = Principal::builder()
        .id("index_probe")
        .role(Role::Employee)
        .tenant_id("index_probe")
        .department_id("index_probe")
        .build();
    [
        ScopeClass::Tenant,
        ScopeClass::Department,
        ScopeClass::Individual,
    ]
    .into_iter()
    .filter_map(|class| ScopeResolver::resolve_for_class(class, &probe, resource).ok())
    .flat_map(|scope| {
        scope
            .predicate()
            .referenced_fields()
            .into_iter()
            .filter(|f| *f != "_id")
            .map(str::to_owned)
            .collect::<Vec<_>>()
    })
    .collect()
}

fn tenant_field(resource: &ResourceType) -> Option<&'static str> {
    resource.field_for(OwnershipKind::Tenant).map(|f| f.field)
}

async fn probe<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, String> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("timed out after {} ms", timeout.as_millis())),
    }
}
