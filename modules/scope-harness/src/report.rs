//! Harness reports.

use std::fmt;

use scopekit_security::ScopeClass;
use serde::Serialize;

/// Severity of a harness finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSeverity {
    /// A record was reachable that should not have been.
    Violation,
    /// A case could not be executed.
    ExecutionFault,
    /// A record that should have been reachable was not.
    UnderGrant,
    /// An ownership field without a supporting index.
    IndexAdvisory,
}

impl FindingSeverity {
    /// True if a finding of this severity must stop a deployment.
    #[must_use]
    pub fn blocks_deployment(self) -> bool {
        matches!(self, FindingSeverity::Violation | FindingSeverity::ExecutionFault)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FindingSeverity::Violation => "violation",
            FindingSeverity::ExecutionFault => "execution_fault",
            FindingSeverity::UnderGrant => "under_grant",
            FindingSeverity::IndexAdvisory => "index_advisory",
        }
    }
}

/// Outcome of one principal x resource type x caller filter case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeTestResult {
    pub test_name: String,
    pub principal: String,
    pub role: String,
    pub resource_type: String,
    pub caller_filter: String,
    /// Class the principal must be confined to. `None` if the case faulted
    /// before it ran.
    pub scope_class: Option<ScopeClass>,
    /// True if the enforcer denied the access outright.
    pub denied: bool,
    pub total_records: usize,
    pub accessible_records: usize,
    pub expected_records: usize,
    /// Ids reachable that should not be.
    pub violations: Vec<String>,
    /// Ids expected but not reachable.
    pub under_grants: Vec<String>,
    /// Errors that prevented the case from completing.
    pub execution_faults: Vec<String>,
    pub test_passed: bool,
}

impl ScopeTestResult {
    /// Highest-severity finding in this result, if any.
    #[must_use]
    pub fn worst_finding(&self) -> Option<FindingSeverity> {
        if !self.violations.is_empty() {
            Some(FindingSeverity::Violation)
        } else if !self.execution_faults.is_empty() {
            Some(FindingSeverity::ExecutionFault)
        } else if !self.under_grants.is_empty() {
            Some(FindingSeverity::UnderGrant)
        } else {
            None
        }
    }
}

/// Report of a comprehensive run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeTestSuite {
    pub test_name: String,
    pub results: Vec<ScopeTestResult>,
    /// False if any case has a violation or an execution fault.
    pub overall_passed: bool,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub execution_time_ms: u64,
}

impl ScopeTestSuite {
    /// Assemble a suite from results. Results are ordered by test name.
    #[must_use]
    pub fn from_results(
        test_name: impl Into<String>,
        mut results: Vec<ScopeTestResult>,
        execution_time_ms: u64,
    ) -> Self {
        results.sort_by(|a, b| a.test_name.cmp(&b.test_name));
        let overall_passed = !results
            .iter()
            .filter_map(ScopeTestResult::worst_finding)
            .any(FindingSeverity::blocks_deployment);
        let passed_tests = results.iter().filter(|r| r.test_passed).count();
        Self {
            test_name: test_name.into(),
            total_tests: results.len(),
            passed_tests,
            overall_passed,
            execution_time_ms,
            results,
        }
    }

    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.results.iter().map(|r| r.violations.len()).sum()
    }

    #[must_use]
    pub fn under_grant_count(&self) -> usize {
        self.results.iter().map(|r| r.under_grants.len()).sum()
    }

    #[must_use]
    pub fn fault_count(&self) -> usize {
        self.results.iter().map(|r| r.execution_faults.len()).sum()
    }

    /// Human-readable report. Each finding list shows at most `max_listed`
    /// entries followed by a remainder count.
    #[must_use]
    pub fn to_markdown(&self, max_listed: usize) -> String {
        SuiteMarkdown {
            suite: self,
            max_listed,
        }
        .to_string()
    }
}

struct SuiteMarkdown<'a> {
    suite: &'a ScopeTestSuite,
    max_listed: usize,
}

impl fmt::Display for SuiteMarkdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suite = self.suite;
        writeln!(f, "# Scope Test Report: {}", suite.test_name)?;
        writeln!(f)?;
        writeln!(
            f,
            "- Overall: **{}**",
            if suite.overall_passed { "PASSED" } else { "FAILED" }
        )?;
        writeln!(f, "- Tests passed: {}/{}", suite.passed_tests, suite.total_tests)?;
        writeln!(
            f,
            "- Violations: {} | Execution faults: {} | Under-grants: {}",
            suite.violation_count(),
            suite.fault_count(),
            suite.under_grant_count()
        )?;
        writeln!(f, "- Execution time: {} ms", suite.execution_time_ms)?;
        writeln!(f)?;
        writeln!(
            f,
            "| Resource | Role | Principal | Caller filter | Accessible | Expected | Total | Result |"
        )?;
        writeln!(f, "|---|---|---|---|---|---|---|---|")?;

        let mut rows: Vec<&ScopeTestResult> = suite.results.iter().collect();
        rows.sort_by(|a, b| {
            (&a.resource_type, &a.role, &a.principal, &a.caller_filter).cmp(&(
                &b.resource_type,
                &b.role,
                &b.principal,
                &b.caller_filter,
            ))
        });
        for r in &rows {
            let verdict = match (r.test_passed, r.denied) {
                (true, true) => "PASS (denied)",
                (true, false) => "PASS",
                (false, _) => "FAIL",
            };
            writeln!(
                f,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                r.resource_type,
                r.role,
                r.principal,
                r.caller_filter,
                r.accessible_records,
                r.expected_records,
                r.total_records,
                verdict
            )?;
        }

        section(f, "Violations", &rows, self.max_listed, |r| &r.violations)?;
        section(f, "Execution faults", &rows, self.max_listed, |r| {
            &r.execution_faults
        })?;
        section(f, "Under-grants", &rows, self.max_listed, |r| &r.under_grants)
    }
}

fn section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    rows: &[&ScopeTestResult],
    max_listed: usize,
    pick: impl Fn(&ScopeTestResult) -> &Vec<String>,
) -> fmt::Result {
    let affected: Vec<&ScopeTestResult> = rows
        .iter()
        .copied()
        .filter(|r| !pick(*r).is_empty())
        .collect();
    if affected.is_empty() {
        return Ok(());
    }
    writeln!(f)?;
    writeln!(f, "## {title}")?;
    for r in affected {
        writeln!(f)?;
        writeln!(f, "### {}", r.test_name)?;
        write_capped(f, pick(r), max_listed)?;
    }
    Ok(())
}

pub(crate) fn write_capped(
    f: &mut fmt::Formatter<'_>,
    items: &[String],
    max_listed: usize,
) -> fmt::Result {
    for item in items.iter().take(max_listed) {
        writeln!(f, "- {item}")?;
    }
    if items.len() > max_listed {
        writeln!(f, "- ... and {} more", items.len() - max_listed)?;
    }
    Ok(())
}
