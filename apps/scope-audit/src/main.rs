#![allow(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use scope_enforcer::ScopeEnforcer;
use scope_harness::{InMemoryRecordStore, RecordStore, ScopeHarness, standard_fixtures};
use scopekit_security::RoleTable;

use crate::config::ScopeAuditConfig;

/// Audit tenant, department and individual data scoping.
#[derive(Parser)]
#[command(name = "scope-audit", version, about, long_about = None)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every fixture principal against every resource type
    Run {
        /// Output the suite as JSON
        #[arg(long)]
        json: bool,

        /// Findings listed per report section
        #[arg(long)]
        max_listed: Option<usize>,
    },
    /// Audit the configured index layout against ownership fields
    Indexes {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Exit non-zero when the audit finds anything
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // Layered config: defaults -> YAML (if provided) -> env (SCOPE_AUDIT__*)
    let config = ScopeAuditConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command.unwrap_or(Commands::Run {
        json: false,
        max_listed: None,
    }) {
        Commands::Run { json, max_listed } => run_matrix(&config, json, max_listed).await,
        Commands::Indexes { json, strict } => audit_indexes(&config, json, strict).await,
    }
}

fn build_enforcer(config: &ScopeAuditConfig) -> Result<ScopeEnforcer> {
    let roles = Arc::new(RoleTable::new(config.role_hierarchy()?));
    Ok(ScopeEnforcer::new(roles).with_feature_flags(Arc::new(config.feature_flags.clone())))
}

async fn run_matrix(
    config: &ScopeAuditConfig,
    json: bool,
    max_listed: Option<usize>,
) -> Result<ExitCode> {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new());
    let harness = ScopeHarness::new(build_enforcer(config)?, store, config.harness.clone())?;
    let fixtures = standard_fixtures(harness.universe());

    tracing::info!(fixtures = fixtures.len(), "running scope matrix");
    let suite = harness.run_comprehensive_test(&fixtures).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&suite).context("serialize suite")?
        );
    } else {
        print!(
            "{}",
            suite.to_markdown(max_listed.unwrap_or(config.report.max_listed))
        );
        print_verdict(
            suite.overall_passed,
            &format!("{}/{} cases passed", suite.passed_tests, suite.total_tests),
        );
    }

    Ok(if suite.overall_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn audit_indexes(config: &ScopeAuditConfig, json: bool, strict: bool) -> Result<ExitCode> {
    let store: Arc<dyn RecordStore> = Arc::new(config.index_layout_store());
    let harness = ScopeHarness::new(build_enforcer(config)?, store, config.harness.clone())?;
    let report = harness.validate_database_scoping().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    } else {
        print!("{}", report.to_markdown(config.report.max_listed));
        print_verdict(
            report.passed,
            &format!("{} index issue(s)", report.issues.len()),
        );
    }

    Ok(if strict && !report.passed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_verdict(passed: bool, summary: &str) {
    if passed {
        eprintln!("{} {summary}", "PASSED".green().bold());
    } else {
        eprintln!("{} {summary}", "FAILED".red().bold());
    }
}
