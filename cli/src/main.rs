//! plangate: check a Terraform plan against security and compliance policy.
//!
//! Reads the JSON form of a plan, evaluates every resource it would create or
//! update against the active policy, and prints one line per violation.
//!
//! Usage:
//!   terraform show -json tfplan > tfplan.json
//!   plangate check tfplan.json
//!   plangate check tfplan.json --warn
//!   plangate check tfplan.json --policy policy.toml --format json
//!   plangate policy
//!
//! Exit codes:
//!   0: no violations, or violations found in `--warn` mode
//!   1: violations found
//!   2: the plan or the policy could not be loaded

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use plangate_contracts::{
    error::{PlangateError, PlangateResult},
    report::Report,
};
use plangate_core::Aggregator;
use plangate_policy::{
    rule::{FieldRule, Requiredness, ResourceRule},
    CatalogEngine, CatalogEntry, ConstraintKind, PolicyCatalog,
};

const EXIT_CLEAN: i32 = 0;
const EXIT_VIOLATIONS: i32 = 1;
const EXIT_FATAL: i32 = 2;

// ── CLI definition ────────────────────────────────────────────────────────────

/// plangate: policy gate for infrastructure change plans.
#[derive(Parser)]
#[command(
    name = "plangate",
    about = "Validate a Terraform plan against security and compliance policy",
    long_about = "Checks every resource a Terraform plan would create or update against a\n\
                  per-resource-kind policy and reports every violation in one pass."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a plan (the output of `terraform show -json`).
    Check(CheckArgs),
    /// Print the active policy.
    Policy(PolicyArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Terraform plan JSON file.
    plan: PathBuf,

    /// Only warn on policy violations and terminate successfully.
    #[arg(long)]
    warn: bool,

    /// TOML policy file to use instead of the built-in Google Cloud policy.
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Worker threads used to evaluate resources.
    #[arg(long, default_value_t = 1)]
    jobs: usize,
}

#[derive(clap::Args)]
struct PolicyArgs {
    /// TOML policy file to print instead of the built-in Google Cloud policy.
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `<kind> <name> : <message>` per violation.
    Text,
    /// A single JSON document.
    Json,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Logs go to stderr so stdout carries only the report.  Set RUST_LOG=debug
    // for per-resource tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(&args),
        Command::Policy(args) => run_policy(&args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("plangate error: {}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn load_engine(policy: Option<&Path>) -> PlangateResult<CatalogEngine> {
    match policy {
        Some(path) => {
            info!(path = %path.display(), "loading policy file");
            CatalogEngine::from_file(path, &plangate_gcp::predicates::registry()?)
        }
        None => plangate_gcp::engine(),
    }
}

fn run_check(args: &CheckArgs) -> PlangateResult<i32> {
    let engine = load_engine(args.policy.as_deref())?;

    let bytes = std::fs::read(&args.plan).map_err(|e| PlangateError::MalformedPlan {
        reason: format!("failed to read plan '{}': {}", args.plan.display(), e),
    })?;
    let digest = hex::encode(Sha256::digest(&bytes));
    let text = std::str::from_utf8(&bytes).map_err(|e| PlangateError::MalformedPlan {
        reason: format!("plan '{}' is not UTF-8: {}", args.plan.display(), e),
    })?;

    let changes = plangate_plan::load_plan_str(text)?;
    debug!(plan = %args.plan.display(), sha256 = %digest, resources = changes.len(), "plan loaded");

    let report = Aggregator::new(Box::new(engine)).run_parallel(&changes, args.jobs);

    match args.format {
        Format::Text => {
            for line in report.lines() {
                println!("{line}");
            }
        }
        Format::Json => {
            let envelope = JsonReport {
                generated_at: Utc::now(),
                plan: args.plan.display().to_string(),
                plan_sha256: digest,
                warn_mode: args.warn,
                report: &report,
            };
            println!("{}", render_json(&envelope)?);
        }
    }

    Ok(exit_code(&report, args.warn))
}

/// Warn mode changes only the exit status, never the evaluation or output.
fn exit_code(report: &Report, warn: bool) -> i32 {
    if report.passed || warn {
        EXIT_CLEAN
    } else {
        EXIT_VIOLATIONS
    }
}

fn run_policy(args: &PolicyArgs) -> PlangateResult<i32> {
    let engine = load_engine(args.policy.as_deref())?;
    print!("{}", describe_catalog(engine.catalog()));
    Ok(EXIT_CLEAN)
}

// ── Rendering ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    plan: String,
    plan_sha256: String,
    warn_mode: bool,
    #[serde(flatten)]
    report: &'a Report,
}

fn render_json(envelope: &JsonReport<'_>) -> PlangateResult<String> {
    serde_json::to_string_pretty(envelope).map_err(|e| PlangateError::RenderError {
        reason: e.to_string(),
    })
}

fn describe_catalog(catalog: &PolicyCatalog) -> String {
    let mut out = String::new();
    for (kind, entry) in catalog.entries() {
        match entry {
            CatalogEntry::Forbidden { message } => {
                out.push_str(&format!("{kind}: forbidden"));
                if let Some(m) = message {
                    out.push_str(&format!(" ({m})"));
                }
                out.push('\n');
            }
            CatalogEntry::Rule(rule) => {
                out.push_str(&format!("{kind}:\n"));
                describe_rule(rule, 1, &mut out);
            }
        }
    }
    out
}

fn describe_rule(rule: &ResourceRule, depth: usize, out: &mut String) {
    for FieldRule { name, constraint, requiredness } in rule.fields() {
        let indent = "  ".repeat(depth);
        let presence = match requiredness {
            Requiredness::Required => "required",
            Requiredness::Optional => "optional",
        };
        out.push_str(&format!("{indent}{name} ({presence}): {}", constraint.kind()));
        if let Some(m) = constraint.message() {
            out.push_str(&format!(" ({m})"));
        }
        out.push('\n');
        if let ConstraintKind::Nested(sub) = constraint.kind() {
            describe_rule(sub, depth + 1, out);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use clap::Parser;

    use plangate_contracts::report::{Report, Violation};
    use plangate_policy::{Constraint, PolicyCatalog, ResourceRule};

    use super::{
        describe_catalog, exit_code, render_json, Cli, Command, Format, JsonReport, EXIT_CLEAN,
        EXIT_VIOLATIONS,
    };

    #[test]
    fn test_exit_code_mapping() {
        let clean = Report::new(2, vec![]);
        let dirty = Report::new(2, vec![Violation::new("k", "n", "", "bad")]);

        assert_eq!(exit_code(&clean, false), EXIT_CLEAN);
        assert_eq!(exit_code(&clean, true), EXIT_CLEAN);
        assert_eq!(exit_code(&dirty, false), EXIT_VIOLATIONS);
        assert_eq!(exit_code(&dirty, true), EXIT_CLEAN);
    }

    #[test]
    fn test_parse_check_args() {
        let cli = Cli::try_parse_from([
            "plangate", "check", "tfplan.json", "--warn", "--format", "json", "--jobs", "4",
        ])
        .unwrap();

        match cli.command {
            Command::Check(args) => {
                assert_eq!(args.plan.to_str(), Some("tfplan.json"));
                assert!(args.warn);
                assert!(args.format == Format::Json);
                assert_eq!(args.jobs, 4);
                assert!(args.policy.is_none());
            }
            Command::Policy(_) => panic!("expected check command"),
        }
    }

    #[test]
    fn test_check_defaults() {
        let cli = Cli::try_parse_from(["plangate", "check", "tfplan.json"]).unwrap();
        match cli.command {
            Command::Check(args) => {
                assert!(!args.warn);
                assert!(args.format == Format::Text);
                assert_eq!(args.jobs, 1);
            }
            Command::Policy(_) => panic!("expected check command"),
        }
    }

    #[test]
    fn test_describe_catalog() {
        let catalog = PolicyCatalog::builder()
            .rule(
                "google_storage_bucket",
                ResourceRule::new()
                    .require(
                        "labels",
                        Constraint::nested(ResourceRule::new().require("team", Constraint::any())),
                    )
                    .optional("location", Constraint::one_of(["US"]).with_message("US only")),
            )
            .forbid("google_healthcare_dataset")
            .build()
            .unwrap();

        let text = describe_catalog(&catalog);
        assert_eq!(
            text,
            "google_healthcare_dataset: forbidden\n\
             google_storage_bucket:\n\
             \x20 labels (required): a block with 1 declared field(s)\n\
             \x20   team (required): any value\n\
             \x20 location (optional): one of [\"US\"] (US only)\n"
        );
    }

    #[test]
    fn test_builtin_policy_describes_every_kind() {
        let engine = super::load_engine(None).unwrap();
        let text = describe_catalog(engine.catalog());
        assert!(text.contains("google_kms_crypto_key:\n  rotation_period (optional): accepted by kms_rotation_within_90_days"));
        assert!(text.contains("google_game_services_game_server_cluster: forbidden"));
    }

    #[test]
    fn test_json_envelope_flattens_report() {
        let report = Report::new(1, vec![Violation::new("k", "n", "f", "bad")]);
        let envelope = JsonReport {
            generated_at: chrono::Utc::now(),
            plan: "tfplan.json".to_string(),
            plan_sha256: "00".to_string(),
            warn_mode: false,
            report: &report,
        };

        let value: serde_json::Value = serde_json::from_str(&render_json(&envelope).unwrap()).unwrap();
        assert_eq!(value["passed"], false);
        assert_eq!(value["resources_checked"], 1);
        assert_eq!(value["violations"][0]["field_path"], "f");
        assert_eq!(value["plan_sha256"], "00");
    }
}
