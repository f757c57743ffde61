//! Plan loader: turns a Terraform JSON plan into `ResourceChange`s.
//!
//! Loading runs in three phases:
//!
//! 1. **Parse**: the text must be JSON.
//! 2. **Structural**: the document is validated against a JSON Schema
//!    describing the `resource_changes` shape using the `jsonschema` crate.
//!    All schema errors are collected into a single failure so the operator
//!    sees every problem with the document at once.
//! 3. **Extract**: entries whose actions include `create` or `update` become
//!    `ResourceChange`s, in plan order.  Deletions, reads and no-ops are
//!    skipped.
//!
//! Any failure is a `PlangateError::MalformedPlan`; nothing is evaluated
//! from a document that cannot be fully understood.

use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, warn};

use plangate_contracts::{
    change::ResourceChange,
    error::{PlangateError, PlangateResult},
};

use crate::document::PlanDocument;

/// The subset of the Terraform plan format that the loader relies on.
fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "resource_changes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["type", "name", "change"],
                    "properties": {
                        "address": { "type": "string" },
                        "type": { "type": "string" },
                        "name": { "type": "string" },
                        "change": {
                            "type": "object",
                            "required": ["actions"],
                            "properties": {
                                "actions": {
                                    "type": "array",
                                    "items": { "type": "string" }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

fn malformed(reason: impl Into<String>) -> PlangateError {
    PlangateError::MalformedPlan { reason: reason.into() }
}

/// Validate `value` against the plan schema, collecting every violation.
fn validate_structure(value: &Value) -> PlangateResult<()> {
    let validator = jsonschema::validator_for(&plan_schema())
        .map_err(|e| malformed(format!("invalid plan schema: {e}")))?;

    let problems: Vec<String> = validator
        .iter_errors(value)
        .map(|error| format!("at '{}': {}", error.instance_path, error))
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        warn!(count = problems.len(), "plan document failed structural validation");
        Err(malformed(problems.join("; ")))
    }
}

/// Parse a plan document already decoded as JSON.
pub fn parse_plan_value(value: Value) -> PlangateResult<PlanDocument> {
    validate_structure(&value)?;
    serde_json::from_value(value).map_err(|e| malformed(e.to_string()))
}

/// Keep the create/update entries of `plan` as `ResourceChange`s, in order.
///
/// A kept entry whose `after` is not an object is malformed.
pub fn extract_changes(plan: PlanDocument) -> PlangateResult<Vec<ResourceChange>> {
    let mut changes = Vec::new();

    for resource in plan.resource_changes {
        if !resource.creates_or_updates() {
            debug!(kind = %resource.kind, name = %resource.name, actions = ?resource.change.actions, "skipping");
            continue;
        }

        let config = match resource.change.after {
            Value::Object(map) => map,
            other => {
                let label = resource
                    .address
                    .clone()
                    .unwrap_or_else(|| format!("{}.{}", resource.kind, resource.name));
                return Err(malformed(format!(
                    "resource '{label}' is created or updated but its planned values are not an object (got {other})"
                )));
            }
        };

        changes.push(ResourceChange {
            kind: resource.kind,
            name: resource.name,
            address: resource.address,
            config,
        });
    }

    debug!(count = changes.len(), "extracted resource changes");
    Ok(changes)
}

/// Parse plan JSON text and extract its create/update changes.
pub fn load_plan_str(s: &str) -> PlangateResult<Vec<ResourceChange>> {
    let value: Value =
        serde_json::from_str(s).map_err(|e| malformed(format!("plan is not valid JSON: {e}")))?;
    extract_changes(parse_plan_value(value)?)
}

/// Read the plan at `path` and extract its create/update changes.
pub fn load_plan_file(path: &Path) -> PlangateResult<Vec<ResourceChange>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| malformed(format!("failed to read plan '{}': {}", path.display(), e)))?;
    load_plan_str(&contents)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
