//! TOML policy files.
//!
//! A policy file declares a table per resource kind under `[kinds]`.  A kind
//! is either wholly forbidden or carries an ordered array of field tables.
//! Each field table names exactly one constraint key.
//!
//! Example:
//! ```toml
//! [kinds.google_healthcare_dataset]
//! forbidden = true
//!
//! [[kinds.google_kms_key_ring.fields]]
//! name = "location"
//! one_of = ["us", "us-east1"]
//! message = "Key Ring location must be within specific regions"
//!
//! [[kinds.google_kms_crypto_key.fields]]
//! name = "rotation_period"
//! optional = true
//! predicate = "kms_rotation_within_90_days"
//!
//! [[kinds.google_sql_database_instance.fields]]
//! name = "settings"
//!
//! [[kinds.google_sql_database_instance.fields.nested]]
//! name = "availability_type"
//! equals = "REGIONAL"
//! ```
//!
//! Fields are arrays rather than maps so that declaration order, and with it
//! report order, is exactly what the author wrote.

use std::{collections::{BTreeMap, HashMap}, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use plangate_contracts::error::{PlangateError, PlangateResult};

use crate::{
    catalog::PolicyCatalog,
    constraint::{Constraint, ConstraintKind, Predicate, PredicateFn, ValueType},
    rule::{join_path, Requiredness, ResourceRule},
};

/// Named predicates that policy files may reference with `predicate = "…"`.
///
/// Referencing a name that was never registered is an authoring error
/// reported when the file is loaded.
#[derive(Default, Clone)]
pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`.  Registering the same name twice replaces
    /// the previous function.
    pub fn register(&mut self, name: impl Into<String>, func: PredicateFn) {
        self.predicates.insert(name.into(), func);
    }

    pub fn get(&self, name: &str) -> Option<Predicate> {
        self.predicates
            .get(name)
            .map(|func| Predicate::new(name, func.clone()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRegistry").field("names", &self.names()).finish()
    }
}

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    #[serde(default)]
    pub kinds: BTreeMap<String, KindSpec>,
}

/// The policy for one resource kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindSpec {
    /// When true, every resource of this kind is a violation.  Must not be
    /// combined with `fields`.
    #[serde(default)]
    pub forbidden: bool,

    /// Replaces "forbidden resource kind" for forbidden kinds.
    pub message: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One declared field.  Exactly one of the constraint keys must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,

    /// Only check the field when it is present.
    #[serde(default)]
    pub optional: bool,

    /// Replaces the generated failure message.
    pub message: Option<String>,

    // ── Constraint keys ──────────────────────────────────────────────────────
    pub equals: Option<Value>,
    pub one_of: Option<Vec<Value>>,
    pub min_length: Option<usize>,
    pub pattern: Option<String>,
    pub predicate: Option<String>,
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub any: bool,
    #[serde(default)]
    pub forbidden: bool,
    pub nested: Option<Vec<FieldSpec>>,
}

impl FieldSpec {
    fn constraint(&self, path: &str, registry: &PredicateRegistry) -> PlangateResult<Constraint> {
        let mut kinds: Vec<ConstraintKind> = Vec::new();

        if let Some(v) = &self.equals {
            kinds.push(ConstraintKind::ExactValue(v.clone()));
        }
        if let Some(set) = &self.one_of {
            kinds.push(ConstraintKind::OneOf(set.clone()));
        }
        if let Some(n) = self.min_length {
            kinds.push(ConstraintKind::MinLength(n));
        }
        if let Some(source) = &self.pattern {
            kinds.push(Constraint::pattern(source)?.kind().clone());
        }
        if let Some(name) = &self.predicate {
            let predicate = registry.get(name).ok_or_else(|| PlangateError::InvalidPolicy {
                reason: format!("field '{path}' references unknown predicate '{name}'"),
            })?;
            kinds.push(ConstraintKind::Predicate(predicate));
        }
        if let Some(t) = self.value_type {
            kinds.push(ConstraintKind::Type(t));
        }
        if self.any {
            kinds.push(ConstraintKind::Any);
        }
        if self.forbidden {
            kinds.push(ConstraintKind::Forbidden);
        }
        if let Some(fields) = &self.nested {
            kinds.push(ConstraintKind::Nested(build_rule(fields, path, registry)?));
        }

        if kinds.len() != 1 {
            return Err(PlangateError::InvalidPolicy {
                reason: format!(
                    "field '{path}' must declare exactly one constraint, found {}",
                    kinds.len()
                ),
            });
        }

        let mut constraint = Constraint::new(kinds.remove(0));
        if let Some(message) = &self.message {
            constraint = constraint.with_message(message.clone());
        }
        Ok(constraint)
    }
}

fn build_rule(
    fields: &[FieldSpec],
    context: &str,
    registry: &PredicateRegistry,
) -> PlangateResult<ResourceRule> {
    fields.iter().try_fold(ResourceRule::new(), |rule, spec| {
        let path = join_path(context, &spec.name);
        let constraint = spec.constraint(&path, registry)?;
        let requiredness = if spec.optional || constraint.is_forbidden() {
            Requiredness::Optional
        } else {
            Requiredness::Required
        };
        Ok(rule.field(spec.name.clone(), constraint, requiredness))
    })
}

impl PolicyFile {
    /// Turn the parsed file into a validated catalog.
    pub fn into_catalog(self, registry: &PredicateRegistry) -> PlangateResult<PolicyCatalog> {
        let mut builder = PolicyCatalog::builder();

        for (kind, spec) in self.kinds {
            builder = if spec.forbidden {
                if !spec.fields.is_empty() {
                    return Err(PlangateError::InvalidPolicy {
                        reason: format!("kind '{kind}' is forbidden but also declares fields"),
                    });
                }
                match spec.message {
                    Some(message) => builder.forbid_with_message(kind, message),
                    None => builder.forbid(kind),
                }
            } else {
                let rule = build_rule(&spec.fields, &kind, registry)?;
                builder.rule(kind, rule)
            };
        }

        builder.build()
    }
}

/// Parse `s` as a TOML policy and build a catalog.
///
/// Returns `PlangateError::ConfigError` if the TOML is malformed or does not
/// match the `PolicyFile` layout, and `PlangateError::InvalidPolicy` for
/// authoring mistakes.
pub fn catalog_from_toml_str(s: &str, registry: &PredicateRegistry) -> PlangateResult<PolicyCatalog> {
    let file: PolicyFile = toml::from_str(s).map_err(|e| PlangateError::ConfigError {
        reason: format!("failed to parse policy TOML: {}", e),
    })?;
    file.into_catalog(registry)
}

/// Read the file at `path` and parse it as a TOML policy.
pub fn catalog_from_file(path: &Path, registry: &PredicateRegistry) -> PlangateResult<PolicyCatalog> {
    let contents = std::fs::read_to_string(path).map_err(|e| PlangateError::ConfigError {
        reason: format!("failed to read policy file '{}': {}", path.display(), e),
    })?;
    catalog_from_toml_str(&contents, registry)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
