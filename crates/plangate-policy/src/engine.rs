//! Catalog-backed policy engine implementation.
//!
//! `CatalogEngine` holds a `PolicyCatalog` and implements the `PolicyEngine`
//! trait from plangate-core.
//!
//! Evaluation algorithm, per resource:
//!
//! 1. Resolve the resource kind in the catalog.
//! 2. Forbidden kind → exactly one violation, whatever the configuration.
//! 3. Unlisted kind → no violations (pass-through).
//! 4. Otherwise apply the kind's rule to the configuration and tag every
//!    finding with the resource kind and name.

use std::path::Path;

use tracing::debug;

use plangate_contracts::{
    change::ResourceChange,
    error::PlangateResult,
    report::Violation,
};
use plangate_core::traits::PolicyEngine;

use crate::{
    catalog::{PolicyCatalog, Resolution},
    file::PredicateRegistry,
};

/// A `PolicyEngine` that evaluates resources against a `PolicyCatalog`.
///
/// ```rust,ignore
/// use plangate_policy::CatalogEngine;
///
/// let engine = CatalogEngine::from_file(Path::new("policy.toml"), &registry)?;
/// ```
#[derive(Debug)]
pub struct CatalogEngine {
    catalog: PolicyCatalog,
}

impl CatalogEngine {
    pub fn new(catalog: PolicyCatalog) -> Self {
        Self { catalog }
    }

    /// Parse `s` as a TOML policy and build an engine from it.
    pub fn from_toml_str(s: &str, registry: &PredicateRegistry) -> PlangateResult<Self> {
        crate::file::catalog_from_toml_str(s, registry).map(Self::new)
    }

    /// Read and parse the TOML policy file at `path`.
    pub fn from_file(path: &Path, registry: &PredicateRegistry) -> PlangateResult<Self> {
        crate::file::catalog_from_file(path, registry).map(Self::new)
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }
}

impl PolicyEngine for CatalogEngine {
    fn evaluate(&self, change: &ResourceChange) -> Vec<Violation> {
        let violation = |path: String, message: String| {
            Violation::new(&change.kind, &change.name, path, message)
        };

        match self.catalog.resolve(&change.kind) {
            Resolution::PassThrough => {
                debug!(kind = %change.kind, name = %change.name, "kind not policed; passing through");
                vec![]
            }

            Resolution::Forbidden(message) => {
                debug!(kind = %change.kind, name = %change.name, "kind is forbidden");
                vec![violation(String::new(), message.to_string())]
            }

            Resolution::Rule(rule) => {
                debug!(
                    kind = %change.kind,
                    name = %change.name,
                    fields = rule.fields().len(),
                    "applying rule"
                );
                rule.apply(&change.config)
                    .into_iter()
                    .map(|finding| violation(finding.path, finding.message))
                    .collect()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
