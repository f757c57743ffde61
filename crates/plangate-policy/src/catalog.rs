//! The policy catalog: resource kind → rule.
//!
//! A catalog is built once at startup and never changes afterwards.  Kinds
//! that the catalog does not mention are passed through unchecked; the
//! catalog's scope is exactly the kinds the organization has written policy
//! for.

use std::collections::BTreeMap;

use plangate_contracts::error::{PlangateError, PlangateResult};

use crate::rule::ResourceRule;

/// Message used when a kind is forbidden without a custom explanation.
pub const FORBIDDEN_KIND_MESSAGE: &str = "forbidden resource kind";

/// What the catalog holds for one resource kind.
#[derive(Debug, Clone)]
pub enum CatalogEntry {
    /// Resources of this kind must satisfy the rule.
    Rule(ResourceRule),
    /// No resource of this kind may be created or updated.
    Forbidden { message: Option<String> },
}

/// The outcome of looking up a kind.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Rule(&'a ResourceRule),
    /// The kind is wholly forbidden; carries the message to report.
    Forbidden(&'a str),
    /// The kind is not policed.
    PassThrough,
}

/// The immutable mapping from resource kind to policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl PolicyCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Exact lookup by kind.
    pub fn resolve(&self, kind: &str) -> Resolution<'_> {
        match self.entries.get(kind) {
            Some(CatalogEntry::Rule(rule)) => Resolution::Rule(rule),
            Some(CatalogEntry::Forbidden { message }) => {
                Resolution::Forbidden(message.as_deref().unwrap_or(FORBIDDEN_KIND_MESSAGE))
            }
            None => Resolution::PassThrough,
        }
    }

    /// Every policed kind, sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(kind, entry)| (kind.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects catalog entries and validates them in `build`.
///
/// ```rust,ignore
/// let catalog = PolicyCatalog::builder()
///     .rule("google_compute_firewall", ResourceRule::new().require("enable_logging", Constraint::equals(true)))
///     .forbid("google_healthcare_dataset")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<(String, CatalogEntry)>,
}

impl CatalogBuilder {
    pub fn rule(mut self, kind: impl Into<String>, rule: ResourceRule) -> Self {
        self.entries.push((kind.into(), CatalogEntry::Rule(rule)));
        self
    }

    pub fn forbid(mut self, kind: impl Into<String>) -> Self {
        self.entries.push((kind.into(), CatalogEntry::Forbidden { message: None }));
        self
    }

    pub fn forbid_with_message(mut self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        self.entries.push((
            kind.into(),
            CatalogEntry::Forbidden {
                message: Some(message.into()),
            },
        ));
        self
    }

    /// Validate every entry and freeze the catalog.
    ///
    /// Fails with `PlangateError::InvalidPolicy` on an empty or duplicated
    /// kind, or on any authoring mistake inside a rule.
    pub fn build(self) -> PlangateResult<PolicyCatalog> {
        let mut entries = BTreeMap::new();

        for (kind, entry) in self.entries {
            if kind.trim().is_empty() {
                return Err(PlangateError::InvalidPolicy {
                    reason: "resource kind must not be empty".to_string(),
                });
            }
            if let CatalogEntry::Rule(rule) = &entry {
                rule.validate(&kind)?;
            }
            if entries.contains_key(&kind) {
                return Err(PlangateError::InvalidPolicy {
                    reason: format!("resource kind '{kind}' is declared more than once"),
                });
            }
            entries.insert(kind, entry);
        }

        Ok(PolicyCatalog { entries })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
