//! Violation records and the aggregated run report.
//!
//! The evaluator produces `Violation`s; the aggregator collects them into a
//! `Report`.  Neither is mutated after creation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single detected policy non-compliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Kind of the offending resource.
    pub resource_kind: String,
    /// Name of the offending resource.
    pub resource_name: String,
    /// Dotted path of the offending field, e.g. `settings[0].availability_type`.
    /// Empty when the violation concerns the whole resource.
    pub field_path: String,
    /// Actionable, human-readable explanation.
    pub message: String,
}

impl Violation {
    pub fn new(
        resource_kind: impl Into<String>,
        resource_name: impl Into<String>,
        field_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resource_kind: resource_kind.into(),
            resource_name: resource_name.into(),
            field_path: field_path.into(),
            message: message.into(),
        }
    }
}

/// Renders as `<kind> <name> : <message>`, with the field path appended in
/// brackets when the violation targets a field.
impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} : {}", self.resource_kind, self.resource_name, self.message)?;
        if !self.field_path.is_empty() {
            write!(f, " [{}]", self.field_path)?;
        }
        Ok(())
    }
}

/// The outcome of checking every resource in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// True only if no violation was found.
    pub passed: bool,
    /// Number of resource changes that were evaluated.
    pub resources_checked: usize,
    /// Every violation, in plan order, then rule declaration order.
    pub violations: Vec<Violation>,
}

impl Report {
    /// Build a report from the collected violations.  `passed` is derived,
    /// never set independently.
    pub fn new(resources_checked: usize, violations: Vec<Violation>) -> Self {
        Self {
            passed: violations.is_empty(),
            resources_checked,
            violations,
        }
    }

    /// One printable line per violation.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.violations.iter().map(|v| v.to_string())
    }
}
