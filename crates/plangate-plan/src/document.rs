//! Serde model of the parts of a Terraform JSON plan that plangate reads.
//!
//! Only `resource_changes` matters.  Every other top-level key
//! (`planned_values`, `prior_state`, `configuration`, …) is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `terraform show -json` plan document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDocument {
    /// Absent when the plan has no changes.
    #[serde(default)]
    pub resource_changes: Vec<PlannedResource>,
}

/// One entry of `resource_changes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedResource {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub change: PlannedChange,
}

/// The `change` object of a resource entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedChange {
    pub actions: Vec<Action>,
    /// Attribute values after apply.  `null` for pure deletions.
    #[serde(default)]
    pub after: Value,
}

/// A Terraform change action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Create,
    Update,
    Delete,
    Read,
    NoOp,
    #[serde(other)]
    Other,
}

impl PlannedResource {
    /// True if applying the plan creates or updates this resource.  A
    /// replacement (`["delete", "create"]`) counts as a create.
    pub fn creates_or_updates(&self) -> bool {
        self.change
            .actions
            .iter()
            .any(|a| matches!(a, Action::Create | Action::Update))
    }
}
