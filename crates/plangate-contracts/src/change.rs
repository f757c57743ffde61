//! Resource change records handed from the plan loader to the evaluator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One resource that a plan proposes to create or update.
///
/// Built by the plan loader from entries whose action set contains `create`
/// or `update`; deletions and no-ops never become a `ResourceChange`.  The
/// evaluator only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Resource kind, e.g. `"google_storage_bucket"`.
    pub kind: String,
    /// Resource name as written in configuration, e.g. `"logs"`.
    pub name: String,
    /// Full resource address (`module.net.google_compute_network.main`), if the
    /// plan carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// The planned attribute values after the change is applied.
    pub config: Map<String, Value>,
}

impl ResourceChange {
    /// Build a change with no address from a kind, a name and a JSON object.
    ///
    /// Non-object `config` values yield an empty configuration.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, config: Value) -> Self {
        let config = match config {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            name: name.into(),
            address: None,
            config,
        }
    }
}
