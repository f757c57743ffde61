//! Per-resource-kind rules.
//!
//! A `ResourceRule` maps field names to constraints for one resource kind.
//! Fields are checked in declaration order, and every declared field is
//! checked, so a single evaluation surfaces every problem with a resource.
//!
//! Only declared fields are policed.  Anything else in the resource's
//! configuration is ignored; see [`ExtraFields`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use plangate_contracts::error::{PlangateError, PlangateResult};

use crate::constraint::{Constraint, ConstraintKind, Finding};

/// Whether a declared field must be present.
///
/// Every declared field is `Required` unless explicitly marked `Optional`.
/// An optional field that is absent is not checked at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requiredness {
    #[default]
    Required,
    Optional,
}

/// How a rule treats configuration fields it does not declare.
///
/// There is a single policy: undeclared fields are never inspected, never
/// reported.  A rule is an allow-list of concerns, not an allow-list of
/// shapes.  The enum exists so this security-relevant default is visible on
/// every rule instead of being implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraFields {
    #[default]
    Ignore,
}

/// One declared field of a rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub constraint: Constraint,
    pub requiredness: Requiredness,
}

/// The constraints for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct ResourceRule {
    fields: Vec<FieldRule>,
    extra_fields: ExtraFields,
}

impl ResourceRule {
    /// An empty rule.  It accepts every configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a mandatory field.
    pub fn require(self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.field(name, constraint, Requiredness::Required)
    }

    /// Declare a field that is only checked when present.
    pub fn optional(self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.field(name, constraint, Requiredness::Optional)
    }

    /// Declare a field that must not be set.
    pub fn forbid(self, name: impl Into<String>) -> Self {
        self.field(name, Constraint::forbidden(), Requiredness::Optional)
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        constraint: Constraint,
        requiredness: Requiredness,
    ) -> Self {
        self.fields.push(FieldRule {
            name: name.into(),
            constraint,
            requiredness,
        });
        self
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn extra_fields(&self) -> ExtraFields {
        self.extra_fields
    }

    /// True if any declared field is required (and not a prohibition).
    pub fn has_required(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.requiredness == Requiredness::Required && !f.constraint.is_forbidden())
    }

    /// Check `config` against every declared field, in declaration order.
    ///
    /// JSON `null` counts as absent: Terraform writes unset attributes as
    /// null.  A required field that is absent yields exactly one
    /// "missing required field" finding and its constraint is not evaluated.
    /// A prohibited field that is absent always passes.
    pub fn apply(&self, config: &Map<String, Value>) -> Vec<Finding> {
        self.apply_at("", config)
    }

    pub(crate) fn apply_at(&self, prefix: &str, config: &Map<String, Value>) -> Vec<Finding> {
        let mut findings = Vec::new();

        for field in &self.fields {
            let path = join_path(prefix, &field.name);
            let value = config.get(&field.name).filter(|v| !v.is_null());

            match value {
                Some(v) => findings.extend(field.constraint.check(&path, Some(v))),
                None if field.constraint.is_forbidden() => {}
                None if field.requiredness == Requiredness::Optional => {}
                None => findings.push(Finding::new(
                    path,
                    format!("missing required field {}", field.name),
                )),
            }
        }

        findings
    }

    /// Reject authoring mistakes: duplicate field names, empty allowed sets,
    /// and the same problems inside nested rules.  `context` names the rule
    /// in error messages.
    pub(crate) fn validate(&self, context: &str) -> PlangateResult<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            let path = join_path(context, &field.name);
            if !seen.insert(field.name.as_str()) {
                return Err(PlangateError::InvalidPolicy {
                    reason: format!("field '{path}' is declared more than once"),
                });
            }
            match field.constraint.kind() {
                ConstraintKind::OneOf(allowed) if allowed.is_empty() => {
                    return Err(PlangateError::InvalidPolicy {
                        reason: format!("field '{path}' has an empty allowed set"),
                    });
                }
                ConstraintKind::Nested(rule) => rule.validate(&path)?,
                _ => {}
            }
        }
        Ok(())
    }
}

/// Join a parent path and a field name with a dot.
pub(crate) fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{ExtraFields, ResourceRule};
    use crate::constraint::Constraint;

    fn config(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("fixture must be an object, got {other}"),
        }
    }

    #[test]
    fn test_missing_required_fields_are_each_reported() {
        let rule = ResourceRule::new()
            .require("a", Constraint::equals(1))
            .require("b", Constraint::one_of(["x"]))
            .require("c", Constraint::min_length(1));

        let findings = rule.apply(&config(json!({})));
        let paths: Vec<&str> = findings.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
        for f in &findings {
            assert_eq!(f.message, format!("missing required field {}", f.path));
        }
    }

    #[test]
    fn test_null_counts_as_absent() {
        let rule = ResourceRule::new()
            .require("kms_key_name", Constraint::any())
            .optional("rotation_period", Constraint::equals("1s"));

        let findings = rule.apply(&config(json!({ "kms_key_name": null, "rotation_period": null })));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "missing required field kms_key_name");
    }

    #[test]
    fn test_optional_absent_field_is_not_checked() {
        let rule = ResourceRule::new().optional("rotation_period", Constraint::equals("1s"));
        assert!(rule.apply(&config(json!({}))).is_empty());
        assert_eq!(rule.apply(&config(json!({ "rotation_period": "2s" }))).len(), 1);
    }

    #[test]
    fn test_forbidden_field_absence_passes() {
        let rule = ResourceRule::new().forbid("authorized_gae_applications");
        assert!(rule.apply(&config(json!({}))).is_empty());
        assert!(!rule.has_required());

        let findings = rule.apply(&config(json!({ "authorized_gae_applications": ["app"] })));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "authorized_gae_applications");
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let rule = ResourceRule::new().require("delete_default_routes_on_create", Constraint::equals(true));
        assert_eq!(rule.extra_fields(), ExtraFields::Ignore);

        let findings = rule.apply(&config(json!({
            "delete_default_routes_on_create": true,
            "foo": "bar",
        })));
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_all_fields_checked_without_short_circuit() {
        let rule = ResourceRule::new()
            .require("a", Constraint::equals(true))
            .require("b", Constraint::equals(true));

        let findings = rule.apply(&config(json!({ "a": false, "b": false })));
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let rule = ResourceRule::new()
            .require("a", Constraint::equals(true))
            .require("labels", Constraint::nested(ResourceRule::new().require("env", Constraint::any())));
        let cfg = config(json!({ "a": 3, "labels": { "product": "x" } }));

        assert_eq!(rule.apply(&cfg), rule.apply(&cfg));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty_sets() {
        let dup = ResourceRule::new()
            .require("a", Constraint::any())
            .require("a", Constraint::any());
        let err = dup.validate("kind").unwrap_err();
        assert!(err.to_string().contains("kind.a"), "{err}");

        let empty = ResourceRule::new().require(
            "settings",
            Constraint::nested(ResourceRule::new().require("tier", Constraint::one_of(Vec::<Value>::new()))),
        );
        let err = empty.validate("kind").unwrap_err();
        assert!(err.to_string().contains("kind.settings.tier"), "{err}");
    }
}
