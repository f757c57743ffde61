//! Single-field constraints.
//!
//! A `Constraint` is one check applied to one field value: an exact match, a
//! membership test, a length floor, an anchored regex, a type test, a named
//! predicate, a prohibition, or a nested sub-rule.  Every constraint fails
//! independently and deterministically; checking never panics on unexpected
//! value shapes, it reports a type mismatch instead.

use std::{fmt, sync::Arc};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use plangate_contracts::error::{PlangateError, PlangateResult};

use crate::rule::ResourceRule;

/// A caller-supplied check over a field value.
///
/// Returns `Ok(())` when the value is acceptable, or `Err(message)` with a
/// human-readable explanation.  The message is reported verbatim.
pub type PredicateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// The JSON value types a `Type` constraint can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    /// The type of `value`, or `None` for JSON `null`.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(Self::Boolean),
            Value::Number(_) => Some(Self::Number),
            Value::String(_) => Some(Self::String),
            Value::Array(_) => Some(Self::Array),
            Value::Object(_) => Some(Self::Object),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "list",
            Self::Object => "map",
        };
        f.write_str(name)
    }
}

fn type_name(value: &Value) -> String {
    ValueType::of(value).map_or_else(|| "null".to_string(), |t| t.to_string())
}

/// A named predicate function.
///
/// The name identifies the predicate in policy files and in `plangate policy`
/// output; it plays no part in evaluation.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    func: PredicateFn,
}

impl Predicate {
    pub fn new(name: impl Into<String>, func: PredicateFn) -> Self {
        Self { name: name.into(), func }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, value: &Value) -> Result<(), String> {
        (self.func)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish_non_exhaustive()
    }
}

/// An anchored regular expression plus the source it was written as.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` so that it must match the whole value.
    pub fn new(source: &str) -> PlangateResult<Self> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            PlangateError::InvalidPolicy {
                reason: format!("invalid pattern '{source}': {e}"),
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

/// The check a `Constraint` performs.  Exactly one is active per constraint.
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    /// Any value is accepted; only presence matters.
    Any,
    /// The value must have the given JSON type.
    Type(ValueType),
    /// The value must equal this value exactly.
    ExactValue(Value),
    /// The value must be a member of this set.
    OneOf(Vec<Value>),
    /// A string, list or map must have at least this many elements.
    MinLength(usize),
    /// A string must match the anchored pattern.
    Pattern(Pattern),
    /// Arbitrary logic; the predicate's message is reported unchanged.
    Predicate(Predicate),
    /// The field must not be set at all.
    Forbidden,
    /// The value (a map, or every element of a list of maps) must satisfy a sub-rule.
    Nested(ResourceRule),
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any value"),
            Self::Type(t) => write!(f, "a {t}"),
            Self::ExactValue(v) => write!(f, "equal to {v}"),
            Self::OneOf(set) => write!(f, "one of {}", render_set(set)),
            Self::MinLength(n) => write!(f, "length of at least {n}"),
            Self::Pattern(p) => write!(f, "matching /{}/", p.source()),
            Self::Predicate(p) => write!(f, "accepted by {}", p.name()),
            Self::Forbidden => f.write_str("forbidden"),
            Self::Nested(rule) => write!(f, "a block with {} declared field(s)", rule.fields().len()),
        }
    }
}

fn render_set(set: &[Value]) -> String {
    let items: Vec<String> = set.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// One problem found while checking a value, before it is tied to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Dotted path of the offending field relative to the resource root.
    pub path: String,
    pub message: String,
}

impl Finding {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A check on a single field, with an optional custom failure message.
#[derive(Debug, Clone)]
pub struct Constraint {
    kind: ConstraintKind,
    message: Option<String>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self { kind, message: None }
    }

    pub fn any() -> Self {
        Self::new(ConstraintKind::Any)
    }

    pub fn of_type(value_type: ValueType) -> Self {
        Self::new(ConstraintKind::Type(value_type))
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Self::new(ConstraintKind::ExactValue(value.into()))
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(ConstraintKind::OneOf(values.into_iter().map(Into::into).collect()))
    }

    pub fn min_length(n: usize) -> Self {
        Self::new(ConstraintKind::MinLength(n))
    }

    /// Anchored regex constraint.  A pattern that does not compile is a
    /// policy authoring error.
    pub fn pattern(source: &str) -> PlangateResult<Self> {
        Ok(Self::new(ConstraintKind::Pattern(Pattern::new(source)?)))
    }

    pub fn predicate<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::new(ConstraintKind::Predicate(Predicate::new(name, Arc::new(func))))
    }

    pub fn forbidden() -> Self {
        Self::new(ConstraintKind::Forbidden)
    }

    pub fn nested(rule: ResourceRule) -> Self {
        Self::new(ConstraintKind::Nested(rule))
    }

    /// Replace the generated failure message.
    ///
    /// Predicates report their own message and ignore this.  For `Nested`
    /// constraints it only replaces the messages about the block itself
    /// (wrong type, empty list), not those of the sub-rule's fields.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self.kind, ConstraintKind::Forbidden)
    }

    /// Check a field value.
    ///
    /// `path` is the field's full dotted path and is used for the findings'
    /// paths and for nested sub-paths.  `value` is `None` when the field is
    /// absent.  Returns an empty vector on pass.
    pub fn check(&self, path: &str, value: Option<&Value>) -> Vec<Finding> {
        let Some(value) = value else {
            return self.check_absent(path);
        };

        let outcome: Result<(), String> = match &self.kind {
            ConstraintKind::Any => Ok(()),

            ConstraintKind::Type(expected) => {
                if ValueType::of(value) == Some(*expected) {
                    Ok(())
                } else {
                    Err(format!("field must be a {expected}, got {}", type_name(value)))
                }
            }

            ConstraintKind::ExactValue(expected) => {
                if value == expected {
                    Ok(())
                } else {
                    Err(format!("field must equal {expected} (got {value})"))
                }
            }

            ConstraintKind::OneOf(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(format!(
                        "field must be one of {} (got {value})",
                        render_set(allowed)
                    ))
                }
            }

            ConstraintKind::MinLength(min) => match length_of(value) {
                Some(len) if len >= *min => Ok(()),
                Some(len) => Err(format!("field must have length of at least {min} (got {len})")),
                None => Err(format!(
                    "field has no length: expected a string, list or map, got {}",
                    type_name(value)
                )),
            },

            ConstraintKind::Pattern(pattern) => match value.as_str() {
                Some(s) if pattern.is_match(s) => Ok(()),
                Some(s) => Err(format!(
                    "field value '{s}' does not match the expected format /{}/",
                    pattern.source()
                )),
                None => Err(format!(
                    "field must be a string matching /{}/, got {}",
                    pattern.source(),
                    type_name(value)
                )),
            },

            // Predicate messages are reported as written.
            ConstraintKind::Predicate(predicate) => {
                return match predicate.call(value) {
                    Ok(()) => vec![],
                    Err(message) => vec![Finding::new(path, message)],
                };
            }

            ConstraintKind::Forbidden => Err("forbidden field".to_string()),

            ConstraintKind::Nested(rule) => return self.check_nested(rule, path, value),
        };

        match outcome {
            Ok(()) => vec![],
            Err(generated) => vec![self.finding(path, generated)],
        }
    }

    fn check_absent(&self, path: &str) -> Vec<Finding> {
        match &self.kind {
            ConstraintKind::Forbidden => vec![],
            ConstraintKind::Nested(rule) if !rule.has_required() => vec![],
            // Never replaced by the custom message.
            _ => vec![Finding::new(path, format!("missing required field {}", leaf(path)))],
        }
    }

    fn check_nested(&self, rule: &ResourceRule, path: &str, value: &Value) -> Vec<Finding> {
        match value {
            Value::Object(map) => rule.apply_at(path, map),

            // Terraform writes an omitted block as an empty list.
            Value::Array(items) if items.is_empty() => {
                if rule.has_required() {
                    vec![self.finding(path, format!("missing required block {}", leaf(path)))]
                } else {
                    vec![]
                }
            }

            Value::Array(items) => items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| {
                    let element_path = format!("{path}[{i}]");
                    match item {
                        Value::Object(map) => rule.apply_at(&element_path, map),
                        other => vec![self.finding(
                            &element_path,
                            format!("block element must be a map, got {}", type_name(other)),
                        )],
                    }
                })
                .collect(),

            other => vec![self.finding(
                path,
                format!("field must be a map or list of maps, got {}", type_name(other)),
            )],
        }
    }

    fn finding(&self, path: &str, generated: String) -> Finding {
        Finding::new(path, self.message.clone().unwrap_or(generated))
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

/// The last segment of a dotted path, without any list index.
fn leaf(path: &str) -> &str {
    let last = path.rsplit('.').next().unwrap_or(path);
    last.split('[').next().unwrap_or(last)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
