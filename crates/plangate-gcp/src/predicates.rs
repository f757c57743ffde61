//! Custom checks that the built-in Google Cloud policy plugs in as predicates.

use std::sync::Arc;

use serde_json::Value;

use plangate_contracts::error::PlangateResult;
use plangate_policy::{constraint::Pattern, PredicateRegistry};

/// Longest project ID Google Cloud accepts.
pub const MAX_PROJECT_ID_LEN: usize = 30;

/// Project IDs are four dash-separated lowercase alphanumeric groups,
/// e.g. `acme-payments-prod-01`.
pub const PROJECT_ID_FORMAT: &str = r"[a-z0-9]*-[a-z0-9]*-[a-z0-9]*-[a-z0-9]*";

/// Longest accepted KMS key rotation period.
pub const MAX_ROTATION_SECS: u64 = 90 * 24 * 60 * 60;

/// Registry name of [`project_id`].
pub const PROJECT_ID: &str = "gcp_project_id";

/// Registry name of [`rotation_period`].
pub const ROTATION_PERIOD: &str = "kms_rotation_within_90_days";

/// Build the project ID check.  Fails only if the format regex is broken.
pub fn project_id() -> PlangateResult<impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static> {
    let format = Pattern::new(PROJECT_ID_FORMAT)?;
    Ok(move |value: &Value| {
        let id = value
            .as_str()
            .ok_or_else(|| "Project ID must be a string".to_string())?;
        if id.chars().count() > MAX_PROJECT_ID_LEN {
            return Err(format!("Project ID '{id}' is longer than {MAX_PROJECT_ID_LEN} characters"));
        }
        if !format.is_match(id) {
            return Err(format!(
                "Project ID '{id}' must be four dash-separated lowercase alphanumeric groups"
            ));
        }
        Ok(())
    })
}

/// Check that a KMS rotation period does not exceed 90 days.
///
/// Terraform writes the period as a duration string (`"7776000s"`); bare
/// numbers of seconds are accepted too.  Anything that is not a finite,
/// non-negative number of seconds is rejected.
pub fn rotation_period(value: &Value) -> Result<(), String> {
    let seconds = match value {
        Value::Number(n) => n.as_u64().map(|secs| (secs, false)).or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| (f.trunc() as u64, f.fract() > 0.0))
        }),
        Value::String(s) => parse_seconds(s.strip_suffix('s').unwrap_or(s)),
        _ => None,
    }
    .ok_or_else(|| format!("rotation_period must be a duration in seconds such as \"7776000s\" (got {value})"))?;

    match seconds {
        (whole, fraction) if whole > MAX_ROTATION_SECS || (whole == MAX_ROTATION_SECS && fraction) => {
            Err(format!(
                "Rotation period must be less than 90 days ({MAX_ROTATION_SECS}s), got {value}"
            ))
        }
        _ => Ok(()),
    }
}

/// Split `"<digits>[.<digits>]"` into whole seconds and whether a non-zero
/// fraction follows.
fn parse_seconds(s: &str) -> Option<(u64, bool)> {
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits(whole) || !digits(fraction) {
        return None;
    }
    let whole = whole.parse::<u64>().ok()?;
    Some((whole, fraction.bytes().any(|b| b != b'0')))
}

/// Every predicate the built-in policy uses, for TOML policies to reference.
pub fn registry() -> PlangateResult<PredicateRegistry> {
    let mut registry = PredicateRegistry::new();
    registry.register(PROJECT_ID, Arc::new(project_id()?));
    registry.register(ROTATION_PERIOD, Arc::new(rotation_period));
    Ok(registry)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
