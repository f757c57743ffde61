//! Core trait definitions for the plangate evaluation pipeline.
//!
//! The pipeline has one trusted seam:
//!
//! - `PolicyEngine`: given one resource change, report every way it violates
//!   the active policy.
//!
//! The aggregator drives an engine over a whole plan.  Engines never see more
//! than one resource at a time and carry no state between calls, so the same
//! engine may be shared across worker threads.

use plangate_contracts::{change::ResourceChange, report::Violation};

/// The evaluator: checks a single resource against the policy.
///
/// Implementations must be deterministic and side-effect free.  Evaluating
/// the same change twice must yield identical violation lists.  Malformed
/// values inside a resource are reported as violations; an engine never fails
/// the whole run because of one resource.
pub trait PolicyEngine: Send + Sync {
    /// Return every violation of `change`, in rule declaration order.
    ///
    /// An empty vector means the resource is compliant (or its kind is not
    /// policed at all).
    fn evaluate(&self, change: &ResourceChange) -> Vec<Violation>;
}
