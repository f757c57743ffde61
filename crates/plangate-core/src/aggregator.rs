//! The report aggregator: runs a `PolicyEngine` over every resource in a plan.
//!
//! Aggregation never stops at the first failing resource.  The value of a run
//! is the complete list of problems, so every change is evaluated and the
//! violations are concatenated in input order.

use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use plangate_contracts::{
    change::ResourceChange,
    report::{Report, Violation},
};

use crate::traits::PolicyEngine;

/// Drives one policy engine across a sequence of resource changes.
pub struct Aggregator {
    engine: Box<dyn PolicyEngine>,
}

impl Aggregator {
    /// Create an aggregator around the given engine.
    pub fn new(engine: Box<dyn PolicyEngine>) -> Self {
        Self { engine }
    }

    /// Evaluate every change sequentially and build the report.
    ///
    /// Violations appear in the order of `changes`, and within one change in
    /// the engine's rule order.
    pub fn run(&self, changes: &[ResourceChange]) -> Report {
        let violations = changes
            .iter()
            .flat_map(|change| self.evaluate_one(change))
            .collect();
        self.finish(changes.len(), violations)
    }

    /// Evaluate changes on a pool of `jobs` worker threads.
    ///
    /// Per-resource results are collected in input order, so the report is
    /// identical to the one `run` produces.  If the pool cannot be built the
    /// changes are evaluated sequentially.
    pub fn run_parallel(&self, changes: &[ResourceChange], jobs: usize) -> Report {
        if jobs <= 1 || changes.len() <= 1 {
            return self.run(changes);
        }

        let pool = match ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool,
            Err(e) => {
                warn!(jobs, error = %e, "failed to start worker pool; evaluating sequentially");
                return self.run(changes);
            }
        };
        debug!(jobs, resources = changes.len(), "evaluating in parallel");

        let per_change: Vec<Vec<Violation>> = pool.install(|| {
            changes
                .par_iter()
                .map(|change| self.evaluate_one(change))
                .collect()
        });

        self.finish(changes.len(), per_change.into_iter().flatten().collect())
    }

    fn evaluate_one(&self, change: &ResourceChange) -> Vec<Violation> {
        let violations = self.engine.evaluate(change);
        for v in &violations {
            warn!(
                kind = %v.resource_kind,
                name = %v.resource_name,
                field = %v.field_path,
                message = %v.message,
                "policy violation"
            );
        }
        violations
    }

    fn finish(&self, resources_checked: usize, violations: Vec<Violation>) -> Report {
        let report = Report::new(resources_checked, violations);
        info!(
            resources = report.resources_checked,
            violations = report.violations.len(),
            passed = report.passed,
            "policy check complete"
        );
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
