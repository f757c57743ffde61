//! Fatal error types for the plangate pipeline.
//!
//! Policy violations are NOT errors: they travel as `Violation` data through
//! the evaluator and aggregator.  The variants here are reserved for failures
//! that mean the checker itself cannot produce a trustworthy result, so the
//! caller can tell "the tool is broken" apart from "the change is non-compliant".

use thiserror::Error;

/// The unified error type for the plangate crates.
#[derive(Debug, Error)]
pub enum PlangateError {
    /// The plan document could not be read, is not JSON, or lacks the
    /// structure the loader expects.  No resources are evaluated.
    #[error("malformed plan document: {reason}")]
    MalformedPlan { reason: String },

    /// A policy was authored incorrectly (bad regex, empty allowed set,
    /// duplicate declaration, unknown predicate).  Surfaced when the catalog
    /// is built, never during evaluation.
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    /// A policy file could not be read or is not valid TOML.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The report could not be written in the requested format.
    #[error("failed to render report: {reason}")]
    RenderError { reason: String },
}

/// Convenience alias used throughout the plangate crates.
pub type PlangateResult<T> = Result<T, PlangateError>;
