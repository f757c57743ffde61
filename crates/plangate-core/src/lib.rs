//! # plangate-core
//!
//! The evaluation pipeline for plangate.
//!
//! This crate provides:
//! - The `PolicyEngine` trait, the seam every rule engine implements
//! - The `Aggregator` that runs an engine over a whole plan and builds the
//!   `Report`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plangate_core::{Aggregator, traits::PolicyEngine};
//!
//! let report = Aggregator::new(Box::new(engine)).run(&changes);
//! ```

pub mod aggregator;
pub mod traits;

pub use aggregator::Aggregator;
