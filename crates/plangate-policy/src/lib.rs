//! # plangate-policy
//!
//! The declarative rule engine behind plangate.
//!
//! ## Overview
//!
//! - [`Constraint`]: one check on one field (exact value, allowed set,
//!   minimum length, anchored regex, type, predicate, prohibition, nested rule).
//! - [`ResourceRule`]: the ordered field constraints for one resource kind.
//!   Declared fields are required unless marked optional; undeclared fields
//!   are ignored.
//! - [`PolicyCatalog`]: resource kind → rule, or "kind forbidden".  Kinds it
//!   does not list pass unchecked.
//! - [`CatalogEngine`]: implements
//!   [`PolicyEngine`](plangate_core::traits::PolicyEngine) over a catalog.
//!
//! Catalogs are built in code with [`PolicyCatalog::builder`] or loaded from
//! a TOML file (see [`file`]).  Both paths validate the policy when the
//! catalog is built, never during evaluation.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use plangate_policy::{CatalogEngine, Constraint, PolicyCatalog, ResourceRule};
//!
//! let catalog = PolicyCatalog::builder()
//!     .rule("google_compute_firewall", ResourceRule::new().require("enable_logging", Constraint::equals(true)))
//!     .forbid("google_healthcare_dataset")
//!     .build()?;
//! let engine = CatalogEngine::new(catalog);
//! ```

pub mod catalog;
pub mod constraint;
pub mod engine;
pub mod file;
pub mod rule;

pub use catalog::{CatalogEntry, PolicyCatalog, Resolution};
pub use constraint::{Constraint, ConstraintKind, Finding, PredicateFn, ValueType};
pub use engine::CatalogEngine;
pub use file::{PolicyFile, PredicateRegistry};
pub use rule::{ExtraFields, FieldRule, Requiredness, ResourceRule};
