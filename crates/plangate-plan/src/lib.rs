//! # plangate-plan
//!
//! Terraform JSON plan loading for plangate.
//!
//! This crate reads the output of `terraform show -json`, validates the parts
//! of its structure that plangate depends on, and extracts the resources the
//! plan would create or update as
//! [`ResourceChange`](plangate_contracts::change::ResourceChange)s.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use plangate_plan::load_plan_file;
//!
//! let changes = load_plan_file(Path::new("tfplan.json"))?;
//! ```

pub mod document;
pub mod loader;

pub use loader::{extract_changes, load_plan_file, load_plan_str, parse_plan_value};
