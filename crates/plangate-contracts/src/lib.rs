//! # plangate-contracts
//!
//! Shared types and errors for the plangate policy checker.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions and error types.

pub mod change;
pub mod error;
pub mod report;
