//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model / estimator identifiers and the fit-state taxonomy
//! - the hyperbola parameter vector and sampling bounds
//! - the resolved run configuration (`RunConfig`)

pub mod types;

pub use types::*;
