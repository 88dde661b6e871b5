//! Numerical utilities: damped linear solves and summary statistics.

pub mod solve;
pub mod stats;

pub use solve::*;
pub use stats::*;
