//! Batched curve fitting.
//!
//! Responsibilities:
//!
//! - define the batched fitting call (`BatchFitter`, `FitRequest`, `FitOutput`)
//! - estimator objectives and their quadratic models
//! - the CPU Levenberg–Marquardt backend (parallel over fits)

pub mod engine;
pub mod estimator;
pub mod lm;

pub use engine::*;
pub use estimator::*;
pub use lm::*;
