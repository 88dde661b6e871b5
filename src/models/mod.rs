//! Seismic travel-time forward models.
//!
//! Models are implemented as small, pure functions so that the dataset
//! builder and the solver can share them.

pub mod model;

pub use model::*;
