//! `seis-hyperfit` library crate.
//!
//! Batched fitting of seismic travel-time hyperbolas on synthetic data. The
//! binary (`hyperfit`) is a thin wrapper around this library so that:
//!
//! - the forward models, dataset builder and solver are testable without
//!   spawning processes
//! - other front-ends can reuse the pipeline and plug in their own
//!   `fit::BatchFitter` backend

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
