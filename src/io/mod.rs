//! File output.
//!
//! - `export`: per-fit CSV and summary JSON

pub mod export;

pub use export::*;
