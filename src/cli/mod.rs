//! Command-line parsing for the hyperbola batch-fit demo.
//!
//! Argument parsing and command dispatch are kept separate from the
//! modeling/fitting code. Every option is optional: unset values fall back to
//! the preset of the selected model (see `app::preset_config`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::EstimatorId;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "hyperfit",
    version,
    about = "Batched fitting of seismic travel-time hyperbolas on synthetic data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands, one per forward model.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit HYPERBOLA (single velocity). Preset: 1,000,000 fits of 10 noisy points, MLE.
    Hyperbola(FitArgs),
    /// Fit HYPERBOLA_PS (P/S phase blend). Preset: 10,000 fits of 7 noiseless points, LSE.
    HyperbolaPs(FitArgs),
}

/// Options shared by both models.
#[derive(Debug, Parser, Clone, Default)]
pub struct FitArgs {
    /// Number of independent fits.
    #[arg(short = 'n', long)]
    pub fits: Option<usize>,

    /// Number of receivers (data points) per fit.
    #[arg(short = 'p', long)]
    pub points: Option<usize>,

    /// Estimator (lse or mle).
    #[arg(short = 'e', long, value_enum)]
    pub estimator: Option<EstimatorId>,

    /// Convergence tolerance on the relative chi-square change.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Maximum number of solver iterations per fit.
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Standard deviation of additive Gaussian noise on each observation.
    #[arg(long, value_name = "SIGMA", conflicts_with = "no_noise")]
    pub noise: Option<f64>,

    /// Generate noiseless observations.
    #[arg(long)]
    pub no_noise: bool,

    /// Random seed for geometry, noise and random guesses.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Draw each fit's initial guess from the preset bounds instead of tiling one guess.
    #[arg(long)]
    pub random_guesses: bool,

    /// Export per-fit results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the run summary to JSON.
    #[arg(long = "export-summary", value_name = "JSON")]
    pub export_summary: Option<PathBuf>,
}
