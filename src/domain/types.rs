//! Shared domain types.
//!
//! These are the vocabulary of the whole pipeline:
//!
//! - model and estimator identifiers (`ModelId`, `EstimatorId`)
//! - per-fit termination states (`FitState`)
//! - the five hyperbola parameters (`HyperbolaParams`)
//! - the resolved run configuration (`RunConfig`)

use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

/// Number of free parameters of every hyperbola model: `(x0, y0, z0, t0, v)`.
pub const NUM_PARAMS: usize = 5;

/// Parameter labels in vector order.
pub const PARAM_NAMES: [&str; NUM_PARAMS] = ["x0", "y0", "z0", "t0", "v"];

/// Forward model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelId {
    /// Squared travel time from a point source at a single velocity.
    Hyperbola,
    /// Like `Hyperbola`, blending P and S velocities by a per-point phase flag.
    HyperbolaPs,
}

impl ModelId {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelId::Hyperbola => "HYPERBOLA",
            ModelId::HyperbolaPs => "HYPERBOLA_PS",
        }
    }

    /// Number of user-info values consumed per data point.
    pub fn fields_per_point(self) -> usize {
        match self {
            ModelId::Hyperbola => 3,
            ModelId::HyperbolaPs => 4,
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Objective minimized by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorId {
    /// Least squares (Gaussian noise).
    Lse,
    /// Maximum likelihood for Poisson-distributed data.
    Mle,
}

impl EstimatorId {
    pub fn display_name(self) -> &'static str {
        match self {
            EstimatorId::Lse => "LSE",
            EstimatorId::Mle => "MLE",
        }
    }
}

/// How the solver terminated a single fit.
///
/// The numeric codes are part of the external contract and appear in exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitState {
    Converged,
    MaxIteration,
    SingularHessian,
    NegCurvatureMle,
}

impl FitState {
    pub const ALL: [FitState; 4] = [
        FitState::Converged,
        FitState::MaxIteration,
        FitState::SingularHessian,
        FitState::NegCurvatureMle,
    ];

    pub fn code(self) -> u8 {
        match self {
            FitState::Converged => 0,
            FitState::MaxIteration => 1,
            FitState::SingularHessian => 2,
            FitState::NegCurvatureMle => 3,
        }
    }

    /// Label used in the console ratio table.
    pub fn ratio_label(self) -> &'static str {
        match self {
            FitState::Converged => "converged",
            FitState::MaxIteration => "max it. exceeded",
            FitState::SingularHessian => "singular hessian",
            FitState::NegCurvatureMle => "neg curvature MLE",
        }
    }
}

/// Source location, onset time and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HyperbolaParams {
    pub x0: f64,
    pub y0: f64,
    pub z0: f64,
    pub t0: f64,
    pub v: f64,
}

impl HyperbolaParams {
    pub const fn new(x0: f64, y0: f64, z0: f64, t0: f64, v: f64) -> Self {
        Self { x0, y0, z0, t0, v }
    }

    pub fn to_array(self) -> [f64; NUM_PARAMS] {
        [self.x0, self.y0, self.z0, self.t0, self.v]
    }
}

/// Closed sampling interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max > self.min
    }
}

/// Per-parameter bounds for random initial guesses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuessBounds {
    pub x0: Bounds,
    pub y0: Bounds,
    pub z0: Bounds,
    pub t0: Bounds,
    pub v: Bounds,
}

impl GuessBounds {
    pub fn to_array(self) -> [Bounds; NUM_PARAMS] {
        [self.x0, self.y0, self.z0, self.t0, self.v]
    }
}

impl Default for GuessBounds {
    fn default() -> Self {
        Self {
            x0: Bounds::new(40.0, 60.0),
            y0: Bounds::new(40.0, 60.0),
            z0: Bounds::new(10.0, 30.0),
            t0: Bounds::new(5.0, 15.0),
            v: Bounds::new(5.0, 7.5),
        }
    }
}

/// Receiver sampling region for the synthetic geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeometryRange {
    pub x: Bounds,
    pub y: Bounds,
    pub z: Bounds,
}

impl Default for GeometryRange {
    fn default() -> Self {
        Self {
            x: Bounds::new(-90.0, 90.0),
            y: Bounds::new(-90.0, 90.0),
            z: Bounds::new(0.0, 1.0),
        }
    }
}

/// Per-parameter box constraint applied by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Constraint {
    Free,
    Lower(f64),
    Upper(f64),
    LowerUpper(f64, f64),
}

impl Constraint {
    /// Project `value` onto the admissible interval.
    pub fn project(self, value: f64) -> f64 {
        match self {
            Constraint::Free => value,
            Constraint::Lower(lo) => value.max(lo),
            Constraint::Upper(hi) => value.min(hi),
            Constraint::LowerUpper(lo, hi) => value.clamp(lo, hi),
        }
    }

    pub fn is_valid(self) -> bool {
        match self {
            Constraint::Free => true,
            Constraint::Lower(b) | Constraint::Upper(b) => b.is_finite(),
            Constraint::LowerUpper(lo, hi) => lo.is_finite() && hi.is_finite() && lo <= hi,
        }
    }
}

/// Fully resolved configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: ModelId,
    pub estimator: EstimatorId,
    pub number_fits: usize,
    pub number_points: usize,
    pub true_params: HyperbolaParams,
    pub guess_params: HyperbolaParams,
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Standard deviation of additive Gaussian noise; `None` means noiseless.
    pub noise_sigma: Option<f64>,
    pub seed: u64,
    /// Draw per-fit initial guesses from `guess_bounds` instead of tiling `guess_params`.
    pub random_guesses: bool,
    pub guess_bounds: GuessBounds,
    pub geometry: GeometryRange,
    pub export_fits: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
}
