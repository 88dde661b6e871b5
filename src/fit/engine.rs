//! The batched fitting call.
//!
//! A backend takes every fit of a run at once and returns one result per fit,
//! in input order. Per-fit failures are reported as `FitState`s; only
//! malformed requests are errors.

use std::time::Duration;

use nalgebra::DMatrix;

use crate::domain::{Constraint, EstimatorId, FitState, ModelId, NUM_PARAMS};
use crate::error::AppError;

/// Inputs of one batched fit.
#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    /// Observations, `number_fits x number_points`.
    pub data: &'a DMatrix<f64>,
    /// Optional per-observation weights (LSE only), same shape as `data`.
    pub weights: Option<&'a DMatrix<f64>>,
    pub model: ModelId,
    /// Starting point of every fit, `number_fits x NUM_PARAMS`.
    pub initial_parameters: &'a DMatrix<f64>,
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Optional per-parameter box constraints (`NUM_PARAMS` entries).
    pub constraints: Option<&'a [Constraint]>,
    pub estimator: EstimatorId,
    /// Flattened geometry; see `UserInfoLayout`.
    pub user_info: &'a [f64],
}

/// How `FitRequest::user_info` maps onto fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInfoLayout {
    /// One geometry block reused by every fit.
    Shared,
    /// One geometry block per fit, stored fit after fit.
    PerFit,
}

impl FitRequest<'_> {
    pub fn number_fits(&self) -> usize {
        self.data.nrows()
    }

    pub fn number_points(&self) -> usize {
        self.data.ncols()
    }

    /// Check shapes and scalar settings, and resolve the user-info layout.
    pub fn validate(&self) -> Result<UserInfoLayout, AppError> {
        let (fits, points) = self.data.shape();
        if fits == 0 || points == 0 {
            return Err(AppError::new(AppError::EMPTY_DATA, "Fit request holds no data."));
        }
        if self.initial_parameters.shape() != (fits, NUM_PARAMS) {
            return Err(AppError::invalid_input(format!(
                "Initial parameters must be {fits}x{NUM_PARAMS}, got {}x{}.",
                self.initial_parameters.nrows(),
                self.initial_parameters.ncols()
            )));
        }
        if let Some(w) = self.weights {
            if w.shape() != (fits, points) {
                return Err(AppError::invalid_input("Weights must have the same shape as the data."));
            }
            if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(AppError::invalid_input("Weights must be finite and >= 0."));
            }
        }
        if let Some(c) = self.constraints {
            if c.len() != NUM_PARAMS {
                return Err(AppError::invalid_input(format!(
                    "Expected {NUM_PARAMS} constraints, got {}.",
                    c.len()
                )));
            }
            if c.iter().any(|c| !c.is_valid()) {
                return Err(AppError::invalid_input("Invalid parameter constraint."));
            }
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(AppError::invalid_input("Tolerance must be finite and > 0."));
        }
        if self.max_iterations == 0 {
            return Err(AppError::invalid_input("Max iterations must be > 0."));
        }

        let block = points * self.model.fields_per_point();
        if self.user_info.len() == block * fits {
            Ok(UserInfoLayout::PerFit)
        } else if self.user_info.len() == block {
            Ok(UserInfoLayout::Shared)
        } else {
            Err(AppError::invalid_input(format!(
                "User info holds {} values; {} expects {block} (shared) or {} (per fit).",
                self.user_info.len(),
                self.model,
                block * fits
            )))
        }
    }

    /// User info of fit `fit` under `layout`.
    pub fn fit_user_info(&self, layout: UserInfoLayout, fit: usize) -> &[f64] {
        let block = self.number_points() * self.model.fields_per_point();
        match layout {
            UserInfoLayout::Shared => &self.user_info[..block],
            UserInfoLayout::PerFit => &self.user_info[fit * block..(fit + 1) * block],
        }
    }
}

/// Outputs of one batched fit, indexed by fit.
#[derive(Debug, Clone)]
pub struct FitOutput {
    /// `number_fits x NUM_PARAMS`.
    pub parameters: DMatrix<f64>,
    pub states: Vec<FitState>,
    pub chi_squares: Vec<f64>,
    pub number_iterations: Vec<usize>,
    pub execution_time: Duration,
}

impl FitOutput {
    pub fn number_fits(&self) -> usize {
        self.states.len()
    }
}

/// A batched nonlinear least-squares / maximum-likelihood fitter.
pub trait BatchFitter: Sync {
    /// Short identifier printed in reports.
    fn name(&self) -> &str;

    /// Whether the backend can run on this machine.
    fn is_available(&self) -> bool;

    /// Human-readable description of the execution resources.
    fn describe(&self) -> String {
        self.name().to_string()
    }

    fn fit(&self, request: &FitRequest<'_>) -> Result<FitOutput, AppError>;
}
