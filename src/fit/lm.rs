//! CPU Levenberg–Marquardt backend.
//!
//! Fits are independent, so the batch is split across the rayon pool and each
//! fit runs the classic damped Gauss–Newton loop:
//!
//! 1. linearize the objective at the current parameters
//! 2. solve `(H + λ·diag(H)) δ = g` and project `p + δ` onto the constraints
//! 3. accept the trial if chi-square decreased (λ shrinks), otherwise keep the
//!    current parameters (λ grows)
//! 4. stop once `|χ²_trial − χ²| < tolerance · max(1, χ²_trial)`

use std::time::Instant;

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{Constraint, FitState, NUM_PARAMS};
use crate::error::AppError;
use crate::fit::engine::{BatchFitter, FitOutput, FitRequest};
use crate::fit::estimator::FitProblem;
use crate::math::solve_damped;

/// Damping schedule.
#[derive(Debug, Clone, Copy)]
pub struct LmSettings {
    pub initial_lambda: f64,
    /// Multiplier applied to λ after an accepted step.
    pub lambda_decrease: f64,
    /// Multiplier applied to λ after a rejected step.
    pub lambda_increase: f64,
}

impl Default for LmSettings {
    fn default() -> Self {
        Self {
            initial_lambda: 1e-3,
            lambda_decrease: 0.1,
            lambda_increase: 10.0,
        }
    }
}

/// Result of a single fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleFit {
    pub params: [f64; NUM_PARAMS],
    pub state: FitState,
    pub chi_square: f64,
    pub iterations: usize,
}

/// Multi-threaded CPU backend.
#[derive(Debug, Clone, Default)]
pub struct CpuLmFitter {
    settings: LmSettings,
}

impl BatchFitter for CpuLmFitter {
    fn name(&self) -> &str {
        "cpu-lm"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("{} (rayon, {} threads)", self.name(), rayon::current_num_threads())
    }

    fn fit(&self, request: &FitRequest<'_>) -> Result<FitOutput, AppError> {
        let layout = request.validate()?;
        let fits = request.number_fits();
        let free = [Constraint::Free; NUM_PARAMS];
        let constraints = request.constraints.unwrap_or(&free);

        info!(
            backend = self.name(),
            model = %request.model,
            estimator = request.estimator.display_name(),
            fits,
            points = request.number_points(),
            "starting batched fit"
        );
        let start = Instant::now();

        let results: Vec<SingleFit> = (0..fits)
            .into_par_iter()
            .map(|i| {
                let problem = FitProblem {
                    model: request.model,
                    estimator: request.estimator,
                    data: request.data.row(i).iter().copied().collect(),
                    weights: request.weights.map(|w| w.row(i).iter().copied().collect()),
                    user_info: request.fit_user_info(layout, i),
                };
                let mut init = [0.0; NUM_PARAMS];
                for (k, v) in init.iter_mut().enumerate() {
                    *v = request.initial_parameters[(i, k)];
                }
                fit_single(
                    &problem,
                    init,
                    request.tolerance,
                    request.max_iterations,
                    constraints,
                    &self.settings,
                )
            })
            .collect();

        let execution_time = start.elapsed();
        let mut parameters = DMatrix::zeros(fits, NUM_PARAMS);
        let mut states = Vec::with_capacity(fits);
        let mut chi_squares = Vec::with_capacity(fits);
        let mut number_iterations = Vec::with_capacity(fits);
        for (i, r) in results.into_iter().enumerate() {
            for (k, v) in r.params.iter().enumerate() {
                parameters[(i, k)] = *v;
            }
            states.push(r.state);
            chi_squares.push(r.chi_square);
            number_iterations.push(r.iterations);
        }

        info!(elapsed_ms = execution_time.as_millis() as u64, "batched fit finished");
        Ok(FitOutput {
            parameters,
            states,
            chi_squares,
            number_iterations,
            execution_time,
        })
    }
}

/// Run Levenberg–Marquardt on one fit.
pub fn fit_single(
    problem: &FitProblem<'_>,
    initial: [f64; NUM_PARAMS],
    tolerance: f64,
    max_iterations: usize,
    constraints: &[Constraint],
    settings: &LmSettings,
) -> SingleFit {
    let mut params = project(initial, constraints);
    let mut lin = match problem.linearize(&params) {
        Ok(lin) => lin,
        Err(state) => {
            return SingleFit {
                params,
                state,
                chi_square: f64::NAN,
                iterations: 0,
            };
        }
    };
    let mut lambda = settings.initial_lambda;

    for iteration in 1..=max_iterations {
        let stop = |state: FitState, chi_square: f64, params: [f64; NUM_PARAMS]| SingleFit {
            params,
            state,
            chi_square,
            iterations: iteration,
        };

        let Some(delta) = solve_damped(&lin.hessian, &lin.gradient, lambda) else {
            return stop(FitState::SingularHessian, lin.chi_square, params);
        };

        let mut trial = params;
        for (k, p) in trial.iter_mut().enumerate() {
            *p += delta[k];
        }
        let trial = project(trial, constraints);

        let Some(trial_chi) = problem.chi_square(&trial).filter(|c| c.is_finite()) else {
            // The step left the region where the objective is defined.
            lambda *= settings.lambda_increase;
            continue;
        };

        let converged = (trial_chi - lin.chi_square).abs() < tolerance * trial_chi.max(1.0);
        if trial_chi < lin.chi_square {
            params = trial;
            lin = match problem.linearize(&params) {
                Ok(lin) => lin,
                Err(state) => return stop(state, trial_chi, params),
            };
            lambda *= settings.lambda_decrease;
        } else {
            lambda *= settings.lambda_increase;
        }

        if converged {
            return stop(FitState::Converged, lin.chi_square, params);
        }
    }

    debug!(chi_square = lin.chi_square, "fit hit the iteration limit");
    SingleFit {
        params,
        state: FitState::MaxIteration,
        chi_square: lin.chi_square,
        iterations: max_iterations,
    }
}

fn project(mut params: [f64; NUM_PARAMS], constraints: &[Constraint]) -> [f64; NUM_PARAMS] {
    for (p, c) in params.iter_mut().zip(constraints) {
        *p = c.project(*p);
    }
    params
}
