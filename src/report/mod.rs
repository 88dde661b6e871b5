//! Reporting utilities: fit summaries and formatted terminal output.

pub mod format;

pub use format::*;

use serde::Serialize;

use crate::domain::{EstimatorId, FitState, ModelId, NUM_PARAMS, PARAM_NAMES, RunConfig};
use crate::fit::FitOutput;
use crate::math::{mean, median_mut, std_dev};

/// Share of fits that ended in one state.
#[derive(Debug, Clone, Serialize)]
pub struct StateRatio {
    pub state: FitState,
    pub code: u8,
    pub count: usize,
    pub percent: f64,
}

/// Recovered-parameter statistics over converged fits.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSummary {
    pub name: &'static str,
    pub true_value: f64,
    pub median: Option<f64>,
    pub std: Option<f64>,
}

/// Aggregate view of one batched fit.
///
/// Converged-only statistics are `None` when no fit converged.
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub model: ModelId,
    pub estimator: EstimatorId,
    pub backend: String,
    pub number_fits: usize,
    pub fit_size: usize,
    pub number_converged: usize,
    pub mean_chi_square: Option<f64>,
    pub mean_iterations: Option<f64>,
    pub execution_time_s: f64,
    pub state_ratios: Vec<StateRatio>,
    pub parameters: Vec<ParameterSummary>,
}

pub fn summarize(output: &FitOutput, config: &RunConfig, backend: &str) -> FitSummary {
    let n = output.number_fits();
    let converged: Vec<usize> = (0..n)
        .filter(|&i| output.states[i] == FitState::Converged)
        .collect();

    let chi: Vec<f64> = converged.iter().map(|&i| output.chi_squares[i]).collect();
    let iters: Vec<f64> = converged
        .iter()
        .map(|&i| output.number_iterations[i] as f64)
        .collect();

    let state_ratios = FitState::ALL
        .iter()
        .map(|&state| {
            let count = output.states.iter().filter(|s| **s == state).count();
            let percent = if n == 0 { 0.0 } else { count as f64 / n as f64 * 100.0 };
            StateRatio {
                state,
                code: state.code(),
                count,
                percent,
            }
        })
        .collect();

    let truth = config.true_params.to_array();
    let parameters = (0..NUM_PARAMS)
        .map(|k| {
            let mut values: Vec<f64> = converged.iter().map(|&i| output.parameters[(i, k)]).collect();
            let std = std_dev(&values);
            ParameterSummary {
                name: PARAM_NAMES[k],
                true_value: truth[k],
                median: median_mut(&mut values),
                std,
            }
        })
        .collect();

    FitSummary {
        model: config.model,
        estimator: config.estimator,
        backend: backend.to_string(),
        number_fits: n,
        fit_size: config.number_points,
        number_converged: converged.len(),
        mean_chi_square: mean(&chi),
        mean_iterations: mean(&iters),
        execution_time_s: output.execution_time.as_secs_f64(),
        state_ratios,
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nalgebra::DMatrix;

    use super::*;
    use crate::app::preset_config;

    fn output() -> FitOutput {
        let states = vec![
            FitState::Converged,
            FitState::Converged,
            FitState::MaxIteration,
            FitState::SingularHessian,
            FitState::Converged,
            FitState::NegCurvatureMle,
            FitState::Converged,
        ];
        let n = states.len();
        // Converged fits carry x0 = 19, 20, 21, 22 and finite chi-squares.
        let x0 = [19.0, 20.0, 500.0, -3.0, 21.0, 0.0, 22.0];
        let parameters = DMatrix::from_fn(n, NUM_PARAMS, |i, k| if k == 0 { x0[i] } else { 1.0 });
        FitOutput {
            parameters,
            states,
            chi_squares: vec![1.0, 2.0, 1e9, 1e9, 3.0, f64::NAN, 6.0],
            number_iterations: vec![4, 6, 200, 1, 5, 0, 5],
            execution_time: Duration::from_millis(1500),
        }
    }

    #[test]
    fn converged_statistics_ignore_other_states() {
        let config = preset_config(ModelId::Hyperbola);
        let s = summarize(&output(), &config, "test");
        assert_eq!(s.number_fits, 7);
        assert_eq!(s.number_converged, 4);
        assert_eq!(s.mean_chi_square, Some(3.0));
        assert_eq!(s.mean_iterations, Some(5.0));
        assert_eq!(s.execution_time_s, 1.5);

        let x0 = &s.parameters[0];
        assert_eq!(x0.name, "x0");
        assert_eq!(x0.true_value, 20.0);
        assert_eq!(x0.median, Some(20.5));
        // Population std of {19, 20, 21, 22}.
        assert!((x0.std.unwrap() - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.parameters[1].std, Some(0.0));
    }

    #[test]
    fn state_ratios_cover_every_fit() {
        let config = preset_config(ModelId::Hyperbola);
        let s = summarize(&output(), &config, "test");
        let total: f64 = s.state_ratios.iter().map(|r| r.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        let counts: usize = s.state_ratios.iter().map(|r| r.count).sum();
        assert_eq!(counts, 7);
        assert_eq!(s.state_ratios[0].count, 4);
        assert_eq!(s.state_ratios[3].code, 3);
    }

    #[test]
    fn no_converged_fit_yields_absent_statistics() {
        let config = preset_config(ModelId::Hyperbola);
        let mut out = output();
        out.states.iter_mut().for_each(|s| *s = FitState::MaxIteration);
        let s = summarize(&out, &config, "test");
        assert_eq!(s.number_converged, 0);
        assert_eq!(s.mean_chi_square, None);
        assert!(s.parameters.iter().all(|p| p.median.is_none() && p.std.is_none()));
    }
}
