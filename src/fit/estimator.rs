//! Objective functions and their local quadratic models.
//!
//! For both estimators the solver needs, at the current parameters:
//! - the objective value (chi-square)
//! - the descent direction `g`
//! - the Gauss–Newton Hessian `H`
//!
//! Each data point contributes `g += a·J` and `H += b·J·Jᵀ`, where `J` is the
//! model Jacobian row at that point and `(a, b)` depend on the estimator:
//!
//! ```text
//! LSE: χ² = Σ w (d − f)²                      a = w (d − f)    b = w
//! MLE: χ² = 2 Σ (f − d) − 2 Σ_{d>0} d ln(f/d)  a = d/f − 1      b = d/f²
//! ```
//!
//! MLE is only defined for `f > 0` and `d >= 0`. A zero datum contributes
//! `2f`, which the general `(a, b)` already reproduce (`a = −1`, `b = 0`).

use crate::domain::{EstimatorId, FitState, ModelId, NUM_PARAMS};
use crate::math::{Hessian, ParamVector};
use crate::models::{evaluate, evaluate_with_jacobian};

/// One fit's observations and geometry.
#[derive(Debug, Clone)]
pub struct FitProblem<'a> {
    pub model: ModelId,
    pub estimator: EstimatorId,
    pub data: Vec<f64>,
    /// Per-point weights; ignored by MLE.
    pub weights: Option<Vec<f64>>,
    /// Point-major user info of this fit.
    pub user_info: &'a [f64],
}

/// Objective value and quadratic model at a parameter vector.
#[derive(Debug, Clone)]
pub struct Linearization {
    pub chi_square: f64,
    pub gradient: ParamVector,
    pub hessian: Hessian,
}

impl FitProblem<'_> {
    fn point(&self, j: usize) -> &[f64] {
        let fields = self.model.fields_per_point();
        &self.user_info[j * fields..(j + 1) * fields]
    }

    fn weight(&self, j: usize) -> f64 {
        match (&self.weights, self.estimator) {
            (Some(w), EstimatorId::Lse) => w[j],
            _ => 1.0,
        }
    }

    /// Objective at `params`; `None` when MLE meets a non-positive model value
    /// or a negative observation.
    pub fn chi_square(&self, params: &[f64; NUM_PARAMS]) -> Option<f64> {
        let mut chi = 0.0;
        for (j, &d) in self.data.iter().enumerate() {
            let f = evaluate(self.model, self.point(j), params);
            chi += point_chi_square(self.estimator, d, f, self.weight(j))?;
        }
        Some(chi)
    }

    /// Objective, gradient and Hessian at `params`.
    ///
    /// Under MLE a negative observation has no Poisson likelihood and is
    /// reported as `NegCurvatureMle` before any accumulation.
    pub fn linearize(&self, params: &[f64; NUM_PARAMS]) -> Result<Linearization, FitState> {
        if self.estimator == EstimatorId::Mle && self.data.iter().any(|d| *d < 0.0) {
            return Err(FitState::NegCurvatureMle);
        }

        let mut chi_square = 0.0;
        let mut gradient = ParamVector::zeros();
        let mut hessian = Hessian::zeros();
        let mut jac = [0.0; NUM_PARAMS];

        for (j, &d) in self.data.iter().enumerate() {
            let f = evaluate_with_jacobian(self.model, self.point(j), params, &mut jac);
            let w = self.weight(j);
            chi_square += point_chi_square(self.estimator, d, f, w).ok_or(FitState::NegCurvatureMle)?;

            let (a, b) = match self.estimator {
                EstimatorId::Lse => (w * (d - f), w),
                EstimatorId::Mle => (d / f - 1.0, d / (f * f)),
            };
            let jv = ParamVector::from(jac);
            gradient += a * jv;
            hessian += b * jv * jv.transpose();
        }

        Ok(Linearization {
            chi_square,
            gradient,
            hessian,
        })
    }
}

fn point_chi_square(estimator: EstimatorId, d: f64, f: f64, w: f64) -> Option<f64> {
    match estimator {
        EstimatorId::Lse => {
            let r = d - f;
            Some(w * r * r)
        }
        EstimatorId::Mle => {
            if !(f > 0.0) || d < 0.0 {
                return None;
            }
            let log_term = if d > 0.0 { 2.0 * d * (f / d).ln() } else { 0.0 };
            Some(2.0 * (f - d) - log_term)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: [f64; NUM_PARAMS] = [20.0, 30.0, 31.0, 10.0, 8.0];

    fn problem(estimator: EstimatorId, user_info: &[f64]) -> FitProblem<'_> {
        let n = user_info.len() / 3;
        let data = (0..n)
            .map(|j| evaluate(ModelId::Hyperbola, &user_info[j * 3..j * 3 + 3], &PARAMS))
            .collect();
        FitProblem {
            model: ModelId::Hyperbola,
            estimator,
            data,
            weights: None,
            user_info,
        }
    }

    #[test]
    fn exact_data_has_zero_objective_and_gradient() {
        let user_info = [-50.0, 10.0, 0.5, 60.0, -20.0, 0.1, 5.0, 5.0, 0.9];
        for estimator in [EstimatorId::Lse, EstimatorId::Mle] {
            let lin = problem(estimator, &user_info).linearize(&PARAMS).unwrap();
            assert!(lin.chi_square.abs() < 1e-9);
            assert!(lin.gradient.norm() < 1e-9);
            assert!(lin.hessian.diagonal().iter().all(|d| *d > 0.0));
        }
    }

    #[test]
    fn mle_rejects_non_positive_model_values() {
        assert_eq!(point_chi_square(EstimatorId::Mle, 3.0, 0.0, 1.0), None);
        assert_eq!(point_chi_square(EstimatorId::Mle, 3.0, -1.0, 1.0), None);
        assert_eq!(point_chi_square(EstimatorId::Mle, -3.0, 2.0, 1.0), None);
        // Zero data drops the log term.
        assert_eq!(point_chi_square(EstimatorId::Mle, 0.0, 2.0, 1.0), Some(4.0));
        assert_eq!(point_chi_square(EstimatorId::Lse, 3.0, -1.0, 2.0), Some(32.0));
    }

    #[test]
    fn weights_scale_lse_only() {
        let user_info = [-50.0, 10.0, 0.5, 60.0, -20.0, 0.1];
        let off = [21.0, 30.0, 31.0, 10.0, 8.0];
        for (estimator, factor) in [(EstimatorId::Lse, 3.0), (EstimatorId::Mle, 1.0)] {
            let plain = problem(estimator, &user_info);
            let mut weighted = plain.clone();
            weighted.weights = Some(vec![3.0, 3.0]);
            let a = plain.chi_square(&off).unwrap();
            let b = weighted.chi_square(&off).unwrap();
            assert!((b - factor * a).abs() < 1e-9 * a.max(1.0));
        }
    }

    fn fixed_problem(estimator: EstimatorId, data: Vec<f64>, user_info: &[f64]) -> FitProblem<'_> {
        FitProblem {
            model: ModelId::Hyperbola,
            estimator,
            data,
            weights: None,
            user_info,
        }
    }

    #[test]
    fn gradient_is_half_the_descent_of_the_objective() {
        let user_info = [-50.0, 10.0, 0.5, 60.0, -20.0, 0.1, 5.0, 5.0, 0.9];
        let p = [21.0, 29.0, 30.0, 9.5, 7.8];
        for estimator in [EstimatorId::Lse, EstimatorId::Mle] {
            // Includes a zero count, where the MLE log term drops out.
            let prob = fixed_problem(estimator, vec![0.0, 150.0, 120.0], &user_info);
            let lin = prob.linearize(&p).unwrap();
            for k in 0..NUM_PARAMS {
                let h = 1e-6 * p[k].abs().max(1.0);
                let mut up = p;
                let mut down = p;
                up[k] += h;
                down[k] -= h;
                let slope =
                    (prob.chi_square(&up).unwrap() - prob.chi_square(&down).unwrap()) / (2.0 * h);
                let expected = -0.5 * slope;
                let got = lin.gradient[k];
                assert!(
                    (got - expected).abs() <= 1e-5 * expected.abs().max(1.0),
                    "{estimator:?} p{k}: {got} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn negative_observation_has_no_mle_objective() {
        let user_info = [-50.0, 10.0, 0.5, 60.0, -20.0, 0.1, 5.0, 5.0, 0.9];
        let p = [21.0, 29.0, 30.0, 9.5, 7.8];
        let data = vec![-3.0, 150.0, 120.0];

        let mle = fixed_problem(EstimatorId::Mle, data.clone(), &user_info);
        assert_eq!(mle.linearize(&p).unwrap_err(), FitState::NegCurvatureMle);
        assert_eq!(mle.chi_square(&p), None);

        let lse = fixed_problem(EstimatorId::Lse, data, &user_info);
        assert!(lse.linearize(&p).is_ok());
    }
}
