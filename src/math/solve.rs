//! Damped normal-equation solver for Levenberg–Marquardt steps.
//!
//! Each iteration solves
//!
//! ```text
//! (H + λ · diag(H)) δ = g
//! ```
//!
//! where `H` is the (approximate) Hessian and `g` the descent direction.
//! Multiplicative damping keeps the step scale invariant per parameter, but it
//! cannot rescue a parameter whose Hessian diagonal is exactly zero. That case
//! is reported as singular before any factorization is attempted.

use nalgebra::{SMatrix, SVector};

use crate::domain::NUM_PARAMS;

pub type Hessian = SMatrix<f64, NUM_PARAMS, NUM_PARAMS>;
pub type ParamVector = SVector<f64, NUM_PARAMS>;

/// Solve the damped system.
///
/// Returns `None` when the system is singular or the solution is not finite.
pub fn solve_damped(hessian: &Hessian, gradient: &ParamVector, lambda: f64) -> Option<ParamVector> {
    if hessian.diagonal().iter().any(|d| *d == 0.0 || !d.is_finite()) {
        return None;
    }

    let mut damped = *hessian;
    for i in 0..NUM_PARAMS {
        damped[(i, i)] *= 1.0 + lambda;
    }

    // Cholesky handles the usual SPD case; LU covers indefinite damped systems.
    let delta = match damped.cholesky() {
        Some(chol) => chol.solve(gradient),
        None => damped.lu().solve(gradient)?,
    };

    if delta.iter().all(|v| v.is_finite()) {
        Some(delta)
    } else {
        None
    }
}
