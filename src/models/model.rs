//! Forward models for HYPERBOLA / HYPERBOLA_PS.
//!
//! The solver relies on two primitive operations per data point:
//! - predict the squared travel time given the parameters
//! - fill the Jacobian row (partial derivatives w.r.t. the parameters)
//!
//! A data point is the user-info slice for that point: `[x, y, z]` for
//! HYPERBOLA and `[x, y, z, phase]` for HYPERBOLA_PS.

use crate::domain::{HyperbolaParams, ModelId, NUM_PARAMS};
use crate::error::AppError;

/// Ratio between P-wave and S-wave velocity, `vs = vp / VP_VS_RATIO`.
///
/// Fixed for the whole model; it is not a fitted parameter.
pub const VP_VS_RATIO: f64 = 1.78;

/// Squared travel time `t0² + r²/v²` for a receiver at `(x, y, z)`.
pub fn hyperbola(x: f64, y: f64, z: f64, p: &HyperbolaParams) -> f64 {
    let r2 = squared_distance(x, y, z, p);
    p.t0 * p.t0 + r2 / (p.v * p.v)
}

/// Phase-blended squared travel time.
///
/// `phase = 1` selects the P arrival (velocity `v`), `phase = 0` the S arrival
/// (velocity `v / VP_VS_RATIO`). The blend is arithmetic so that evaluation over
/// many points stays branch free.
pub fn hyperbola_ps(x: f64, y: f64, z: f64, phase: f64, p: &HyperbolaParams) -> f64 {
    let r2 = squared_distance(x, y, z, p);
    let vp = p.v;
    let vs = p.v / VP_VS_RATIO;
    let tt_p = p.t0 * p.t0 + r2 / (vp * vp);
    let tt_s = p.t0 * p.t0 + r2 / (vs * vs);
    phase * tt_p + (1.0 - phase) * tt_s
}

fn squared_distance(x: f64, y: f64, z: f64, p: &HyperbolaParams) -> f64 {
    let dx = x - p.x0;
    let dy = y - p.y0;
    let dz = z - p.z0;
    dx * dx + dy * dy + dz * dz
}

/// Evaluate `model` at one data point.
///
/// # Panics
/// Panics if `point` holds fewer than `model.fields_per_point()` values.
pub fn evaluate(model: ModelId, point: &[f64], params: &[f64; NUM_PARAMS]) -> f64 {
    let p = as_params(params);
    match model {
        ModelId::Hyperbola => hyperbola(point[0], point[1], point[2], &p),
        ModelId::HyperbolaPs => hyperbola_ps(point[0], point[1], point[2], point[3], &p),
    }
}

/// Evaluate `model` and fill the Jacobian row at one data point.
///
/// Returns the model value. Both models share the form
/// `t0² + s·r²/v²` where `s` is the slowness factor (1 for HYPERBOLA,
/// `phase + (1 - phase)·VP_VS_RATIO²` for HYPERBOLA_PS).
pub fn evaluate_with_jacobian(
    model: ModelId,
    point: &[f64],
    params: &[f64; NUM_PARAMS],
    out: &mut [f64; NUM_PARAMS],
) -> f64 {
    let [x0, y0, z0, t0, v] = *params;
    let dx = point[0] - x0;
    let dy = point[1] - y0;
    let dz = point[2] - z0;
    let r2 = dx * dx + dy * dy + dz * dz;

    let s = match model {
        ModelId::Hyperbola => 1.0,
        ModelId::HyperbolaPs => {
            let phase = point[3];
            phase + (1.0 - phase) * VP_VS_RATIO * VP_VS_RATIO
        }
    };

    let inv_v2 = 1.0 / (v * v);
    out[0] = -2.0 * dx * s * inv_v2;
    out[1] = -2.0 * dy * s * inv_v2;
    out[2] = -2.0 * dz * s * inv_v2;
    out[3] = 2.0 * t0;
    out[4] = -2.0 * r2 * s * inv_v2 / v;

    evaluate(model, point, params)
}

/// Evaluate `model` over column-major geometry.
///
/// `columns` is the unpacked user info: one vector per field (`x`, `y`, `z`
/// and, for HYPERBOLA_PS, `phase`), all of the same length.
pub fn evaluate_columns(
    model: ModelId,
    columns: &[Vec<f64>],
    params: &HyperbolaParams,
) -> Result<Vec<f64>, AppError> {
    let fields = model.fields_per_point();
    if columns.len() != fields {
        return Err(AppError::invalid_input(format!(
            "{model} expects {fields} geometry columns, got {}.",
            columns.len()
        )));
    }
    let n = columns[0].len();
    if columns.iter().any(|c| c.len() != n) {
        return Err(AppError::invalid_input("Geometry columns differ in length."));
    }

    let (x, y, z) = (&columns[0], &columns[1], &columns[2]);
    let out = match model {
        ModelId::Hyperbola => (0..n).map(|i| hyperbola(x[i], y[i], z[i], params)).collect(),
        ModelId::HyperbolaPs => {
            let phase = &columns[3];
            (0..n)
                .map(|i| hyperbola_ps(x[i], y[i], z[i], phase[i], params))
                .collect()
        }
    };
    Ok(out)
}

fn as_params(p: &[f64; NUM_PARAMS]) -> HyperbolaParams {
    HyperbolaParams::new(p[0], p[1], p[2], p[3], p[4])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUE: HyperbolaParams = HyperbolaParams::new(20.0, 30.0, 31.0, 10.0, 8.0);

    #[test]
    fn hyperbola_floor_is_t0_squared() {
        let receivers = [
            (-90.0, 45.0, 0.3),
            (0.0, 0.0, 0.0),
            (20.0, 30.0, 30.0),
            (89.0, -89.0, 1.0),
        ];
        for &(x, y, z) in &receivers {
            assert!(hyperbola(x, y, z, &TRUE) > TRUE.t0 * TRUE.t0);
        }
        // Receiver at the source.
        assert_eq!(hyperbola(20.0, 30.0, 31.0, &TRUE), 100.0);
    }

    #[test]
    fn hyperbola_known_value() {
        // r² = 3² + 4² + 0² = 25, tt = 100 + 25/64.
        let tt = hyperbola(23.0, 34.0, 31.0, &TRUE);
        assert!((tt - (100.0 + 25.0 / 64.0)).abs() < 1e-12);
    }

    #[test]
    fn ps_phase_selects_velocity() {
        let (x, y, z) = (-40.0, 12.5, 0.7);
        let p_only = hyperbola_ps(x, y, z, 1.0, &TRUE);
        assert!((p_only - hyperbola(x, y, z, &TRUE)).abs() < 1e-9);

        let slow = HyperbolaParams {
            v: TRUE.v / VP_VS_RATIO,
            ..TRUE
        };
        let s_only = hyperbola_ps(x, y, z, 0.0, &TRUE);
        assert!((s_only - hyperbola(x, y, z, &slow)).abs() < 1e-9);
        assert!(s_only > p_only);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let params = [18.0, 33.0, 25.0, 9.0, 7.0];
        let points: [&[f64]; 3] = [&[-50.0, 10.0, 0.5, 1.0], &[70.0, -20.0, 0.1, 0.0], &[5.0, 5.0, 0.9, 1.0]];
        for model in [ModelId::Hyperbola, ModelId::HyperbolaPs] {
            for point in points {
                let mut jac = [0.0; NUM_PARAMS];
                let f = evaluate_with_jacobian(model, point, &params, &mut jac);
                assert!((f - evaluate(model, point, &params)).abs() < 1e-12);
                for k in 0..NUM_PARAMS {
                    let h = 1e-6;
                    let mut hi = params;
                    let mut lo = params;
                    hi[k] += h;
                    lo[k] -= h;
                    let fd = (evaluate(model, point, &hi) - evaluate(model, point, &lo)) / (2.0 * h);
                    let scale = fd.abs().max(1.0);
                    assert!(
                        (jac[k] - fd).abs() / scale < 1e-5,
                        "{model} d/dp{k}: analytic {} vs numeric {fd}",
                        jac[k]
                    );
                }
            }
        }
    }

    #[test]
    fn column_evaluation_matches_pointwise() {
        let columns = vec![
            vec![-10.0, 0.0, 45.0],
            vec![5.0, -60.0, 80.0],
            vec![0.2, 0.4, 0.9],
            vec![1.0, 0.0, 1.0],
        ];
        let out = evaluate_columns(ModelId::HyperbolaPs, &columns, &TRUE).unwrap();
        for i in 0..3 {
            let expected = hyperbola_ps(columns[0][i], columns[1][i], columns[2][i], columns[3][i], &TRUE);
            assert_eq!(out[i], expected);
        }

        assert!(evaluate_columns(ModelId::Hyperbola, &columns, &TRUE).is_err());
    }
}
