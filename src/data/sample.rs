//! Synthetic travel-time datasets.
//!
//! A dataset is built in the same order every time so that a seed fully
//! determines it:
//!
//! 1. initial guesses (tiled, or drawn from bounds when enabled)
//! 2. receiver geometry (and phase flags for HYPERBOLA_PS)
//! 3. user info, flattened point-major as `x, y, z[, phase]` per point per fit
//! 4. forward model at the true parameters, plus optional Gaussian noise
//!
//! Every fit shares the geometry, so the clean travel times are evaluated once
//! and tiled across fits before noise is drawn row by row.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::domain::{GeometryRange, ModelId, NUM_PARAMS, RunConfig};
use crate::error::AppError;
use crate::models::evaluate_columns;

/// Receiver positions shared by every fit of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// `1.0` for a P pick, `0.0` for an S pick. Only present for HYPERBOLA_PS.
    pub phase: Option<Vec<f64>>,
}

impl Geometry {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn fields(&self) -> usize {
        if self.phase.is_some() { 4 } else { 3 }
    }

    /// User-info tuple of point `i` in field order.
    pub fn point(&self, i: usize) -> Vec<f64> {
        let mut out = vec![self.x[i], self.y[i], self.z[i]];
        if let Some(phase) = &self.phase {
            out.push(phase[i]);
        }
        out
    }
}

/// Everything handed to the batched fitting call.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub geometry: Geometry,
    /// Flattened per-fit user info, `number_fits * number_points * fields` values.
    pub user_info: Vec<f64>,
    /// `number_fits x number_points`.
    pub observations: DMatrix<f64>,
    /// `number_fits x NUM_PARAMS`.
    pub initial_parameters: DMatrix<f64>,
}

pub fn generate_dataset(config: &RunConfig) -> Result<Dataset, AppError> {
    if config.number_fits == 0 {
        return Err(AppError::new(AppError::EMPTY_DATA, "Number of fits must be > 0."));
    }
    if config.number_points == 0 {
        return Err(AppError::new(AppError::EMPTY_DATA, "Number of points must be > 0."));
    }
    let sigma = match config.noise_sigma {
        Some(s) if !(s.is_finite() && s >= 0.0) => {
            return Err(AppError::invalid_input("Noise sigma must be finite and >= 0."));
        }
        other => other,
    };

    checked_batch_len(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);

    let initial_parameters = initial_parameters(config, &mut rng)?;
    let geometry = generate_geometry(config.model, config.number_points, &config.geometry, &mut rng)?;
    let user_info = build_user_info(&geometry, config.number_fits);
    debug!(values = user_info.len(), "user info assembled");

    let block = config.number_points * geometry.fields();
    let columns = unpack_user_info(&user_info[..block], geometry.fields())?;
    let clean = evaluate_columns(config.model, &columns, &config.true_params)?;
    let mut observations = DMatrix::from_fn(config.number_fits, config.number_points, |_, j| clean[j]);

    if let Some(sigma) = sigma.filter(|s| *s > 0.0) {
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| AppError::compute(format!("Noise distribution error: {e}")))?;
        for i in 0..config.number_fits {
            for j in 0..config.number_points {
                observations[(i, j)] += normal.sample(&mut rng);
            }
        }
    }

    debug!(
        rows = observations.nrows(),
        cols = observations.ncols(),
        first_row = ?observations.row(0).iter().collect::<Vec<_>>(),
        "observations built"
    );

    Ok(Dataset {
        geometry,
        user_info,
        observations,
        initial_parameters,
    })
}

/// Number of user-info values of the run, checked so that every buffer the
/// dataset needs stays addressable.
pub fn checked_batch_len(config: &RunConfig) -> Result<usize, AppError> {
    let too_large = || {
        AppError::invalid_input(format!(
            "Batch of {} fits x {} points is too large.",
            config.number_fits, config.number_points
        ))
    };
    let user_info = config
        .number_points
        .checked_mul(config.model.fields_per_point())
        .and_then(|per_fit| per_fit.checked_mul(config.number_fits))
        .ok_or_else(too_large)?;
    let params = config.number_fits.checked_mul(NUM_PARAMS).ok_or_else(too_large)?;
    let bytes = user_info
        .max(params)
        .checked_mul(std::mem::size_of::<f64>())
        .ok_or_else(too_large)?;
    if bytes > isize::MAX as usize {
        return Err(too_large());
    }
    Ok(user_info)
}

/// Draw receiver positions (and phase flags for HYPERBOLA_PS).
pub fn generate_geometry(
    model: ModelId,
    number_points: usize,
    range: &GeometryRange,
    rng: &mut StdRng,
) -> Result<Geometry, AppError> {
    if !(range.x.is_valid() && range.y.is_valid() && range.z.is_valid()) {
        return Err(AppError::invalid_input("Invalid receiver sampling range."));
    }

    let x = (0..number_points).map(|_| rng.gen_range(range.x.min..range.x.max)).collect();
    let y = (0..number_points).map(|_| rng.gen_range(range.y.min..range.y.max)).collect();
    let z = (0..number_points).map(|_| rng.gen_range(range.z.min..range.z.max)).collect();
    let phase = match model {
        ModelId::Hyperbola => None,
        ModelId::HyperbolaPs => Some(
            (0..number_points)
                .map(|_| f64::from(rng.gen_range(0u8..2)))
                .collect(),
        ),
    };

    Ok(Geometry { x, y, z, phase })
}

/// Replicate the geometry for every fit, point-major.
pub fn build_user_info(geometry: &Geometry, number_fits: usize) -> Vec<f64> {
    let fields = geometry.fields();
    let mut out = Vec::with_capacity(number_fits * geometry.len() * fields);
    let per_fit: Vec<f64> = (0..geometry.len()).flat_map(|i| geometry.point(i)).collect();
    for _ in 0..number_fits {
        out.extend_from_slice(&per_fit);
    }
    out
}

/// Reshape flattened user info into `fields` columns of equal length.
pub fn unpack_user_info(user_info: &[f64], fields: usize) -> Result<Vec<Vec<f64>>, AppError> {
    if fields == 0 || user_info.len() % fields != 0 {
        return Err(AppError::invalid_input(format!(
            "User info length {} is not a multiple of {fields} fields.",
            user_info.len()
        )));
    }
    let n = user_info.len() / fields;
    let mut columns = vec![Vec::with_capacity(n); fields];
    for chunk in user_info.chunks_exact(fields) {
        for (col, &v) in columns.iter_mut().zip(chunk) {
            col.push(v);
        }
    }
    Ok(columns)
}

/// Initial guesses, one row per fit.
///
/// Tiles `config.guess_params` unless `config.random_guesses` is set, in which
/// case every parameter is drawn from its `guess_bounds` interval.
pub fn initial_parameters(config: &RunConfig, rng: &mut StdRng) -> Result<DMatrix<f64>, AppError> {
    if !config.random_guesses {
        let guess = config.guess_params.to_array();
        return Ok(DMatrix::from_fn(config.number_fits, NUM_PARAMS, |_, j| guess[j]));
    }

    let bounds = config.guess_bounds.to_array();
    if bounds.iter().any(|b| !b.is_valid()) {
        return Err(AppError::invalid_input("Invalid initial guess bounds."));
    }
    let mut out = DMatrix::zeros(config.number_fits, NUM_PARAMS);
    for i in 0..config.number_fits {
        for (j, b) in bounds.iter().enumerate() {
            out[(i, j)] = rng.gen_range(b.min..b.max);
        }
    }
    Ok(out)
}
