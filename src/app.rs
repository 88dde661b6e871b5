//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env`, sets up logging and the worker pool
//! - parses CLI arguments and resolves them against the model presets
//! - generates the synthetic dataset and runs the batched fit
//! - prints the summary and writes optional exports

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, FitArgs};
use crate::domain::{
    EstimatorId, GeometryRange, GuessBounds, HyperbolaParams, ModelId, NUM_PARAMS, RunConfig,
};
use crate::error::AppError;
use crate::fit::{BatchFitter, CpuLmFitter};

pub mod pipeline;

/// Environment variable that sizes the rayon pool.
pub const THREADS_ENV: &str = "HYPERFIT_THREADS";

pub const TRUE_PARAMS: HyperbolaParams = HyperbolaParams::new(20.0, 30.0, 31.0, 10.0, 8.0);
pub const GUESS_PARAMS: HyperbolaParams = HyperbolaParams::new(20.0, 30.0, 12.0, 7.0, 7.0);

/// Entry point for the `hyperfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();
    configure_threads()?;

    let (model, args) = match cli.command {
        Command::Hyperbola(args) => (ModelId::Hyperbola, args),
        Command::HyperbolaPs(args) => (ModelId::HyperbolaPs, args),
    };
    let config = run_config_from_args(model, &args)?;
    let fitter = CpuLmFitter::default();

    handle_fit(&config, &fitter)
}

fn handle_fit(config: &RunConfig, fitter: &dyn BatchFitter) -> Result<(), AppError> {
    info!(backend = %fitter.describe(), available = fitter.is_available(), "fit backend");

    let run = pipeline::run_fit(config, fitter)?;
    debug!(first_guess = ?run.dataset.initial_parameters.row(0).iter().collect::<Vec<_>>(), "initial parameters");

    println!(
        "{}",
        crate::report::format_run_header(config, &run.dataset, &fitter.describe())
    );
    println!("{}", crate::report::format_summary(&run.summary));

    if let Some(path) = &config.export_fits {
        crate::io::write_fits_csv(path, &run.output)?;
        info!(path = %path.display(), "per-fit results exported");
    }
    if let Some(path) = &config.export_summary {
        crate::io::write_summary_json(path, &run.summary)?;
        info!(path = %path.display(), "summary exported");
    }

    Ok(())
}

/// Default configuration of each model's demo run.
pub fn preset_config(model: ModelId) -> RunConfig {
    let (number_fits, number_points, estimator, noise_sigma) = match model {
        ModelId::Hyperbola => (1_000_000, 10, EstimatorId::Mle, Some(1.0)),
        ModelId::HyperbolaPs => (10_000, 7, EstimatorId::Lse, None),
    };
    RunConfig {
        model,
        estimator,
        number_fits,
        number_points,
        true_params: TRUE_PARAMS,
        guess_params: GUESS_PARAMS,
        tolerance: 1e-5,
        max_iterations: 200,
        noise_sigma,
        seed: 0,
        random_guesses: false,
        guess_bounds: GuessBounds::default(),
        geometry: GeometryRange::default(),
        export_fits: None,
        export_summary: None,
    }
}

/// Resolve CLI arguments against the preset of `model`.
pub fn run_config_from_args(model: ModelId, args: &FitArgs) -> Result<RunConfig, AppError> {
    let mut config = preset_config(model);

    if let Some(n) = args.fits {
        config.number_fits = n;
    }
    if let Some(p) = args.points {
        config.number_points = p;
    }
    if let Some(e) = args.estimator {
        config.estimator = e;
    }
    if let Some(t) = args.tolerance {
        config.tolerance = t;
    }
    if let Some(m) = args.max_iterations {
        config.max_iterations = m;
    }
    if args.no_noise {
        config.noise_sigma = None;
    } else if let Some(sigma) = args.noise {
        config.noise_sigma = Some(sigma);
    }
    config.seed = args.seed;
    config.random_guesses = args.random_guesses;
    config.export_fits = args.export.clone();
    config.export_summary = args.export_summary.clone();

    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &RunConfig) -> Result<(), AppError> {
    if config.number_fits == 0 {
        return Err(AppError::new(AppError::EMPTY_DATA, "Number of fits must be > 0."));
    }
    if config.number_points == 0 {
        return Err(AppError::new(AppError::EMPTY_DATA, "Number of points must be > 0."));
    }
    if !(config.tolerance.is_finite() && config.tolerance > 0.0) {
        return Err(AppError::invalid_input("Tolerance must be finite and > 0."));
    }
    if config.max_iterations == 0 {
        return Err(AppError::invalid_input("Max iterations must be > 0."));
    }
    if let Some(sigma) = config.noise_sigma {
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(AppError::invalid_input("Noise sigma must be finite and >= 0."));
        }
    }
    crate::data::checked_batch_len(config)?;
    if config.number_points < NUM_PARAMS {
        warn!(
            points = config.number_points,
            params = NUM_PARAMS,
            "fewer points than parameters; fits are underdetermined"
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when running embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn configure_threads() -> Result<(), AppError> {
    let Ok(raw) = std::env::var(THREADS_ENV) else {
        return Ok(());
    };
    let threads: usize = raw
        .trim()
        .parse()
        .map_err(|e| AppError::invalid_input(format!("{THREADS_ENV}='{raw}' is not a thread count: {e}")))?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .map_err(|e| AppError::compute(format!("Failed to configure worker pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_the_two_demo_runs() {
        let h = preset_config(ModelId::Hyperbola);
        assert_eq!((h.number_fits, h.number_points), (1_000_000, 10));
        assert_eq!(h.estimator, EstimatorId::Mle);
        assert_eq!(h.noise_sigma, Some(1.0));

        let ps = preset_config(ModelId::HyperbolaPs);
        assert_eq!((ps.number_fits, ps.number_points), (10_000, 7));
        assert_eq!(ps.estimator, EstimatorId::Lse);
        assert_eq!(ps.noise_sigma, None);

        for c in [h, ps] {
            assert_eq!(c.true_params, TRUE_PARAMS);
            assert_eq!(c.tolerance, 1e-5);
            assert_eq!(c.max_iterations, 200);
            assert!(!c.random_guesses);
        }
    }

    #[test]
    fn args_override_presets() {
        let args = FitArgs {
            fits: Some(12),
            estimator: Some(EstimatorId::Lse),
            no_noise: true,
            seed: 7,
            ..FitArgs::default()
        };
        let c = run_config_from_args(ModelId::Hyperbola, &args).unwrap();
        assert_eq!(c.number_fits, 12);
        assert_eq!(c.number_points, 10);
        assert_eq!(c.estimator, EstimatorId::Lse);
        assert_eq!(c.noise_sigma, None);
        assert_eq!(c.seed, 7);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        let zero_fits = FitArgs {
            fits: Some(0),
            ..FitArgs::default()
        };
        assert_eq!(
            run_config_from_args(ModelId::Hyperbola, &zero_fits).unwrap_err().exit_code(),
            AppError::EMPTY_DATA
        );

        let bad_tol = FitArgs {
            tolerance: Some(-1.0),
            ..FitArgs::default()
        };
        assert!(run_config_from_args(ModelId::HyperbolaPs, &bad_tol).is_err());

        let bad_noise = FitArgs {
            noise: Some(f64::NAN),
            ..FitArgs::default()
        };
        assert!(run_config_from_args(ModelId::HyperbolaPs, &bad_noise).is_err());
    }

    #[test]
    fn oversized_batches_are_rejected() {
        let huge = FitArgs {
            fits: Some(usize::MAX / 2),
            ..FitArgs::default()
        };
        for model in [ModelId::Hyperbola, ModelId::HyperbolaPs] {
            let err = run_config_from_args(model, &huge).unwrap_err();
            assert_eq!(err.exit_code(), AppError::INVALID_INPUT);
        }
    }
}
