//! Shared fit pipeline.
//!
//! dataset generation -> batched fit -> summary
//!
//! The CLI only adds presentation (printing and exports) around these steps.

use tracing::info;

use crate::data::{Dataset, generate_dataset};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::fit::{BatchFitter, FitOutput, FitRequest};
use crate::report::{FitSummary, summarize};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub output: FitOutput,
    pub summary: FitSummary,
}

/// Execute the full pipeline.
pub fn run_fit(config: &RunConfig, fitter: &dyn BatchFitter) -> Result<RunOutput, AppError> {
    let dataset = generate_dataset(config)?;
    let (output, summary) = fit_dataset(config, &dataset, fitter)?;
    Ok(RunOutput {
        dataset,
        output,
        summary,
    })
}

/// Run the batched fit on a prepared dataset and summarize it.
fn fit_dataset(
    config: &RunConfig,
    dataset: &Dataset,
    fitter: &dyn BatchFitter,
) -> Result<(FitOutput, FitSummary), AppError> {
    if !fitter.is_available() {
        return Err(AppError::compute(format!("Fit backend '{}' is not available.", fitter.name())));
    }

    let request = FitRequest {
        data: &dataset.observations,
        weights: None,
        model: config.model,
        initial_parameters: &dataset.initial_parameters,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        constraints: None,
        estimator: config.estimator,
        user_info: &dataset.user_info,
    };
    let output = fitter.fit(&request)?;
    let summary = summarize(&output, config, fitter.name());
    info!(
        converged = summary.number_converged,
        fits = summary.number_fits,
        "run summarized"
    );
    Ok((output, summary))
}
