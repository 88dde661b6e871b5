//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes stay localized.

use crate::data::Dataset;
use crate::domain::{PARAM_NAMES, RunConfig};
use crate::report::FitSummary;

/// Lines printed before the fit: backend, configuration and guesses.
pub fn format_run_header(config: &RunConfig, dataset: &Dataset, backend: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("backend:         {backend}\n"));
    out.push_str(&format!(
        "model / estimator: {} / {}\n",
        config.model,
        config.estimator.display_name()
    ));
    out.push_str(&format!("true parameters: {}\n", fmt_vec(&config.true_params.to_array())));

    let guesses = if config.random_guesses {
        format!(
            "random within bounds (first: {})",
            fmt_vec(&dataset.initial_parameters.row(0).iter().copied().collect::<Vec<_>>())
        )
    } else {
        fmt_vec(&config.guess_params.to_array())
    };
    out.push_str(&format!("initial guesses: {guesses}\n"));
    out
}

/// The summary block, state ratios and parameter table.
pub fn format_summary(summary: &FitSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("*{}*\n", summary.backend));
    out.push('\n');
    out.push_str(&format!("model ID:        {}\n", summary.model));
    out.push_str(&format!("number of fits:  {}\n", summary.number_fits));
    out.push_str(&format!("fit size:        {}\n", summary.fit_size));
    out.push_str(&format!("mean chi_square: {}\n", fmt_opt(summary.mean_chi_square, 2)));
    out.push_str(&format!("iterations:      {}\n", fmt_opt(summary.mean_iterations, 2)));
    out.push_str(&format!("time:            {:.2} s\n", summary.execution_time_s));

    out.push('\n');
    for r in &summary.state_ratios {
        out.push_str(&format!("ratio {:<18}{:6.2} %\n", r.state.ratio_label(), r.percent));
    }

    out.push_str("\nparameters of hyperbola\n");
    for (i, p) in summary.parameters.iter().enumerate() {
        out.push_str(&format!(
            "p{i} {:<3} true {:6.2} median {:>6} std {:>6}\n",
            PARAM_NAMES[i],
            p.true_value,
            fmt_opt(p.median, 2),
            fmt_opt(p.std, 2),
        ));
    }

    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "n/a".to_string(),
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.2}")).collect();
    format!("[{}]", parts.join(", "))
}
