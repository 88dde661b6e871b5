//! Export per-fit results to CSV and the run summary to JSON.
//!
//! The CSV is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{NUM_PARAMS, PARAM_NAMES};
use crate::error::AppError;
use crate::fit::FitOutput;
use crate::report::FitSummary;

/// Write one CSV row per fit.
pub fn write_fits_csv(path: &Path, output: &FitOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_fits(BufWriter::new(file), output)
        .map_err(|e| AppError::invalid_input(format!("Failed to write export CSV '{}': {e}", path.display())))
}

fn write_fits<W: Write>(mut w: W, output: &FitOutput) -> std::io::Result<()> {
    writeln!(w, "fit,state,chi_square,iterations,{}", PARAM_NAMES.join(","))?;
    for i in 0..output.number_fits() {
        write!(
            w,
            "{},{},{:.6},{}",
            i,
            output.states[i].code(),
            output.chi_squares[i],
            output.number_iterations[i]
        )?;
        for k in 0..NUM_PARAMS {
            write!(w, ",{:.6}", output.parameters[(i, k)])?;
        }
        writeln!(w)?;
    }
    w.flush()
}

/// Write the summary as pretty-printed JSON.
pub fn write_summary_json(path: &Path, summary: &FitSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::invalid_input(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    write_summary(BufWriter::new(file), summary)
        .map_err(|e| AppError::invalid_input(format!("Failed to write summary JSON '{}': {e}", path.display())))
}

fn write_summary<W: Write>(mut w: W, summary: &FitSummary) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut w, summary)?;
    writeln!(w)?;
    w.flush()
}
