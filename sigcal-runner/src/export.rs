//! Result export.
//!
//! Two flat artifacts per run: a per-symbol signals CSV (every scored signal
//! bar with its outcome) and a combined `analysis_params_YYYYMMDD.json`
//! summary whose layout matches what `store::import_params` reads, so a
//! summary can be re-imported into any store later.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::calibrate::CalibrationOutcome;
use crate::store::{ResultsFile, SymbolResult};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

fn flat_symbol(symbol: &str) -> String {
    symbol.replace('.', "_")
}

/// Write one symbol's scored signal bars. Returns the file path.
pub fn write_signals_csv(
    outcome: &CalibrationOutcome,
    dir: &Path,
    stamp: NaiveDate,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "signals_{}_{}.csv",
        flat_symbol(&outcome.symbol),
        stamp.format("%Y%m%d")
    ));
    let mut writer = csv::Writer::from_path(&path)?;
    for row in &outcome.signal_rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Write the combined per-symbol parameter summary. Returns the file path.
pub fn write_params_summary(
    outcomes: &[CalibrationOutcome],
    dir: &Path,
    stamp: NaiveDate,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("analysis_params_{}.json", stamp.format("%Y%m%d")));

    let results: ResultsFile = outcomes
        .iter()
        .map(|o| {
            (
                o.symbol.clone(),
                SymbolResult {
                    best_params: o.best_params.clone(),
                    meta_info: o.meta_info(),
                    performance: o.performance.clone(),
                },
            )
        })
        .collect();

    fs::write(&path, serde_json::to_vec_pretty(&results)?)?;
    Ok(path)
}
