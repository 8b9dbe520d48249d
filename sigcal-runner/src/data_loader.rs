//! Bar providers.
//!
//! The calibration engine is indifferent to where bars come from; it only
//! needs the `BarProvider` contract. "No data for this symbol" is `Ok(None)`
//! and never an error — a batch run treats it as a skip, not a failure.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use sigcal_core::domain::{is_strictly_ordered, Bar};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("bars for {symbol} are not strictly date-ordered")]
    Unordered { symbol: String },
}

/// Uniform OHLCV retrieval. `max_count` keeps the most recent bars.
pub trait BarProvider: Send + Sync {
    fn get_bars(&self, symbol: &str, max_count: usize) -> Result<Option<Vec<Bar>>, LoadError>;
}

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Reads `data_<symbol>.csv` files from one directory. Dots in symbols are
/// flattened to underscores in filenames (`HK.00700` → `data_HK_00700.csv`).
pub struct CsvBarProvider {
    dir: PathBuf,
}

impl CsvBarProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("data_{}.csv", symbol.replace('.', "_")))
    }

    fn read_file(&self, path: &Path, symbol: &str) -> Result<Vec<Bar>, LoadError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut bars = Vec::new();
        for row in reader.deserialize() {
            let row: CsvBarRow = row?;
            bars.push(Bar {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        if !is_strictly_ordered(&bars) {
            return Err(LoadError::Unordered {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

impl BarProvider for CsvBarProvider {
    fn get_bars(&self, symbol: &str, max_count: usize) -> Result<Option<Vec<Bar>>, LoadError> {
        let path = self.file_for(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let mut bars = self.read_file(&path, symbol)?;
        if bars.len() > max_count {
            bars.drain(..bars.len() - max_count);
        }
        Ok(Some(bars))
    }
}
