//! Engine configuration, loadable from TOML.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sigcal_core::strategy::StrategyKind;

use crate::calibrate::{CalibrationConfig, CalibrationError};
use crate::optimize::{OptimizerConfig, TrialConfig};
use crate::store::StoreConfig;

/// Everything a batch run needs, in one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Strategy name: KD, MACD, or RSI.
    pub strategy: String,

    /// Directory holding `data_<symbol>.csv` files.
    pub data_dir: PathBuf,

    /// Directory for signals CSVs and parameter summaries.
    pub output_dir: PathBuf,

    /// Parameter store backend.
    pub store: StoreConfig,

    /// Symbols to calibrate.
    #[serde(default)]
    pub symbols: Vec<String>,

    #[serde(default = "default_max_bars")]
    pub max_bars: usize,

    #[serde(default = "default_n_optimizations")]
    pub n_optimizations: usize,

    #[serde(default = "default_evals")]
    pub evals: usize,

    #[serde(default = "default_patience")]
    pub patience: usize,

    #[serde(default = "default_min_delta")]
    pub min_delta: f64,

    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
}

fn default_max_bars() -> usize {
    1000
}

fn default_n_optimizations() -> usize {
    20
}

fn default_evals() -> usize {
    500
}

fn default_patience() -> usize {
    100
}

fn default_min_delta() -> f64 {
    0.001
}

fn default_master_seed() -> u64 {
    42
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Unknown strategy names are fatal before any data is touched.
    pub fn strategy_kind(&self) -> Result<StrategyKind, CalibrationError> {
        StrategyKind::from_name(&self.strategy)
            .ok_or_else(|| CalibrationError::UnsupportedStrategy(self.strategy.clone()))
    }

    pub fn calibration_config(&self) -> CalibrationConfig {
        CalibrationConfig {
            optimizer: OptimizerConfig {
                n_optimizations: self.n_optimizations,
                trial: TrialConfig {
                    evals: self.evals,
                    patience: self.patience,
                    min_delta: self.min_delta,
                },
                master_seed: self.master_seed,
            },
            max_bars: self.max_bars,
        }
    }
}
