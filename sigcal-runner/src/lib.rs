//! SigCal Runner — batch calibration orchestration.
//!
//! Wires the core primitives into a runnable engine:
//! - Optimization objective + parallel TPE optimizer
//! - Durable parameter store (SQLite or JSONL document log)
//! - Bar providers (CSV files)
//! - Batch calibration with per-symbol failure isolation
//! - Result export (signals CSV + combined params JSON)

pub mod calibrate;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod objective;
pub mod optimize;
pub mod store;

pub use calibrate::{calibrate_batch, calibrate_symbol, CalibrationError, CalibrationOutcome};
pub use objective::Objective;
pub use optimize::{run_optimization, OptimizerConfig, Trial};
pub use store::{open_store, ParamsStore, StockParamsRecord, StoreConfig};
