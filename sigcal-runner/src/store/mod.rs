//! Durable per-symbol parameter store.
//!
//! Two interchangeable backends sit behind one trait: an embedded SQLite
//! database and an append-only JSONL document log. The update rule is the
//! same everywhere: a record replaces the stored one only when its timestamp
//! is strictly newer, and the history log gains an entry only when the
//! content actually changed (blake3 over the canonical JSON of params +
//! meta + performance). Conflicts are resolved by timestamp, never surfaced.

pub mod jsonl;
pub mod sqlite;

pub use jsonl::JsonlStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sigcal_core::evaluate::Evaluation;
use sigcal_core::strategy::IndicatorParams;

/// Calibration context stored alongside the winning parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub strategy: String,
    pub period_end: NaiveDate,
    pub volatility: f64,
    pub lookahead: usize,
    pub target_multiplier: f64,
    pub atr_period: usize,
    /// Density target, as a fraction of bars (e.g. 0.05).
    pub signal_target_percent: f64,
}

/// One durable record per symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockParamsRecord {
    pub symbol: String,
    pub best_params: IndicatorParams,
    pub meta_info: MetaInfo,
    pub performance: Evaluation,
    pub last_updated: NaiveDateTime,
    pub source_file: String,
}

impl StockParamsRecord {
    /// Content address over everything except provenance (timestamp and
    /// source file), so a re-import of identical results dedupes.
    pub fn content_hash(&self) -> Result<String, StoreError> {
        let canonical =
            serde_json::to_vec(&(&self.best_params, &self.meta_info, &self.performance))?;
        Ok(blake3::hash(&canonical).to_hex().to_string())
    }
}

/// What `update` did with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Inserted,
    Replaced,
    /// Newer timestamp but identical content; nothing written.
    SkippedIdentical,
    /// Timestamp not strictly newer than the stored record.
    SkippedStale,
}

/// Snapshot appended to a symbol's history on every content change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recorded_at: NaiveDateTime,
    pub content_hash: String,
    pub record: StockParamsRecord,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Uniform store contract. Both backends serialize access per call.
pub trait ParamsStore {
    fn get_stock_params(&self, symbol: &str) -> Result<Option<StockParamsRecord>, StoreError>;

    /// Apply the timestamp/content update rule.
    fn update(&mut self, record: StockParamsRecord) -> Result<UpdateOutcome, StoreError>;

    /// Content-change history for one symbol, oldest first.
    fn history(&self, symbol: &str) -> Result<Vec<HistoryEntry>, StoreError>;

    /// All stored symbols, sorted.
    fn symbols(&self) -> Result<Vec<String>, StoreError>;
}

/// Shared decision logic for `update` implementations.
pub(crate) enum UpdateDecision {
    Insert,
    Replace,
    SkipIdentical,
    SkipStale,
}

pub(crate) fn decide_update(
    existing: Option<&StockParamsRecord>,
    incoming: &StockParamsRecord,
) -> Result<UpdateDecision, StoreError> {
    match existing {
        None => Ok(UpdateDecision::Insert),
        Some(current) => {
            if incoming.last_updated <= current.last_updated {
                Ok(UpdateDecision::SkipStale)
            } else if incoming.content_hash()? == current.content_hash()? {
                Ok(UpdateDecision::SkipIdentical)
            } else {
                Ok(UpdateDecision::Replace)
            }
        }
    }
}

/// Backend selection, from configuration only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Jsonl { path: PathBuf },
}

/// Open the configured backend.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ParamsStore>, StoreError> {
    match config {
        StoreConfig::Sqlite { path } => Ok(Box::new(SqliteStore::open(path)?)),
        StoreConfig::Jsonl { path } => Ok(Box::new(JsonlStore::open(path)?)),
    }
}

/// Self-describing full-store snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct StoreBackup {
    schema_version: u32,
    records: Vec<StockParamsRecord>,
}

const BACKUP_SCHEMA_VERSION: u32 = 1;

/// Write every stored record to a JSON backup file. Returns record count.
pub fn backup_to_file(store: &dyn ParamsStore, path: &Path) -> Result<usize, StoreError> {
    let mut records = Vec::new();
    for symbol in store.symbols()? {
        if let Some(record) = store.get_stock_params(&symbol)? {
            records.push(record);
        }
    }
    let backup = StoreBackup {
        schema_version: BACKUP_SCHEMA_VERSION,
        records,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(&backup)?)?;
    Ok(backup.records.len())
}

/// Replay a backup file through the normal update rule.
/// Returns how many records were inserted or replaced.
pub fn restore_from_file(store: &mut dyn ParamsStore, path: &Path) -> Result<usize, StoreError> {
    let backup: StoreBackup = serde_json::from_slice(&fs::read(path)?)?;
    if backup.schema_version != BACKUP_SCHEMA_VERSION {
        return Err(StoreError::Backend(format!(
            "unsupported backup schema version {}",
            backup.schema_version
        )));
    }
    let mut applied = 0;
    for record in backup.records {
        match store.update(record)? {
            UpdateOutcome::Inserted | UpdateOutcome::Replaced => applied += 1,
            UpdateOutcome::SkippedIdentical | UpdateOutcome::SkippedStale => {}
        }
    }
    Ok(applied)
}

/// Per-symbol payload of a calibration results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolResult {
    pub best_params: IndicatorParams,
    pub meta_info: MetaInfo,
    pub performance: Evaluation,
}

/// A combined results file: one entry per symbol.
pub type ResultsFile = BTreeMap<String, SymbolResult>;

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub applied: usize,
    pub skipped: usize,
}

/// Merge a many-symbol results file into the store.
///
/// The record timestamp comes from a `_YYYYMMDD` filename suffix
/// (`analysis_params_20250317.json`), falling back to the file's mtime.
pub fn import_params(store: &mut dyn ParamsStore, path: &Path) -> Result<ImportSummary, StoreError> {
    let results: ResultsFile = serde_json::from_slice(&fs::read(path)?)?;
    let timestamp = file_timestamp(path)?;
    let source_file = path.display().to_string();

    let mut summary = ImportSummary::default();
    for (symbol, result) in results {
        let record = StockParamsRecord {
            symbol,
            best_params: result.best_params,
            meta_info: result.meta_info,
            performance: result.performance,
            last_updated: timestamp,
            source_file: source_file.clone(),
        };
        match store.update(record)? {
            UpdateOutcome::Inserted | UpdateOutcome::Replaced => summary.applied += 1,
            UpdateOutcome::SkippedIdentical | UpdateOutcome::SkippedStale => summary.skipped += 1,
        }
    }
    Ok(summary)
}

/// Timestamp for an imported file: `_YYYYMMDD` suffix of the stem, else mtime.
fn file_timestamp(path: &Path) -> Result<NaiveDateTime, StoreError> {
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        if let Some(date_str) = stem.rsplit('_').next() {
            if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y%m%d") {
                // midnight; date-granular files compare by day
                if let Some(ts) = date.and_hms_opt(0, 0, 0) {
                    return Ok(ts);
                }
            }
        }
    }
    let mtime = fs::metadata(path)?.modified()?;
    let since_epoch = mtime
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| StoreError::Backend(format!("file mtime before epoch: {e}")))?;
    chrono::DateTime::from_timestamp(since_epoch.as_secs() as i64, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| StoreError::Backend("file mtime out of range".to_string()))
}
