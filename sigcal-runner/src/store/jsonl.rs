//! JSONL document-log store backend.
//!
//! Every accepted update is appended to one JSONL file as an independent
//! document; current state is rebuilt by replaying the log through the same
//! timestamp/content rule on open. Because documents are self-contained and
//! append-only, logs from different machines can be concatenated and the
//! replay converges on last-writer-wins — which is what makes this backend
//! replication-friendly.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::store::{
    decide_update, HistoryEntry, ParamsStore, StockParamsRecord, StoreError, UpdateDecision,
    UpdateOutcome,
};

pub struct JsonlStore {
    path: PathBuf,
    records: BTreeMap<String, StockParamsRecord>,
    histories: BTreeMap<String, Vec<HistoryEntry>>,
}

impl JsonlStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let mut store = Self {
            path: path.to_path_buf(),
            records: BTreeMap::new(),
            histories: BTreeMap::new(),
        };
        store.replay()?;
        Ok(store)
    }

    fn replay(&mut self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        let reader = BufReader::new(fs::File::open(&self.path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry = serde_json::from_str(&line)?;
            self.apply(entry)?;
        }
        Ok(())
    }

    /// Apply one document to in-memory state. Documents that lose the
    /// timestamp race (merged logs) are dropped silently.
    fn apply(&mut self, entry: HistoryEntry) -> Result<UpdateOutcome, StoreError> {
        let symbol = entry.record.symbol.clone();
        let outcome = match decide_update(self.records.get(&symbol), &entry.record)? {
            UpdateDecision::SkipStale => UpdateOutcome::SkippedStale,
            UpdateDecision::SkipIdentical => UpdateOutcome::SkippedIdentical,
            UpdateDecision::Insert => UpdateOutcome::Inserted,
            UpdateDecision::Replace => UpdateOutcome::Replaced,
        };
        if matches!(outcome, UpdateOutcome::Inserted | UpdateOutcome::Replaced) {
            self.records.insert(symbol.clone(), entry.record.clone());
            self.histories.entry(symbol).or_default().push(entry);
        }
        Ok(outcome)
    }

    fn append_document(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;
        file.flush()?;
        Ok(())
    }
}

impl ParamsStore for JsonlStore {
    fn get_stock_params(&self, symbol: &str) -> Result<Option<StockParamsRecord>, StoreError> {
        Ok(self.records.get(symbol).cloned())
    }

    fn update(&mut self, record: StockParamsRecord) -> Result<UpdateOutcome, StoreError> {
        let entry = HistoryEntry {
            recorded_at: record.last_updated,
            content_hash: record.content_hash()?,
            record,
        };
        let outcome = match decide_update(self.records.get(&entry.record.symbol), &entry.record)? {
            UpdateDecision::SkipStale => return Ok(UpdateOutcome::SkippedStale),
            UpdateDecision::SkipIdentical => return Ok(UpdateOutcome::SkippedIdentical),
            UpdateDecision::Insert => UpdateOutcome::Inserted,
            UpdateDecision::Replace => UpdateOutcome::Replaced,
        };
        // Durable first, then visible
        self.append_document(&entry)?;
        let symbol = entry.record.symbol.clone();
        self.records.insert(symbol.clone(), entry.record.clone());
        self.histories.entry(symbol).or_default().push(entry);
        Ok(outcome)
    }

    fn history(&self, symbol: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.histories.get(symbol).cloned().unwrap_or_default())
    }

    fn symbols(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.keys().cloned().collect())
    }
}
