//! SQLite store backend.
//!
//! One `stock_params` row per symbol plus an append-only `params_history`
//! table. Structured payloads (params, meta, performance) are stored as JSON
//! columns; timestamps as ISO-8601 text.

use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::store::{
    decide_update, HistoryEntry, ParamsStore, StockParamsRecord, StoreError, UpdateDecision,
    UpdateOutcome,
};

// `%.f` prints nothing for a zero fraction and parses either form, so
// sub-second timestamps survive the round trip losslessly.
const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stock_params (
    symbol        TEXT PRIMARY KEY,
    best_params   TEXT NOT NULL,
    meta_info     TEXT NOT NULL,
    performance   TEXT NOT NULL,
    last_updated  TEXT NOT NULL,
    source_file   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS params_history (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol        TEXT NOT NULL,
    recorded_at   TEXT NOT NULL,
    content_hash  TEXT NOT NULL,
    record        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_symbol ON params_history(symbol, id);
"#;

pub struct SqliteStore {
    conn: Connection,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    fn append_history(&self, record: &StockParamsRecord) -> Result<(), StoreError> {
        let entry = HistoryEntry {
            recorded_at: record.last_updated,
            content_hash: record.content_hash()?,
            record: record.clone(),
        };
        self.conn.execute(
            "INSERT INTO params_history (symbol, recorded_at, content_hash, record)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.record.symbol,
                entry.recorded_at.format(TIMESTAMP_FMT).to_string(),
                entry.content_hash,
                serde_json::to_string(&entry)?,
            ],
        )?;
        Ok(())
    }

    fn write_record(&self, record: &StockParamsRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO stock_params
                 (symbol, best_params, meta_info, performance, last_updated, source_file)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(symbol) DO UPDATE SET
                 best_params = excluded.best_params,
                 meta_info = excluded.meta_info,
                 performance = excluded.performance,
                 last_updated = excluded.last_updated,
                 source_file = excluded.source_file",
            params![
                record.symbol,
                serde_json::to_string(&record.best_params)?,
                serde_json::to_string(&record.meta_info)?,
                serde_json::to_string(&record.performance)?,
                record.last_updated.format(TIMESTAMP_FMT).to_string(),
                record.source_file,
            ],
        )?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FMT)
        .map_err(|e| StoreError::Backend(format!("bad timestamp {raw:?}: {e}")))
}

impl ParamsStore for SqliteStore {
    fn get_stock_params(&self, symbol: &str) -> Result<Option<StockParamsRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT best_params, meta_info, performance, last_updated, source_file
                 FROM stock_params WHERE symbol = ?1",
                params![symbol],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((best_params, meta_info, performance, last_updated, source_file)) => {
                Ok(Some(StockParamsRecord {
                    symbol: symbol.to_string(),
                    best_params: serde_json::from_str(&best_params)?,
                    meta_info: serde_json::from_str(&meta_info)?,
                    performance: serde_json::from_str(&performance)?,
                    last_updated: parse_timestamp(&last_updated)?,
                    source_file,
                }))
            }
        }
    }

    fn update(&mut self, record: StockParamsRecord) -> Result<UpdateOutcome, StoreError> {
        let existing = self.get_stock_params(&record.symbol)?;
        match decide_update(existing.as_ref(), &record)? {
            UpdateDecision::SkipStale => Ok(UpdateOutcome::SkippedStale),
            UpdateDecision::SkipIdentical => Ok(UpdateOutcome::SkippedIdentical),
            UpdateDecision::Insert => {
                self.write_record(&record)?;
                self.append_history(&record)?;
                Ok(UpdateOutcome::Inserted)
            }
            UpdateDecision::Replace => {
                self.write_record(&record)?;
                self.append_history(&record)?;
                Ok(UpdateOutcome::Replaced)
            }
        }
    }

    fn history(&self, symbol: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM params_history WHERE symbol = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![symbol], |row| row.get::<_, String>(0))?;
        let mut entries = Vec::new();
        for raw in rows {
            entries.push(serde_json::from_str(&raw?)?);
        }
        Ok(entries)
    }

    fn symbols(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT symbol FROM stock_params ORDER BY symbol")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut symbols = Vec::new();
        for s in rows {
            symbols.push(s?);
        }
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_record;
    use chrono::Timelike;

    #[test]
    fn insert_then_get_round_trips() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let record = sample_record("2330", 10);
        assert_eq!(store.update(record.clone()).unwrap(), UpdateOutcome::Inserted);
        let loaded = store.get_stock_params("2330").unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn sub_second_timestamps_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut record = sample_record("2330", 10);
        record.last_updated = record
            .last_updated
            .with_nanosecond(123_456_789)
            .unwrap();
        store.update(record.clone()).unwrap();

        let loaded = store.get_stock_params("2330").unwrap().unwrap();
        assert_eq!(loaded.last_updated, record.last_updated);
        assert_eq!(loaded, record);

        // Equal timestamp is not strictly newer: re-applying the same
        // record is a stale skip, never a spurious replace
        assert_eq!(store.update(record).unwrap(), UpdateOutcome::SkippedStale);
    }

    #[test]
    fn stale_update_leaves_record_and_history_untouched() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let newer = sample_record("2330", 20);
        store.update(newer.clone()).unwrap();

        let mut stale = sample_record("2330", 10);
        stale.meta_info.lookahead = 7;
        assert_eq!(store.update(stale).unwrap(), UpdateOutcome::SkippedStale);

        assert_eq!(store.get_stock_params("2330").unwrap().unwrap(), newer);
        assert_eq!(store.history("2330").unwrap().len(), 1);
    }

    #[test]
    fn identical_content_adds_no_history_row() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.update(sample_record("2330", 10)).unwrap();
        assert_eq!(
            store.update(sample_record("2330", 17)).unwrap(),
            UpdateOutcome::SkippedIdentical
        );
        assert_eq!(store.history("2330").unwrap().len(), 1);
    }

    #[test]
    fn content_change_appends_history() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.update(sample_record("2330", 10)).unwrap();
        let mut changed = sample_record("2330", 17);
        changed.meta_info.lookahead = 14;
        assert_eq!(store.update(changed).unwrap(), UpdateOutcome::Replaced);

        let history = store.history("2330").unwrap();
        assert_eq!(history.len(), 2);
        assert_ne!(history[0].content_hash, history[1].content_hash);
    }

    #[test]
    fn symbols_are_sorted() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.update(sample_record("2454", 10)).unwrap();
        store.update(sample_record("0050", 10)).unwrap();
        store.update(sample_record("2330", 10)).unwrap();
        assert_eq!(store.symbols().unwrap(), vec!["0050", "2330", "2454"]);
    }
}
