//! Per-symbol calibration and batch orchestration.
//!
//! One symbol: classify the regime, optimize the strategy's parameters
//! against it, then evaluate the winner in train mode (the honest numbers)
//! and in check mode (the display numbers). A batch is the same thing over
//! many symbols with per-symbol failure isolation — one bad symbol is
//! reported, never fatal.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sigcal_core::domain::Bar;
use sigcal_core::evaluate::{evaluate, evaluate_with_outcomes, EvalConfig, Evaluation};
use sigcal_core::regime::{self, RegimeError, RegimeSummary};
use sigcal_core::strategy::{strategy, IndicatorParams, Mode, ReversalTag, StrategyKind};

use crate::data_loader::BarProvider;
use crate::optimize::{run_optimization, OptimizerConfig};
use crate::store::{MetaInfo, ParamsStore, StockParamsRecord, StoreError};

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("insufficient data for {symbol}: got {got} bars, need {need}")]
    DataInsufficient {
        symbol: String,
        got: usize,
        need: usize,
    },
    #[error("unsupported strategy: {0}")]
    UnsupportedStrategy(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("optimizer error: {0}")]
    Optimizer(String),
}

/// Settings shared by every symbol in a run.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub optimizer: OptimizerConfig,
    /// Most recent bars to calibrate on.
    pub max_bars: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            optimizer: OptimizerConfig::default(),
            max_bars: 1000,
        }
    }
}

/// One scored signal bar, kept for the signals CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: f64,
    pub tag: ReversalTag,
    pub strong: bool,
    pub win: bool,
}

/// Everything calibration learned about one symbol.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub regime: RegimeSummary,
    pub best_params: IndicatorParams,
    pub best_score: f64,
    /// Train-mode evaluation; this is what the optimizer saw.
    pub performance: Evaluation,
    /// Check-mode evaluation, with forward confirmation. Display only.
    pub check_performance: Evaluation,
    /// Scored train-mode signal bars, chronological.
    pub signal_rows: Vec<SignalRow>,
}

impl CalibrationOutcome {
    pub fn meta_info(&self) -> MetaInfo {
        MetaInfo {
            strategy: self.strategy.as_str().to_string(),
            period_end: self.regime.latest.period_end,
            volatility: self.regime.latest.historical_volatility,
            lookahead: self.regime.lookahead,
            target_multiplier: self.regime.target_multiplier,
            atr_period: self.regime.atr_period,
            signal_target_percent: self.regime.density_target,
        }
    }

    /// Store record for this outcome, stamped now.
    pub fn to_record(&self, source_file: &str) -> StockParamsRecord {
        StockParamsRecord {
            symbol: self.symbol.clone(),
            best_params: self.best_params.clone(),
            meta_info: self.meta_info(),
            performance: self.performance.clone(),
            last_updated: Utc::now().naive_utc(),
            source_file: source_file.to_string(),
        }
    }
}

/// Calibrate one symbol on already-loaded bars.
pub fn calibrate_symbol(
    symbol: &str,
    bars: &[Bar],
    kind: StrategyKind,
    config: &CalibrationConfig,
) -> Result<CalibrationOutcome, CalibrationError> {
    let strat = strategy(kind);

    let need = regime::MIN_BARS.max(strat.min_bars());
    if bars.len() < need {
        return Err(CalibrationError::DataInsufficient {
            symbol: symbol.to_string(),
            got: bars.len(),
            need,
        });
    }

    let regime = regime::classify(bars).map_err(|e| match e {
        RegimeError::DataInsufficient { got, need } => CalibrationError::DataInsufficient {
            symbol: symbol.to_string(),
            got,
            need,
        },
    })?;

    let eval_config = EvalConfig {
        lookahead: regime.lookahead,
        target_multiplier: regime.target_multiplier,
        atr_period: regime.atr_period,
        strict_win_check: strat.strict_win_check(),
    };
    let density_target_count = regime.density_target * bars.len() as f64;

    let optimization = run_optimization(
        bars,
        strat.as_ref(),
        eval_config,
        density_target_count,
        symbol,
        &config.optimizer,
    )
    .map_err(|e| CalibrationError::Optimizer(e.to_string()))?;

    let best_params = strat
        .params_from_point(&optimization.best.point)
        .map_err(|e| CalibrationError::Optimizer(e.to_string()))?;

    // Train-mode detection with the winning params feeds both the stored
    // performance and the exported signal rows
    let train_frame = strat
        .calculate(bars, &best_params, Mode::Train)
        .map_err(|e| CalibrationError::Optimizer(e.to_string()))?;
    let (performance, outcomes) = evaluate_with_outcomes(bars, &train_frame, &eval_config);

    let check_frame = strat
        .calculate(bars, &best_params, Mode::Check)
        .map_err(|e| CalibrationError::Optimizer(e.to_string()))?;
    let check_performance = evaluate(bars, &check_frame, &eval_config);

    let signal_rows = outcomes
        .iter()
        .map(|o| SignalRow {
            date: bars[o.index].date,
            close: bars[o.index].close,
            tag: o.tag,
            strong: o.strong,
            win: o.win,
        })
        .collect();

    Ok(CalibrationOutcome {
        symbol: symbol.to_string(),
        strategy: kind,
        regime,
        best_params,
        best_score: optimization.best.score,
        performance,
        check_performance,
        signal_rows,
    })
}

/// Result of a batch run: successes, skips, and isolated failures.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<CalibrationOutcome>,
    /// Symbols the provider had no data for.
    pub skipped: Vec<String>,
    pub failures: Vec<(String, CalibrationError)>,
}

/// Calibrate many symbols, optionally persisting each winner to a store.
///
/// `progress` is called after each symbol with (done, total, symbol).
pub fn calibrate_batch(
    provider: &dyn BarProvider,
    symbols: &[String],
    kind: StrategyKind,
    config: &CalibrationConfig,
    mut store: Option<&mut dyn ParamsStore>,
    source_file: &str,
    progress: Option<&dyn Fn(usize, usize, &str)>,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = symbols.len();

    for (done, symbol) in symbols.iter().enumerate() {
        match provider.get_bars(symbol, config.max_bars) {
            Err(e) => {
                report
                    .failures
                    .push((symbol.clone(), CalibrationError::Provider(e.to_string())));
            }
            Ok(None) => report.skipped.push(symbol.clone()),
            Ok(Some(bars)) => match calibrate_symbol(symbol, &bars, kind, config) {
                Err(e) => report.failures.push((symbol.clone(), e)),
                Ok(outcome) => {
                    if let Some(st) = store.as_mut() {
                        if let Err(e) = st.update(outcome.to_record(source_file)) {
                            report.failures.push((symbol.clone(), e.into()));
                        }
                    }
                    report.outcomes.push(outcome);
                }
            },
        }
        if let Some(cb) = progress {
            cb(done + 1, total, symbol);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::LoadError;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct MapProvider {
        data: HashMap<String, Vec<Bar>>,
        fail: Vec<String>,
    }

    impl BarProvider for MapProvider {
        fn get_bars(&self, symbol: &str, max_count: usize) -> Result<Option<Vec<Bar>>, LoadError> {
            if self.fail.iter().any(|s| s == symbol) {
                return Err(LoadError::Provider("simulated outage".to_string()));
            }
            Ok(self.data.get(symbol).map(|bars| {
                let skip = bars.len().saturating_sub(max_count);
                bars[skip..].to_vec()
            }))
        }
    }

    fn wave_bars(symbol: &str, n: usize) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + 12.0 * (i as f64 * 2.0 * std::f64::consts::PI / 40.0).sin();
                Bar {
                    symbol: symbol.to_string(),
                    date: base_date + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.5,
                    low: close - 1.5,
                    close,
                    volume: 1000,
                }
            })
            .collect()
    }

    fn quick_config() -> CalibrationConfig {
        CalibrationConfig {
            optimizer: OptimizerConfig {
                n_optimizations: 2,
                trial: crate::optimize::TrialConfig {
                    evals: 30,
                    patience: 30,
                    min_delta: 0.001,
                },
                master_seed: 42,
            },
            max_bars: 1000,
        }
    }

    #[test]
    fn short_history_is_data_insufficient() {
        let bars = wave_bars("2330", 50);
        let err = calibrate_symbol("2330", &bars, StrategyKind::Kd, &quick_config()).unwrap_err();
        assert!(matches!(err, CalibrationError::DataInsufficient { .. }));
    }

    #[test]
    fn batch_isolates_failures_and_skips() {
        let mut data = HashMap::new();
        data.insert("GOOD".to_string(), wave_bars("GOOD", 200));
        data.insert("SHORT".to_string(), wave_bars("SHORT", 30));
        let provider = MapProvider {
            data,
            fail: vec!["FLAKY".to_string()],
        };
        let symbols: Vec<String> = ["GOOD", "SHORT", "MISSING", "FLAKY"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let report = calibrate_batch(
            &provider,
            &symbols,
            StrategyKind::Kd,
            &quick_config(),
            None,
            "test",
            None,
        );

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].symbol, "GOOD");
        assert_eq!(report.skipped, vec!["MISSING".to_string()]);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn progress_reports_every_symbol() {
        let provider = MapProvider {
            data: HashMap::new(),
            fail: Vec::new(),
        };
        let symbols: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let seen = std::cell::RefCell::new(Vec::new());
        let cb = |done: usize, total: usize, symbol: &str| {
            seen.borrow_mut().push((done, total, symbol.to_string()));
        };
        calibrate_batch(
            &provider,
            &symbols,
            StrategyKind::Rsi,
            &quick_config(),
            None,
            "test",
            Some(&cb),
        );
        assert_eq!(
            *seen.borrow(),
            vec![
                (1, 3, "A".to_string()),
                (2, 3, "B".to_string()),
                (3, 3, "C".to_string()),
            ]
        );
    }
}
