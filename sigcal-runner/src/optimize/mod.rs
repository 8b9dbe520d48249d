//! Parallel optimization: many independent TPE trials, best-of selection.
//!
//! Trials share nothing mutable. Each gets its own copy of the bar data and
//! an RNG derived from the master seed by (symbol, trial index), so results
//! are identical regardless of how the rayon pool schedules them.

pub mod tpe;
pub mod trial;

pub use trial::{run_trial, Trial, TrialConfig};

use anyhow::{Context, Result};
use rayon::prelude::*;

use sigcal_core::domain::Bar;
use sigcal_core::evaluate::EvalConfig;
use sigcal_core::seeds::TrialSeeds;
use sigcal_core::strategy::ReversalStrategy;

use crate::objective::Objective;

/// Settings for one full optimization run.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    /// Independent trials to run.
    pub n_optimizations: usize,
    pub trial: TrialConfig,
    pub master_seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            n_optimizations: 20,
            trial: TrialConfig::default(),
            master_seed: 42,
        }
    }
}

/// All trials plus the winner.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub best: Trial,
    pub trials: Vec<Trial>,
}

/// Worker threads for the trial pool: all cores but one, at least one.
pub fn worker_threads() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores.saturating_sub(1).max(1)
}

/// Run `n_optimizations` trials in parallel and select the best.
/// Ties are broken by trial index, so the result is deterministic.
pub fn run_optimization(
    bars: &[Bar],
    strategy: &dyn ReversalStrategy,
    eval_config: EvalConfig,
    density_target_count: f64,
    symbol: &str,
    config: &OptimizerConfig,
) -> Result<OptimizationResult> {
    anyhow::ensure!(config.n_optimizations > 0, "n_optimizations must be at least 1");
    let seeds = TrialSeeds::new(config.master_seed);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads())
        .build()
        .context("failed to build optimizer thread pool")?;

    let trials: Vec<Trial> = pool.install(|| {
        (0..config.n_optimizations as u64)
            .into_par_iter()
            .map(|trial_idx| {
                // Trials are stateless units: private data copy, private RNG
                let trial_bars = bars.to_vec();
                let objective = Objective {
                    bars: &trial_bars,
                    strategy,
                    eval_config,
                    density_target_count,
                };
                let mut rng = seeds.rng_for(symbol, trial_idx);
                run_trial(&objective, &config.trial, &mut rng)
            })
            .collect()
    });

    // Strictly-greater keeps the first of equals
    let mut best = trials[0].clone();
    for t in &trials[1..] {
        if t.score > best.score {
            best = t.clone();
        }
    }

    Ok(OptimizationResult { best, trials })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sigcal_core::strategy::{strategy, StrategyKind};

    fn wave_bars(n: usize) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + 12.0 * (i as f64 * 2.0 * std::f64::consts::PI / 40.0).sin();
                Bar {
                    symbol: "TEST".to_string(),
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

    fn small_config() -> OptimizerConfig {
        OptimizerConfig {
            n_optimizations: 4,
            trial: TrialConfig {
                evals: 40,
                patience: 40,
                min_delta: 0.001,
            },
            master_seed: 42,
        }
    }

    #[test]
    fn optimization_is_reproducible() {
        let bars = wave_bars(200);
        let strat = strategy(StrategyKind::Kd);
        let eval_config = EvalConfig {
            lookahead: 10,
            target_multiplier: 1.0,
            atr_period: 20,
            strict_win_check: true,
        };
        let a = run_optimization(&bars, strat.as_ref(), eval_config, 5.0, "2330", &small_config())
            .unwrap();
        let b = run_optimization(&bars, strat.as_ref(), eval_config, 5.0, "2330", &small_config())
            .unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.trials, b.trials);
    }

    #[test]
    fn best_is_max_of_trials_first_on_tie() {
        let bars = wave_bars(160);
        let strat = strategy(StrategyKind::Rsi);
        let eval_config = EvalConfig {
            lookahead: 10,
            target_multiplier: 1.0,
            atr_period: 20,
            strict_win_check: false,
        };
        let result =
            run_optimization(&bars, strat.as_ref(), eval_config, 3.0, "2330", &small_config())
                .unwrap();
        assert_eq!(result.trials.len(), 4);
        let max = result
            .trials
            .iter()
            .map(|t| t.score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(result.best.score, max);
        let first_max_idx = result.trials.iter().position(|t| t.score == max).unwrap();
        assert_eq!(result.best, result.trials[first_max_idx]);
    }

    #[test]
    fn worker_threads_is_at_least_one() {
        assert!(worker_threads() >= 1);
    }
}
