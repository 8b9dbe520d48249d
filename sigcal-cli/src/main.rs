//! `sigcal` command line: batch calibration, stored-parameter checks, and
//! parameter-store maintenance.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use sigcal_core::evaluate::{evaluate, EvalConfig, Evaluation};
use sigcal_core::strategy::{strategy, Mode, StrategyKind};
use sigcal_runner::config::EngineConfig;
use sigcal_runner::data_loader::{BarProvider, CsvBarProvider};
use sigcal_runner::export::{write_params_summary, write_signals_csv};
use sigcal_runner::store::{backup_to_file, import_params, open_store, restore_from_file};
use sigcal_runner::calibrate_batch;

#[derive(Parser)]
#[command(name = "sigcal", about = "Per-symbol reversal signal calibration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate every configured symbol and export signals and parameters
    Calibrate {
        /// Path to the engine TOML config
        #[arg(long, default_value = "sigcal.toml")]
        config: PathBuf,
    },

    /// Re-score one symbol with its stored parameters, forward-confirmed
    Check {
        /// Path to the engine TOML config
        #[arg(long, default_value = "sigcal.toml")]
        config: PathBuf,

        /// Symbol to check
        symbol: String,
    },

    /// Parameter store maintenance
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },
}

#[derive(Subcommand)]
enum ParamsAction {
    /// Merge an exported analysis_params JSON file into the store
    Import {
        #[arg(long, default_value = "sigcal.toml")]
        config: PathBuf,

        /// Results file, e.g. analysis_params_20250317.json
        file: PathBuf,
    },

    /// Dump every stored record to a portable JSON backup
    Backup {
        #[arg(long, default_value = "sigcal.toml")]
        config: PathBuf,

        /// Backup file to write
        out: PathBuf,
    },

    /// Replay a backup file into the store
    Restore {
        #[arg(long, default_value = "sigcal.toml")]
        config: PathBuf,

        /// Backup file to read
        file: PathBuf,
    },

    /// Print one symbol's stored record and its change history
    Show {
        #[arg(long, default_value = "sigcal.toml")]
        config: PathBuf,

        /// Symbol to inspect
        symbol: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Calibrate { config } => run_calibrate(&config),
        Commands::Check { config, symbol } => run_check(&config, &symbol),
        Commands::Params { action } => match action {
            ParamsAction::Import { config, file } => run_import(&config, &file),
            ParamsAction::Backup { config, out } => run_backup(&config, &out),
            ParamsAction::Restore { config, file } => run_restore(&config, &file),
            ParamsAction::Show { config, symbol } => run_show(&config, &symbol),
        },
    }
}

fn run_calibrate(config_path: &Path) -> Result<()> {
    let engine = EngineConfig::from_path(config_path)?;
    let kind = engine.strategy_kind()?;
    if engine.symbols.is_empty() {
        bail!("no symbols configured in {}", config_path.display());
    }

    let provider = CsvBarProvider::new(&engine.data_dir);
    let mut store = open_store(&engine.store)?;
    let calibration = engine.calibration_config();
    let source_file = config_path.display().to_string();

    println!(
        "Calibrating {} symbol(s) with {} on {} trials x {} evals",
        engine.symbols.len(),
        kind.as_str(),
        engine.n_optimizations,
        engine.evals,
    );

    let progress = |done: usize, total: usize, symbol: &str| {
        println!("[{done}/{total}] {symbol}");
    };
    let report = calibrate_batch(
        &provider,
        &engine.symbols,
        kind,
        &calibration,
        Some(store.as_mut()),
        &source_file,
        Some(&progress),
    );

    let stamp = chrono::Local::now().date_naive();
    for outcome in &report.outcomes {
        let path = write_signals_csv(outcome, &engine.output_dir, stamp)?;
        println!(
            "{}: score {:.4}, {} signal bar(s) -> {}",
            outcome.symbol,
            outcome.best_score,
            outcome.signal_rows.len(),
            path.display(),
        );
    }
    if !report.outcomes.is_empty() {
        let summary = write_params_summary(&report.outcomes, &engine.output_dir, stamp)?;
        println!("Parameter summary: {}", summary.display());
    }

    for symbol in &report.skipped {
        println!("Skipped (no data): {symbol}");
    }
    for (symbol, err) in &report.failures {
        eprintln!("Error for {symbol}: {err}");
    }
    println!(
        "Done. {} calibrated, {} skipped, {} failed.",
        report.outcomes.len(),
        report.skipped.len(),
        report.failures.len(),
    );

    if !report.failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_check(config_path: &Path, symbol: &str) -> Result<()> {
    let engine = EngineConfig::from_path(config_path)?;
    let store = open_store(&engine.store)?;

    let Some(record) = store.get_stock_params(symbol)? else {
        bail!("no stored parameters for {symbol}");
    };
    let Some(kind) = StrategyKind::from_name(&record.meta_info.strategy) else {
        bail!("stored record has unknown strategy: {}", record.meta_info.strategy);
    };

    let provider = CsvBarProvider::new(&engine.data_dir);
    let Some(bars) = provider.get_bars(symbol, engine.max_bars)? else {
        bail!("no data file for {symbol} under {}", engine.data_dir.display());
    };

    let strat = strategy(kind);
    let frame = strat.calculate(&bars, &record.best_params, Mode::Check)?;
    let eval_config = EvalConfig {
        lookahead: record.meta_info.lookahead,
        target_multiplier: record.meta_info.target_multiplier,
        atr_period: record.meta_info.atr_period,
        strict_win_check: strat.strict_win_check(),
    };
    let check = evaluate(&bars, &frame, &eval_config);

    println!("=== Check: {symbol} ({}) ===", kind.as_str());
    println!("Calibrated:     {}", record.last_updated.format("%Y-%m-%d %H:%M:%S"));
    println!("Bars:           {}", bars.len());
    println!("Lookahead:      {}", record.meta_info.lookahead);
    println!("Target mult:    {:.3}", record.meta_info.target_multiplier);
    println!("Params:         {}", serde_json::to_string(&record.best_params)?);
    println!();
    print_evaluation("Confirmed", &check);
    println!();
    print_evaluation("Calibrated (train-mode)", &record.performance);
    Ok(())
}

fn print_evaluation(label: &str, eval: &Evaluation) {
    println!("--- {label} ---");
    println!(
        "Support:        {:>4} signals, win rate {:.1}%, z {:.2}",
        eval.support_count,
        eval.support_win_rate * 100.0,
        eval.support_z_score,
    );
    println!(
        "  strong:       {:>4} signals, win rate {:.1}%",
        eval.strong_support_count,
        eval.strong_support_win_rate * 100.0,
    );
    println!(
        "Resistance:     {:>4} signals, win rate {:.1}%, z {:.2}",
        eval.resistance_count,
        eval.resistance_win_rate * 100.0,
        eval.resistance_z_score,
    );
    println!(
        "  strong:       {:>4} signals, win rate {:.1}%",
        eval.strong_resistance_count,
        eval.strong_resistance_win_rate * 100.0,
    );
}

fn run_import(config_path: &Path, file: &Path) -> Result<()> {
    let engine = EngineConfig::from_path(config_path)?;
    let mut store = open_store(&engine.store)?;
    let summary = import_params(store.as_mut(), file)
        .with_context(|| format!("failed to import {}", file.display()))?;
    println!(
        "Imported {}: {} applied, {} skipped.",
        file.display(),
        summary.applied,
        summary.skipped,
    );
    Ok(())
}

fn run_backup(config_path: &Path, out: &Path) -> Result<()> {
    let engine = EngineConfig::from_path(config_path)?;
    let store = open_store(&engine.store)?;
    let count = backup_to_file(store.as_ref(), out)?;
    println!("Backed up {count} record(s) to {}", out.display());
    Ok(())
}

fn run_restore(config_path: &Path, file: &Path) -> Result<()> {
    let engine = EngineConfig::from_path(config_path)?;
    let mut store = open_store(&engine.store)?;
    let count = restore_from_file(store.as_mut(), file)?;
    println!("Restored {count} record(s) from {}", file.display());
    Ok(())
}

fn run_show(config_path: &Path, symbol: &str) -> Result<()> {
    let engine = EngineConfig::from_path(config_path)?;
    let store = open_store(&engine.store)?;

    let Some(record) = store.get_stock_params(symbol)? else {
        bail!("no stored parameters for {symbol}");
    };

    println!("=== {symbol} ===");
    println!("Strategy:       {}", record.meta_info.strategy);
    println!("Last updated:   {}", record.last_updated.format("%Y-%m-%d %H:%M:%S"));
    println!("Source:         {}", record.source_file);
    println!("Period end:     {}", record.meta_info.period_end);
    println!("Volatility:     {:.4}", record.meta_info.volatility);
    println!("Lookahead:      {}", record.meta_info.lookahead);
    println!("ATR period:     {}", record.meta_info.atr_period);
    println!("Target mult:    {:.3}", record.meta_info.target_multiplier);
    println!("Density target: {:.3}", record.meta_info.signal_target_percent);
    println!("Params:         {}", serde_json::to_string_pretty(&record.best_params)?);
    print_evaluation("Performance", &record.performance);

    let history = store.history(symbol)?;
    println!();
    println!("History: {} change(s)", history.len());
    for entry in &history {
        println!(
            "  {}  {}  via {}",
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            &entry.content_hash[..12],
            entry.record.source_file,
        );
    }
    Ok(())
}
