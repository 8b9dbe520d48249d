//! Numeric primitives used by the regime classifier, strategies, and evaluator.
//!
//! All series functions are whole-series and NaN-aware: invalid or warmup
//! positions carry NaN, and every comparison against NaN downstream reads as
//! "condition not met". Nothing here is incremental — the engine operates on
//! one closed historical window per invocation.

pub mod atr;
pub mod ema;
pub mod forward;
pub mod periodogram;
pub mod rolling;
pub mod rsi;
pub mod stochastic;

pub use atr::{atr, true_range};
pub use ema::ema;
pub use forward::{forward_max_high, forward_min_low};
pub use periodogram::dominant_cycle;
pub use rolling::{rolling_max, rolling_mean, rolling_min, sma};
pub use rsi::wilder_rsi;
pub use stochastic::stochastic_kd;

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
