//! Dominant-cycle estimation via a naive DFT periodogram.
//!
//! The input is the per-bar high-low range, demeaned. Power is computed for
//! frequencies k = 1..n/2; the candidate period n/k must land in (5, 60] bars
//! to count. The highest-power candidate wins, and a series with no usable
//! candidate falls back to 20 bars.

use crate::domain::Bar;

const MIN_PERIOD: f64 = 5.0;
const MAX_PERIOD: f64 = 60.0;
const DEFAULT_PERIOD: usize = 20;

/// Estimate the dominant cycle length, in bars, of the bar-range series.
pub fn dominant_cycle(bars: &[Bar]) -> usize {
    let range: Vec<f64> = bars
        .iter()
        .map(|b| b.high - b.low)
        .filter(|v| !v.is_nan())
        .collect();
    let n = range.len();
    if n < 4 {
        return DEFAULT_PERIOD;
    }

    let mean = range.iter().sum::<f64>() / n as f64;
    let demeaned: Vec<f64> = range.iter().map(|v| v - mean).collect();

    // Zero-power candidates (constant range) never beat the default.
    let mut best_period = DEFAULT_PERIOD;
    let mut best_power = 0.0;
    let mut found = false;

    for k in 1..=(n / 2) {
        let period = n as f64 / k as f64;
        if period <= MIN_PERIOD || period > MAX_PERIOD {
            continue;
        }
        let omega = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
        let mut re = 0.0;
        let mut im = 0.0;
        for (t, &v) in demeaned.iter().enumerate() {
            let angle = omega * t as f64;
            re += v * angle.cos();
            im += v * angle.sin();
        }
        let power = re * re + im * im;
        if power > best_power {
            best_power = power;
            // Fractional periods truncate toward zero
            best_period = period as usize;
            found = true;
        }
    }

    if found {
        best_period
    } else {
        DEFAULT_PERIOD
    }
}
