//! Forward excursion series.
//!
//! For each bar i these report the extreme price reached over the next
//! `lookahead` bars, i.e. positions (i, i + lookahead]. The trailing
//! `lookahead` bars have no complete future window and carry NaN; the
//! evaluator must never score a signal on them.

use crate::domain::Bar;

/// Highest high over the `lookahead` bars after each position.
pub fn forward_max_high(bars: &[Bar], lookahead: usize) -> Vec<f64> {
    forward_extreme(bars, lookahead, |b| b.high, f64::max)
}

/// Lowest low over the `lookahead` bars after each position.
pub fn forward_min_low(bars: &[Bar], lookahead: usize) -> Vec<f64> {
    forward_extreme(bars, lookahead, |b| b.low, f64::min)
}

fn forward_extreme(
    bars: &[Bar],
    lookahead: usize,
    field: impl Fn(&Bar) -> f64,
    pick: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    let n = bars.len();
    let mut out = vec![f64::NAN; n];
    if lookahead == 0 || n <= lookahead {
        return out;
    }

    for i in 0..(n - lookahead) {
        let mut extreme = f64::NAN;
        for bar in &bars[i + 1..=i + lookahead] {
            let v = field(bar);
            if v.is_nan() {
                continue;
            }
            extreme = if extreme.is_nan() { v } else { pick(extreme, v) };
        }
        out[i] = extreme;
    }

    out
}
