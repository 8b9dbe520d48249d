//! Stochastic oscillator (%K / %D).
//!
//! %K = 100 * (close - lowest_low(k)) / (highest_high(k) - lowest_low(k))
//! %D = rolling mean of %K over d bars (full-window, so %D warms up later).
//! A zero high-low range yields NaN for that bar rather than a divide blowup.

use crate::domain::Bar;
use crate::indicators::rolling::{rolling_max, rolling_mean, rolling_min};

/// Compute the stochastic %K and %D series. Returns (k, d).
pub fn stochastic_kd(bars: &[Bar], k_period: usize, d_period: usize) -> (Vec<f64>, Vec<f64>) {
    let n = bars.len();
    if n == 0 || k_period == 0 || d_period == 0 {
        return (vec![f64::NAN; n], vec![f64::NAN; n]);
    }

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let hh = rolling_max(&highs, k_period, k_period);
    let ll = rolling_min(&lows, k_period, k_period);

    let mut k = vec![f64::NAN; n];
    for i in 0..n {
        let range = hh[i] - ll[i];
        let close = bars[i].close;
        if range.is_nan() || close.is_nan() || range == 0.0 {
            continue;
        }
        k[i] = 100.0 * (close - ll[i]) / range;
    }

    let d = rolling_mean(&k, d_period, d_period);
    (k, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn k_warmup_is_nan() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let (k, d) = stochastic_kd(&bars, 9, 3);
        for v in &k[..8] {
            assert!(v.is_nan());
        }
        assert!(!k[8].is_nan());
        // %D needs 3 valid %K values
        assert!(d[9].is_nan());
        assert!(!d[10].is_nan());
    }

    #[test]
    fn k_at_top_of_range() {
        // Monotonic up: window high = close+1, window low = close-10,
        // so %K sits just under the top of the range.
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let (k, _) = stochastic_kd(&bars, 9, 3);
        assert_approx(k[20], 100.0 * 10.0 / 11.0, DEFAULT_EPSILON);
    }

    #[test]
    fn k_bounded() {
        let closes: Vec<f64> = (0..100)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.5).sin())
            .collect();
        let bars = make_bars(&closes);
        let (k, d) = stochastic_kd(&bars, 9, 3);
        for &v in k.iter().chain(d.iter()) {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "stochastic out of range: {v}");
            }
        }
    }

    #[test]
    fn zero_range_window_is_nan() {
        let mut bars = make_bars(&[100.0; 20]);
        for b in &mut bars {
            b.high = 100.0;
            b.low = 100.0;
        }
        let (k, _) = stochastic_kd(&bars, 9, 3);
        assert!(k.iter().all(|v| v.is_nan()));
    }
}
