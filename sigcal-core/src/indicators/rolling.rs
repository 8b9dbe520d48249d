//! Rolling-window aggregates over f64 series.
//!
//! Windows are trailing and clipped at the start of the series. NaN entries
//! are skipped; a position is NaN when fewer than `min_periods` valid values
//! are in its window.

/// Rolling mean over a trailing `window`, requiring `min_periods` valid values.
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_agg(values, window, min_periods, |acc| {
        acc.iter().sum::<f64>() / acc.len() as f64
    })
}

/// Rolling minimum over a trailing `window`, requiring `min_periods` valid values.
pub fn rolling_min(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_agg(values, window, min_periods, |acc| {
        acc.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

/// Rolling maximum over a trailing `window`, requiring `min_periods` valid values.
pub fn rolling_max(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_agg(values, window, min_periods, |acc| {
        acc.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Simple moving average: rolling mean with a full-window requirement.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    rolling_mean(values, window, window)
}

fn rolling_agg<F>(values: &[f64], window: usize, min_periods: usize, agg: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 {
        return result;
    }
    let min_periods = min_periods.max(1);

    let mut valid: Vec<f64> = Vec::with_capacity(window);
    for i in 0..n {
        let start = i.saturating_sub(window - 1);
        valid.clear();
        for &v in &values[start..=i] {
            if !v.is_nan() {
                valid.push(v);
            }
        }
        if valid.len() >= min_periods {
            result[i] = agg(&valid);
        }
    }
    result
}
