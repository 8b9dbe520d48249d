//! Regime classification.
//!
//! Derives the scoring horizon for a symbol's history before any reversal
//! params are trained: splits the series into near-equal cycle-length groups,
//! measures per-group volatility and typical trend-run length, and turns the
//! latest group into a lookahead window, an ATR excursion multiplier, and a
//! signal-density target. Pure function of the input bars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;
use crate::indicators::{
    atr, dominant_cycle, forward_max_high, forward_min_low, sma,
};

/// Minimum bars required before classification is meaningful.
pub const MIN_BARS: usize = 90;

/// A run must last this many bars to count as a trend.
const MIN_RUN_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum RegimeError {
    #[error("insufficient data: got {got} bars, need {need}")]
    DataInsufficient { got: usize, need: usize },
}

/// One contiguous group of bars with its volatility and trend measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeWindow {
    /// Date of the last bar in the group.
    pub period_end: NaiveDate,
    /// mean(ATR) / mean(close) over the group.
    pub volatility: f64,
    /// Running mean of `volatility` over this and all earlier groups.
    pub historical_volatility: f64,
    /// Mean duration of trend runs ending on or before the group end.
    pub trend_length: f64,
}

/// Classifier output: the horizon parameters every downstream stage uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    /// Dominant cycle length, also the ATR period.
    pub atr_period: usize,
    /// Forward window, in bars, over which a signal is scored.
    pub lookahead: usize,
    /// ATR multiple a winning excursion must reach.
    pub target_multiplier: f64,
    /// Desired fraction of bars carrying a strong signal (e.g. 0.05).
    pub density_target: f64,
    /// The most recent group, which drives the choices above.
    pub latest: RegimeWindow,
}

/// Classify the regime of a bar series.
pub fn classify(bars: &[Bar]) -> Result<RegimeSummary, RegimeError> {
    let n = bars.len();
    if n < MIN_BARS {
        return Err(RegimeError::DataInsufficient { got: n, need: MIN_BARS });
    }

    let atr_period = dominant_cycle(bars);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let atr_series = atr(bars, atr_period);
    let runs = trend_runs(&closes);

    let mut windows = Vec::new();
    let mut vol_sum = 0.0;
    for (gi, (start, end)) in group_bounds(n, atr_period).into_iter().enumerate() {
        let volatility = group_volatility(bars, &closes, start, end, atr_period);
        vol_sum += volatility;
        let historical_volatility = vol_sum / (gi + 1) as f64;
        let ending: Vec<f64> = runs
            .iter()
            .filter(|r| r.end <= end)
            .map(|r| r.len() as f64)
            .collect();
        let trend_length = if ending.is_empty() {
            0.0
        } else {
            ending.iter().sum::<f64>() / ending.len() as f64
        };
        windows.push(RegimeWindow {
            period_end: bars[end].date,
            volatility,
            historical_volatility,
            trend_length,
        });
    }

    // group_bounds always yields at least one group for n >= MIN_BARS
    let latest = windows.last().cloned().unwrap_or(RegimeWindow {
        period_end: bars[n - 1].date,
        volatility: 0.0,
        historical_volatility: 0.0,
        trend_length: 0.0,
    });

    let lookahead = lookahead_for(latest.historical_volatility, latest.trend_length);
    let density_target = density_for(latest.historical_volatility);
    let target_multiplier = target_multiplier(bars, &atr_series, lookahead);

    Ok(RegimeSummary {
        atr_period,
        lookahead,
        target_multiplier,
        density_target,
        latest,
    })
}

fn lookahead_for(hv: f64, trend: f64) -> usize {
    if hv > 0.03 && trend < 7.0 {
        7
    } else if hv < 0.02 && trend > 10.0 {
        14
    } else {
        10
    }
}

fn density_for(hv: f64) -> f64 {
    if hv >= 0.035 {
        0.07
    } else if hv >= 0.010 {
        0.05
    } else {
        0.03
    }
}

/// Split `n` positions into ceil(n/size) near-equal contiguous chunks.
/// Returns inclusive (start, end) index pairs. The first n % k chunks get
/// the extra element.
fn group_bounds(n: usize, size: usize) -> Vec<(usize, usize)> {
    let size = size.max(1);
    let k = n.div_ceil(size);
    let base = n / k;
    let extra = n % k;
    let mut bounds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = if i < extra { base + 1 } else { base };
        bounds.push((start, start + len - 1));
        start += len;
    }
    bounds
}

/// mean(ATR)/mean(close) over one group, with ATR warmed up inside the
/// group so earlier groups' ranges never leak in.
fn group_volatility(bars: &[Bar], closes: &[f64], start: usize, end: usize, period: usize) -> f64 {
    let atr_group = atr(&bars[start..=end], period);
    let atr_mean = finite_mean(&atr_group);
    let close_mean = finite_mean(&closes[start..=end]);
    if close_mean > 0.0 && atr_mean.is_finite() {
        atr_mean / close_mean
    } else {
        0.0
    }
}

fn finite_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrendState {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    end: usize,
}

impl Run {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Detect trend runs from SMA(5)/SMA(10)/SMA(15) alignment.
/// A bar is up-trending while the short MA sits above the mid above the long
/// and the short MA is rising; down mirrors. Runs shorter than MIN_RUN_LEN
/// are discarded, and the first and last run of the series are dropped as
/// boundary artifacts.
fn trend_runs(closes: &[f64]) -> Vec<Run> {
    let s5 = sma(closes, 5);
    let s10 = sma(closes, 10);
    let s15 = sma(closes, 15);

    let n = closes.len();
    let mut states = vec![TrendState::Flat; n];
    for i in 1..n {
        if s5[i].is_nan() || s10[i].is_nan() || s15[i].is_nan() || s5[i - 1].is_nan() {
            continue;
        }
        if s5[i] > s10[i] && s10[i] > s15[i] && s5[i] > s5[i - 1] {
            states[i] = TrendState::Up;
        } else if s5[i] < s10[i] && s10[i] < s15[i] && s5[i] < s5[i - 1] {
            states[i] = TrendState::Down;
        }
    }

    let mut runs = Vec::new();
    let mut current: Option<(TrendState, usize)> = None;
    for (i, &state) in states.iter().enumerate() {
        match (state, current) {
            (TrendState::Flat, Some((_, start))) => {
                runs.push(Run { start, end: i - 1 });
                current = None;
            }
            (TrendState::Flat, None) => {}
            (s, Some((cs, start))) if s != cs => {
                runs.push(Run { start, end: i - 1 });
                current = Some((s, i));
            }
            (s, None) => current = Some((s, i)),
            _ => {}
        }
    }
    if let Some((_, start)) = current {
        runs.push(Run { start, end: n - 1 });
    }

    if runs.len() <= 2 {
        return Vec::new();
    }
    runs[1..runs.len() - 1]
        .iter()
        .filter(|r| r.len() >= MIN_RUN_LEN)
        .copied()
        .collect()
}

/// Mean ATR multiple of the forward excursion, both directions pooled.
/// Falls back to 1.0 when no bar has a finite term.
fn target_multiplier(bars: &[Bar], atr_series: &[f64], lookahead: usize) -> f64 {
    let fh = forward_max_high(bars, lookahead);
    let fl = forward_min_low(bars, lookahead);
    let mut sum = 0.0;
    let mut count = 0usize;
    for i in 0..bars.len() {
        let a = atr_series[i];
        if !a.is_finite() || a <= 0.0 {
            continue;
        }
        let up = (fh[i] - bars[i].close) / a;
        let down = (bars[i].close - fl[i]) / a;
        if up.is_finite() {
            sum += up;
            count += 1;
        }
        if down.is_finite() {
            sum += down;
            count += 1;
        }
    }
    if count == 0 {
        1.0
    } else {
        sum / count as f64
    }
}
