//! Forward win-rate evaluation of a tagged signal frame.
//!
//! A support signal wins when the forward high over the next `lookahead` bars
//! reaches close + ATR·multiplier; under the strict check it must also avoid
//! undercutting the recent 3-bar low. The trailing `lookahead` bars have no
//! complete future window and are excluded from scoring entirely. The runs
//! z-score is a Wald-Wolfowitz diagnostic over the chronological win/lose
//! sequence; it never feeds the optimization score.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{atr, forward_max_high, forward_min_low, rolling_max, rolling_min};
use crate::strategy::{ReversalTag, SignalFrame};

/// Scoring horizon, fixed per symbol by the regime classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub lookahead: usize,
    pub target_multiplier: f64,
    pub atr_period: usize,
    /// Apply the 3-bar rolling-extreme guard to wins.
    pub strict_win_check: bool,
}

/// Aggregate outcome of one (bars, frame, config) evaluation.
/// All rates and recalls are in [0, 1]; zero signals yield zeros.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub support_win_rate: f64,
    pub support_count: usize,
    pub resistance_win_rate: f64,
    pub resistance_count: usize,
    pub strong_support_win_rate: f64,
    pub strong_support_count: usize,
    pub strong_resistance_win_rate: f64,
    pub strong_resistance_count: usize,
    pub support_recall: f64,
    pub resistance_recall: f64,
    pub support_z_score: f64,
    pub resistance_z_score: f64,
}

/// Per-bar scoring detail, kept for signal export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarOutcome {
    pub index: usize,
    pub tag: ReversalTag,
    pub strong: bool,
    pub win: bool,
}

/// Evaluate a signal frame. Panics only if frame length differs from bars.
pub fn evaluate(bars: &[Bar], frame: &SignalFrame, config: &EvalConfig) -> Evaluation {
    evaluate_with_outcomes(bars, frame, config).0
}

/// Evaluate and also return the scoreable per-bar outcomes, in bar order.
pub fn evaluate_with_outcomes(
    bars: &[Bar],
    frame: &SignalFrame,
    config: &EvalConfig,
) -> (Evaluation, Vec<BarOutcome>) {
    let n = bars.len();
    assert_eq!(frame.len(), n, "frame/bars length mismatch");

    let atr_series = atr(bars, config.atr_period);
    let future_high = forward_max_high(bars, config.lookahead);
    let future_low = forward_min_low(bars, config.lookahead);

    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let recent_high = rolling_max(&highs, 3, 1);
    let recent_low = rolling_min(&lows, 3, 1);

    let scoreable_end = n.saturating_sub(config.lookahead);

    let mut outcomes = Vec::new();
    let mut support = SideTally::default();
    let mut resistance = SideTally::default();

    for i in 0..scoreable_end {
        let tag = frame.tags()[i];
        if !tag.is_signal() {
            continue;
        }
        let strong = frame.strong()[i];
        let target_offset = atr_series[i] * config.target_multiplier;

        let win = match tag {
            ReversalTag::Support => {
                let reached = future_high[i] >= bars[i].close + target_offset;
                let held = !config.strict_win_check || recent_low[i] <= future_low[i];
                reached && held
            }
            ReversalTag::Resistance => {
                let reached = future_low[i] <= bars[i].close - target_offset;
                let held = !config.strict_win_check || recent_high[i] >= future_high[i];
                reached && held
            }
            ReversalTag::None => unreachable!(),
        };

        match tag {
            ReversalTag::Support => support.push(strong, win),
            ReversalTag::Resistance => resistance.push(strong, win),
            ReversalTag::None => unreachable!(),
        }
        outcomes.push(BarOutcome { index: i, tag, strong, win });
    }

    let eval = Evaluation {
        support_win_rate: support.win_rate(),
        support_count: support.count,
        resistance_win_rate: resistance.win_rate(),
        resistance_count: resistance.count,
        strong_support_win_rate: support.strong_win_rate(),
        strong_support_count: support.strong_count,
        strong_resistance_win_rate: resistance.strong_win_rate(),
        strong_resistance_count: resistance.strong_count,
        support_recall: support.recall(),
        resistance_recall: resistance.recall(),
        support_z_score: runs_z_score(&support.sequence),
        resistance_z_score: runs_z_score(&resistance.sequence),
    };
    (eval, outcomes)
}

#[derive(Default)]
struct SideTally {
    count: usize,
    wins: usize,
    strong_count: usize,
    strong_wins: usize,
    sequence: Vec<bool>,
}

impl SideTally {
    fn push(&mut self, strong: bool, win: bool) {
        self.count += 1;
        self.sequence.push(win);
        if win {
            self.wins += 1;
        }
        if strong {
            self.strong_count += 1;
            if win {
                self.strong_wins += 1;
            }
        }
    }

    fn win_rate(&self) -> f64 {
        rate(self.wins, self.count)
    }

    fn strong_win_rate(&self) -> f64 {
        rate(self.strong_wins, self.strong_count)
    }

    fn recall(&self) -> f64 {
        rate(self.strong_count, self.count)
    }
}

fn rate(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Wald-Wolfowitz runs z-score over a chronological win/lose sequence.
/// Returns 0 for fewer than 30 trades or a single outcome class.
pub fn runs_z_score(trades: &[bool]) -> f64 {
    let n = trades.len();
    if n < 30 {
        return 0.0;
    }
    let wins = trades.iter().filter(|&&t| t).count();
    let losses = n - wins;
    if wins == 0 || losses == 0 {
        return 0.0;
    }

    let mut runs = 1usize;
    for w in trades.windows(2) {
        if w[0] != w[1] {
            runs += 1;
        }
    }

    let p = 2.0 * wins as f64 * losses as f64;
    let numerator = n as f64 * (runs as f64 - 0.5) - p;
    let denominator = (p * (p - n as f64) / (n as f64 - 1.0)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    numerator / denominator
}
