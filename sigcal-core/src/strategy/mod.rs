//! Reversal-signal strategies.
//!
//! Three indicator families (KD, MACD, RSI) detect candidate support and
//! resistance reversals over a bar series. Each strategy publishes a bounded
//! parameter space, maps an optimizer point into typed params, tags every bar
//! with a `ReversalTag`, and scores an `Evaluation` against a signal-density
//! target. Train mode is strictly causal; check mode adds a 1-2 bar forward
//! confirmation and exists for display only, never for optimization.

mod kd;
mod macd;
mod rsi;

pub use kd::KdStrategy;
pub use macd::MacdStrategy;
pub use rsi::RsiStrategy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;
use crate::evaluate::Evaluation;

/// Detection mode, dispatched per `calculate` call.
///
/// `Check` inspects up to two future bars for confirmation and must never be
/// used inside the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Train,
    Check,
}

/// Per-bar reversal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalTag {
    None,
    Support,
    Resistance,
}

impl ReversalTag {
    pub fn is_signal(self) -> bool {
        self != ReversalTag::None
    }
}

/// Tagged output of a strategy over a bar series.
///
/// Invariant: `strong[i]` implies `tags[i] != None`. The constructor
/// enforces it by clearing any strong flag without a signal.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    tags: Vec<ReversalTag>,
    strong: Vec<bool>,
}

impl SignalFrame {
    pub fn new(tags: Vec<ReversalTag>, mut strong: Vec<bool>) -> Self {
        assert_eq!(tags.len(), strong.len(), "tag/strong length mismatch");
        for (s, t) in strong.iter_mut().zip(&tags) {
            if !t.is_signal() {
                *s = false;
            }
        }
        SignalFrame { tags, strong }
    }

    /// Frame with no signals at all, one slot per bar.
    pub fn all_none(len: usize) -> Self {
        SignalFrame {
            tags: vec![ReversalTag::None; len],
            strong: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[ReversalTag] {
        &self.tags
    }

    pub fn strong(&self) -> &[bool] {
        &self.strong
    }
}

/// One dimension of a strategy's search space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub name: &'static str,
    pub lo: f64,
    pub hi: f64,
    pub step: f64,
    pub integer: bool,
}

impl ParamRange {
    pub const fn int(name: &'static str, lo: f64, hi: f64) -> Self {
        ParamRange { name, lo, hi, step: 1.0, integer: true }
    }

    pub const fn float(name: &'static str, lo: f64, hi: f64, step: f64) -> Self {
        ParamRange { name, lo, hi, step, integer: false }
    }

    /// Snap a raw optimizer value onto the quantized grid inside [lo, hi].
    pub fn quantize(&self, x: f64) -> f64 {
        let clamped = if x.is_nan() { self.lo } else { x.clamp(self.lo, self.hi) };
        let snapped = self.lo + ((clamped - self.lo) / self.step).round() * self.step;
        let snapped = snapped.clamp(self.lo, self.hi);
        if self.integer {
            snapped.round()
        } else {
            snapped
        }
    }

    /// Draw a uniform quantized value from the range.
    pub fn sample<R: rand::Rng>(&self, rng: &mut R) -> f64 {
        self.quantize(rng.gen_range(self.lo..=self.hi))
    }
}

/// Typed parameters for each strategy variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IndicatorParams {
    Kd(KdParams),
    Macd(MacdParams),
    Rsi(RsiParams),
}

impl IndicatorParams {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            IndicatorParams::Kd(_) => "KD",
            IndicatorParams::Macd(_) => "MACD",
            IndicatorParams::Rsi(_) => "RSI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdParams {
    pub k_period: usize,
    pub d_period: usize,
    pub overbought: f64,
    pub oversold: f64,
    /// Minimum |%K - %D| for a signal to count as strong; `None` means every
    /// signal is strong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("params mismatch: {strategy} strategy given {given} params")]
    ParamsMismatch {
        strategy: &'static str,
        given: &'static str,
    },
    #[error("point has {got} dimensions, space has {expected}")]
    PointDimension { expected: usize, got: usize },
}

/// A reversal-detection strategy over one bounded parameter space.
pub trait ReversalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Search-space dimensions, in the order `params_from_point` consumes.
    fn space(&self) -> Vec<ParamRange>;

    /// Map an optimizer point (one value per space dimension, quantized here)
    /// into typed params.
    fn params_from_point(&self, point: &[f64]) -> Result<IndicatorParams, StrategyError>;

    /// Tag every bar. Train mode sees only bars up to the tagged one.
    fn calculate(
        &self,
        bars: &[Bar],
        params: &IndicatorParams,
        mode: Mode,
    ) -> Result<SignalFrame, StrategyError>;

    /// Scalar fitness of an evaluation, density-penalized.
    fn score(&self, eval: &Evaluation, density_target_count: f64) -> f64;

    /// Whether the evaluator applies the 3-bar rolling-extreme guard.
    fn strict_win_check(&self) -> bool {
        true
    }

    /// Minimum bar count below which the strategy cannot train.
    fn min_bars(&self) -> usize;
}

/// Known strategy variants, parsed from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyKind {
    Kd,
    Macd,
    Rsi,
}

impl StrategyKind {
    pub fn from_name(name: &str) -> Option<StrategyKind> {
        match name.to_ascii_uppercase().as_str() {
            "KD" => Some(StrategyKind::Kd),
            "MACD" => Some(StrategyKind::Macd),
            "RSI" => Some(StrategyKind::Rsi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Kd => "KD",
            StrategyKind::Macd => "MACD",
            StrategyKind::Rsi => "RSI",
        }
    }

    pub const ALL: [StrategyKind; 3] = [StrategyKind::Kd, StrategyKind::Macd, StrategyKind::Rsi];
}

/// Instantiate the strategy for a kind.
pub fn strategy(kind: StrategyKind) -> Box<dyn ReversalStrategy> {
    match kind {
        StrategyKind::Kd => Box::new(KdStrategy),
        StrategyKind::Macd => Box::new(MacdStrategy),
        StrategyKind::Rsi => Box::new(RsiStrategy),
    }
}

/// Harmonic mean of two positive terms, 0 if either is not positive.
pub(crate) fn harmonic(a: f64, b: f64) -> f64 {
    if a > 0.0 && b > 0.0 {
        2.0 / (1.0 / a + 1.0 / b)
    } else {
        0.0
    }
}

/// F1 of precision/recall-style terms, 0 when their sum is not positive.
pub(crate) fn f1(precision: f64, recall: f64) -> f64 {
    let denom = precision + recall;
    if denom > 0.0 {
        2.0 * precision * recall / denom
    } else {
        0.0
    }
}

/// Under-signaling penalty: 1 at or above target, linear below.
pub(crate) fn density_penalty(min_strong_count: usize, target: f64) -> f64 {
    if target <= 0.0 {
        1.0
    } else {
        (min_strong_count as f64 / target).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn frame_constructor_enforces_strong_implies_signal() {
        let frame = SignalFrame::new(
            vec![ReversalTag::None, ReversalTag::Support],
            vec![true, true],
        );
        assert!(!frame.strong()[0]);
        assert!(frame.strong()[1]);
    }

    #[test]
    fn quantize_snaps_and_clamps() {
        let r = ParamRange::int("k_period", 9.0, 21.0);
        assert_eq!(r.quantize(13.6), 14.0);
        assert_eq!(r.quantize(-5.0), 9.0);
        assert_eq!(r.quantize(100.0), 21.0);

        let f = ParamRange::float("threshold", 0.1, 4.0, 0.1);
        assert!((f.quantize(0.234) - 0.2).abs() < 1e-9);
        assert!((f.quantize(5.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sample_stays_in_range() {
        let r = ParamRange::int("d_period", 3.0, 7.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = r.sample(&mut rng);
            assert!((3.0..=7.0).contains(&v));
            assert_eq!(v, v.round());
        }
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(StrategyKind::from_name("kd"), Some(StrategyKind::Kd));
        assert_eq!(StrategyKind::from_name("Macd"), Some(StrategyKind::Macd));
        assert_eq!(StrategyKind::from_name("RSI"), Some(StrategyKind::Rsi));
        assert_eq!(StrategyKind::from_name("bollinger"), None);
    }

    #[test]
    fn params_round_trip_tagged_json() {
        let p = IndicatorParams::Kd(KdParams {
            k_period: 14,
            d_period: 3,
            overbought: 80.0,
            oversold: 20.0,
            strength_threshold: None,
        });
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"strategy\":\"kd\""));
        let back: IndicatorParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn helper_edge_cases() {
        assert_eq!(harmonic(0.0, 0.5), 0.0);
        assert!((harmonic(0.5, 0.5) - 0.5).abs() < 1e-12);
        assert_eq!(f1(0.0, 0.0), 0.0);
        assert!((density_penalty(10, 5.0) - 1.0).abs() < 1e-12);
        assert!((density_penalty(2, 8.0) - 0.25).abs() < 1e-12);
    }
}
