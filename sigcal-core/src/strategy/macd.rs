//! MACD reversal strategy.
//!
//! The oscillator is the fast/slow EMA difference normalized by ATR over the
//! slow period and scaled by 100, so readings are comparable across price
//! levels. A support reversal is an oscillator-over-signal-line cross while
//! positive and below the extremity cap; resistance mirrors. Parameter sets
//! where the fast period crowds the slow one are degenerate and emit no
//! signals at all, which the density penalty prices at zero.

use crate::domain::Bar;
use crate::evaluate::Evaluation;
use crate::indicators::{atr, ema};
use crate::strategy::{
    density_penalty, harmonic, IndicatorParams, MacdParams, Mode, ParamRange, ReversalStrategy,
    ReversalTag, SignalFrame, StrategyError,
};

pub struct MacdStrategy;

/// Normalized-oscillator magnitude beyond which a cross is treated as an
/// exhaustion move rather than a reversal.
const EXTREMITY_CAP: f64 = 150.0;

const SPACE: [ParamRange; 3] = [
    ParamRange::int("fast_period", 6.0, 18.0),
    ParamRange::int("slow_period", 12.0, 36.0),
    ParamRange::int("signal_period", 6.0, 12.0),
];

impl ReversalStrategy for MacdStrategy {
    fn name(&self) -> &'static str {
        "MACD"
    }

    fn space(&self) -> Vec<ParamRange> {
        SPACE.to_vec()
    }

    fn params_from_point(&self, point: &[f64]) -> Result<IndicatorParams, StrategyError> {
        if point.len() != SPACE.len() {
            return Err(StrategyError::PointDimension {
                expected: SPACE.len(),
                got: point.len(),
            });
        }
        Ok(IndicatorParams::Macd(MacdParams {
            fast_period: SPACE[0].quantize(point[0]) as usize,
            slow_period: SPACE[1].quantize(point[1]) as usize,
            signal_period: SPACE[2].quantize(point[2]) as usize,
        }))
    }

    fn calculate(
        &self,
        bars: &[Bar],
        params: &IndicatorParams,
        mode: Mode,
    ) -> Result<SignalFrame, StrategyError> {
        let p = match params {
            IndicatorParams::Macd(p) => p,
            other => {
                return Err(StrategyError::ParamsMismatch {
                    strategy: self.name(),
                    given: other.strategy_name(),
                })
            }
        };

        let n = bars.len();
        // Fast period crowding the slow one never separates momentum from
        // baseline, so the set is unusable. Empty frame, not an error.
        if p.fast_period as f64 * 1.5 > p.slow_period as f64 {
            return Ok(SignalFrame::all_none(n));
        }

        let (osc, sig) = normalized_macd(bars, p);

        let mut tags = vec![ReversalTag::None; n];
        for i in 1..n {
            let cross_up = osc[i] > sig[i] && osc[i - 1] <= sig[i - 1];
            let cross_down = osc[i] < sig[i] && osc[i - 1] >= sig[i - 1];
            let mut tag = if cross_up && osc[i] > 0.0 && osc[i] < EXTREMITY_CAP {
                ReversalTag::Support
            } else if cross_down && osc[i] < 0.0 && osc[i] > -EXTREMITY_CAP {
                ReversalTag::Resistance
            } else {
                ReversalTag::None
            };

            if mode == Mode::Check && tag.is_signal() {
                let confirmed = match tag {
                    ReversalTag::Support => confirm_support(bars, i),
                    ReversalTag::Resistance => confirm_resistance(bars, i),
                    ReversalTag::None => unreachable!(),
                };
                if !confirmed {
                    tag = ReversalTag::None;
                }
            }

            tags[i] = tag;
        }

        let strong: Vec<bool> = tags.iter().map(|t| t.is_signal()).collect();
        Ok(SignalFrame::new(tags, strong))
    }

    fn score(&self, eval: &Evaluation, density_target_count: f64) -> f64 {
        let base = harmonic(eval.strong_support_win_rate, eval.strong_resistance_win_rate);
        let min_strong = eval.strong_support_count.min(eval.strong_resistance_count);
        base * density_penalty(min_strong, density_target_count / 3.0)
    }

    fn min_bars(&self) -> usize {
        60
    }
}

/// Oscillator and signal line, ATR-normalized.
fn normalized_macd(bars: &[Bar], p: &MacdParams) -> (Vec<f64>, Vec<f64>) {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let fast = ema(&closes, p.fast_period);
    let slow = ema(&closes, p.slow_period);
    let atr_slow = atr(bars, p.slow_period);

    let osc: Vec<f64> = (0..bars.len())
        .map(|i| {
            let a = atr_slow[i];
            if a.is_finite() && a > 0.0 {
                100.0 * (fast[i] - slow[i]) / a
            } else {
                f64::NAN
            }
        })
        .collect();
    let sig = ema(&osc, p.signal_period);
    (osc, sig)
}

/// Forward support confirmation: next bar closes up without gapping above
/// its close, or the second bar closes above both the signal close and the
/// next close.
fn confirm_support(bars: &[Bar], i: usize) -> bool {
    let c = bars[i].close;
    let next_up = bars
        .get(i + 1)
        .is_some_and(|b1| b1.close > c && b1.open <= b1.close);
    let second_holds = match (bars.get(i + 1), bars.get(i + 2)) {
        (Some(b1), Some(b2)) => b2.close > c && b2.close > b1.close,
        _ => false,
    };
    next_up || second_holds
}

fn confirm_resistance(bars: &[Bar], i: usize) -> bool {
    let c = bars[i].close;
    let next_down = bars
        .get(i + 1)
        .is_some_and(|b1| b1.close < c && b1.open >= b1.close);
    let second_holds = match (bars.get(i + 1), bars.get(i + 2)) {
        (Some(b1), Some(b2)) => b2.close < c && b2.close < b1.close,
        _ => false,
    };
    next_down || second_holds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn default_params() -> IndicatorParams {
        IndicatorParams::Macd(MacdParams {
            fast_period: 8,
            slow_period: 24,
            signal_period: 9,
        })
    }

    fn wave() -> Vec<Bar> {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + 15.0 * (i as f64 * 2.0 * std::f64::consts::PI / 50.0).sin())
            .collect();
        make_bars(&closes)
    }

    #[test]
    fn degenerate_fast_slow_pair_emits_no_signals() {
        let strategy = MacdStrategy;
        let params = IndicatorParams::Macd(MacdParams {
            fast_period: 18,
            slow_period: 20,
            signal_period: 9,
        });
        let frame = strategy.calculate(&wave(), &params, Mode::Train).unwrap();
        assert!(frame.tags().iter().all(|t| !t.is_signal()));
    }

    #[test]
    fn cyclical_series_produces_both_sides() {
        let strategy = MacdStrategy;
        let frame = strategy
            .calculate(&wave(), &default_params(), Mode::Train)
            .unwrap();
        assert!(frame.tags().iter().any(|&t| t == ReversalTag::Support));
        assert!(frame.tags().iter().any(|&t| t == ReversalTag::Resistance));
    }

    #[test]
    fn oscillator_is_scale_invariant() {
        let strategy = MacdStrategy;
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + 15.0 * (i as f64 * 2.0 * std::f64::consts::PI / 50.0).sin())
            .collect();
        let small = make_bars(&closes);
        // make_bars pads high/low by a fixed 1.0, so scale that too
        let big: Vec<Bar> = small
            .iter()
            .map(|b| Bar {
                open: b.open * 1000.0,
                high: b.high * 1000.0,
                low: b.low * 1000.0,
                close: b.close * 1000.0,
                ..b.clone()
            })
            .collect();
        let f_small = strategy.calculate(&small, &default_params(), Mode::Train).unwrap();
        let f_big = strategy.calculate(&big, &default_params(), Mode::Train).unwrap();
        assert_eq!(f_small.tags(), f_big.tags());
    }

    #[test]
    fn score_uses_third_of_density_target() {
        let mut eval = Evaluation::default();
        eval.strong_support_win_rate = 0.6;
        eval.strong_resistance_win_rate = 0.6;
        eval.strong_support_count = 2;
        eval.strong_resistance_count = 2;
        // target 6 → effective 2 → penalty 1.0
        let full = MacdStrategy.score(&eval, 6.0);
        assert!((full - 0.6).abs() < 1e-12);
        // target 12 → effective 4 → penalty 0.5
        let half = MacdStrategy.score(&eval, 12.0);
        assert!((half - 0.3).abs() < 1e-12);
    }
}
