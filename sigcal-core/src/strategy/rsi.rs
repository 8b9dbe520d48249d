//! RSI reversal strategy.
//!
//! Unlike KD and MACD this one fires while the move is still extending: a
//! support reversal is two consecutive bars below the oversold line with RSI
//! still falling, betting on mean reversion rather than a confirmed cross.
//! Because entries land mid-decline, the evaluator's 3-bar no-new-low guard
//! is disabled for this variant.

use crate::domain::Bar;
use crate::evaluate::Evaluation;
use crate::indicators::wilder_rsi;
use crate::strategy::{
    density_penalty, harmonic, IndicatorParams, Mode, ParamRange, ReversalStrategy, ReversalTag,
    RsiParams, SignalFrame, StrategyError,
};

pub struct RsiStrategy;

const SPACE: [ParamRange; 3] = [
    ParamRange::int("period", 10.0, 25.0),
    ParamRange::float("oversold", 10.0, 30.0, 1.0),
    ParamRange::float("overbought", 70.0, 90.0, 1.0),
];

impl ReversalStrategy for RsiStrategy {
    fn name(&self) -> &'static str {
        "RSI"
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
        Ok(IndicatorParams::Rsi(RsiParams {
            period: SPACE[0].quantize(point[0]) as usize,
            oversold: SPACE[1].quantize(point[1]),
            overbought: SPACE[2].quantize(point[2]),
        }))
    }

    fn calculate(
        &self,
        bars: &[Bar],
        params: &IndicatorParams,
        mode: Mode,
    ) -> Result<SignalFrame, StrategyError> {
        let p = match params {
            IndicatorParams::Rsi(p) => p,
            other => {
                return Err(StrategyError::ParamsMismatch {
                    strategy: self.name(),
                    given: other.strategy_name(),
                })
            }
        };

        let n = bars.len();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let rsi = wilder_rsi(&closes, p.period);

        let mut tags = vec![ReversalTag::None; n];
        for i in 1..n {
            let mut tag = if rsi[i] < p.oversold && rsi[i] < rsi[i - 1] && rsi[i - 1] < p.oversold {
                ReversalTag::Support
            } else if rsi[i] > p.overbought
                && rsi[i] > rsi[i - 1]
                && rsi[i - 1] > p.overbought
            {
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

    fn strict_win_check(&self) -> bool {
        false
    }

    fn min_bars(&self) -> usize {
        40
    }
}

/// Forward support confirmation: one of the next two closes clears the
/// signal bar's high.
fn confirm_support(bars: &[Bar], i: usize) -> bool {
    let h = bars[i].high;
    bars.get(i + 1).is_some_and(|b1| b1.close > h)
        || bars.get(i + 2).is_some_and(|b2| b2.close > h)
}

fn confirm_resistance(bars: &[Bar], i: usize) -> bool {
    let l = bars[i].low;
    bars.get(i + 1).is_some_and(|b1| b1.close < l)
        || bars.get(i + 2).is_some_and(|b2| b2.close < l)
}
