//! KD (stochastic) reversal strategy.
//!
//! A support reversal is a %K-over-%D cross while %D sits below the oversold
//! line; resistance mirrors above the overbought line. Scored by the harmonic
//! mean of per-side F1(strong win rate, recall), so a parameter set has to
//! produce wins on both sides to survive.

use crate::domain::Bar;
use crate::evaluate::Evaluation;
use crate::indicators::stochastic_kd;
use crate::strategy::{
    density_penalty, f1, harmonic, IndicatorParams, KdParams, Mode, ParamRange, ReversalStrategy,
    ReversalTag, SignalFrame, StrategyError,
};

pub struct KdStrategy;

const SPACE: [ParamRange; 4] = [
    ParamRange::int("k_period", 9.0, 21.0),
    ParamRange::int("d_period", 3.0, 7.0),
    ParamRange::float("overbought", 55.0, 90.0, 1.0),
    ParamRange::float("oversold", 10.0, 45.0, 1.0),
];

impl ReversalStrategy for KdStrategy {
    fn name(&self) -> &'static str {
        "KD"
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
        Ok(IndicatorParams::Kd(KdParams {
            k_period: SPACE[0].quantize(point[0]) as usize,
            d_period: SPACE[1].quantize(point[1]) as usize,
            overbought: SPACE[2].quantize(point[2]),
            oversold: SPACE[3].quantize(point[3]),
            strength_threshold: None,
        }))
    }

    fn calculate(
        &self,
        bars: &[Bar],
        params: &IndicatorParams,
        mode: Mode,
    ) -> Result<SignalFrame, StrategyError> {
        let p = match params {
            IndicatorParams::Kd(p) => p,
            other => {
                return Err(StrategyError::ParamsMismatch {
                    strategy: self.name(),
                    given: other.strategy_name(),
                })
            }
        };

        let n = bars.len();
        let (k, d) = stochastic_kd(bars, p.k_period, p.d_period);

        let mut tags = vec![ReversalTag::None; n];
        let mut strong = vec![false; n];
        for i in 1..n {
            let cross_up = k[i] > d[i] && k[i - 1] <= d[i - 1];
            let cross_down = k[i] < d[i] && k[i - 1] >= d[i - 1];
            let mut tag = if cross_up && d[i] < p.oversold {
                ReversalTag::Support
            } else if cross_down && d[i] > p.overbought {
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

            if tag.is_signal() {
                tags[i] = tag;
                strong[i] = match p.strength_threshold {
                    Some(t) => (k[i] - d[i]).abs() >= t,
                    None => true,
                };
            }
        }

        Ok(SignalFrame::new(tags, strong))
    }

    fn score(&self, eval: &Evaluation, density_target_count: f64) -> f64 {
        let support_f1 = f1(eval.strong_support_win_rate, eval.support_recall);
        let resistance_f1 = f1(eval.strong_resistance_win_rate, eval.resistance_recall);
        let base = harmonic(support_f1, resistance_f1);
        let min_strong = eval.strong_support_count.min(eval.strong_resistance_count);
        base * density_penalty(min_strong, density_target_count)
    }

    fn min_bars(&self) -> usize {
        40
    }
}

/// Forward support confirmation: next bar closes up without gapping above its
/// close, or breaks the signal high, or the second bar holds above both the
/// signal high and the next bar's high.
fn confirm_support(bars: &[Bar], i: usize) -> bool {
    let h = bars[i].high;
    let c = bars[i].close;
    let next_up = bars.get(i + 1).is_some_and(|b1| {
        (b1.close > c && b1.open <= b1.close) || (b1.close > h && b1.open >= h)
    });
    let second_holds = match (bars.get(i + 1), bars.get(i + 2)) {
        (Some(b1), Some(b2)) => b2.close > h && b2.close > b1.high,
        _ => false,
    };
    next_up || second_holds
}

fn confirm_resistance(bars: &[Bar], i: usize) -> bool {
    let l = bars[i].low;
    let c = bars[i].close;
    let next_down = bars.get(i + 1).is_some_and(|b1| {
        (b1.close < c && b1.open >= b1.close) || (b1.close < l && b1.open <= l)
    });
    let second_holds = match (bars.get(i + 1), bars.get(i + 2)) {
        (Some(b1), Some(b2)) => b2.close < l && b2.close < b1.low,
        _ => false,
    };
    next_down || second_holds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn default_params() -> IndicatorParams {
        IndicatorParams::Kd(KdParams {
            k_period: 9,
            d_period: 3,
            overbought: 70.0,
            oversold: 30.0,
            strength_threshold: None,
        })
    }

    /// V-shaped series: a long decline into a sharp recovery should put %D
    /// deep in oversold territory and produce a cross-up.
    fn v_shape() -> Vec<Bar> {
        let mut closes: Vec<f64> = (0..40).map(|i| 140.0 - 2.0 * i as f64).collect();
        closes.extend((0..40).map(|i| 60.0 + 2.0 * i as f64));
        make_bars(&closes)
    }

    #[test]
    fn v_bottom_produces_support_signal() {
        let strategy = KdStrategy;
        let frame = strategy
            .calculate(&v_shape(), &default_params(), Mode::Train)
            .unwrap();
        assert!(frame
            .tags()
            .iter()
            .any(|&t| t == ReversalTag::Support));
    }

    #[test]
    fn signals_are_strong_without_threshold() {
        let strategy = KdStrategy;
        let frame = strategy
            .calculate(&v_shape(), &default_params(), Mode::Train)
            .unwrap();
        for (tag, strong) in frame.tags().iter().zip(frame.strong()) {
            assert_eq!(tag.is_signal(), *strong);
        }
    }

    #[test]
    fn check_mode_is_a_subset_of_train_mode() {
        let strategy = KdStrategy;
        let bars = v_shape();
        let train = strategy.calculate(&bars, &default_params(), Mode::Train).unwrap();
        let check = strategy.calculate(&bars, &default_params(), Mode::Check).unwrap();
        for (t, c) in train.tags().iter().zip(check.tags()) {
            if c.is_signal() {
                assert_eq!(t, c);
            }
        }
    }

    #[test]
    fn wrong_params_variant_is_an_error() {
        let strategy = KdStrategy;
        let params = IndicatorParams::Rsi(crate::strategy::RsiParams {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        });
        let err = strategy.calculate(&v_shape(), &params, Mode::Train).unwrap_err();
        assert!(matches!(err, StrategyError::ParamsMismatch { .. }));
    }

    #[test]
    fn point_maps_into_bounds() {
        let strategy = KdStrategy;
        let params = strategy
            .params_from_point(&[14.4, 3.7, 91.0, 5.0])
            .unwrap();
        match params {
            IndicatorParams::Kd(p) => {
                assert_eq!(p.k_period, 14);
                assert_eq!(p.d_period, 4);
                assert_eq!(p.overbought, 90.0);
                assert_eq!(p.oversold, 10.0);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn score_zero_when_one_side_never_wins() {
        let mut eval = Evaluation::default();
        eval.strong_support_win_rate = 0.8;
        eval.support_recall = 1.0;
        eval.strong_support_count = 10;
        // resistance side all zero
        let score = KdStrategy.score(&eval, 5.0);
        assert_eq!(score, 0.0);
    }
}
