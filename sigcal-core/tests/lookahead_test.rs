//! Train-mode causality tests.
//!
//! Detection on a truncated series must agree bar-for-bar with detection on
//! the full series over the shared prefix. Any disagreement means a strategy
//! peeked at future bars in train mode.

use chrono::NaiveDate;
use sigcal_core::domain::Bar;
use sigcal_core::strategy::{
    strategy, IndicatorParams, KdParams, MacdParams, Mode, RsiParams, StrategyKind,
};

fn synthetic_bars(n: usize) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + 12.0 * (t * 0.13).sin() + 4.0 * (t * 0.41).cos() + t * 0.02;
            let open = close + 1.5 * (t * 0.29).sin();
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0 + 0.5 * (t * 0.53).cos().abs(),
                low: open.min(close) - 1.0 - 0.5 * (t * 0.67).sin().abs(),
                close,
                volume: 1000 + i as u64,
            }
        })
        .collect()
}

fn params_for(kind: StrategyKind) -> IndicatorParams {
    match kind {
        StrategyKind::Kd => IndicatorParams::Kd(KdParams {
            k_period: 9,
            d_period: 3,
            overbought: 70.0,
            oversold: 30.0,
            strength_threshold: None,
        }),
        StrategyKind::Macd => IndicatorParams::Macd(MacdParams {
            fast_period: 8,
            slow_period: 24,
            signal_period: 9,
        }),
        StrategyKind::Rsi => IndicatorParams::Rsi(RsiParams {
            period: 14,
            oversold: 35.0,
            overbought: 65.0,
        }),
    }
}

#[test]
fn train_mode_prefix_invariance() {
    let bars = synthetic_bars(250);

    for kind in StrategyKind::ALL {
        let strat = strategy(kind);
        let params = params_for(kind);
        let full = strat.calculate(&bars, &params, Mode::Train).unwrap();

        for cut in [60, 120, 200, 249] {
            let truncated = strat.calculate(&bars[..cut], &params, Mode::Train).unwrap();
            assert_eq!(
                truncated.tags(),
                &full.tags()[..cut],
                "{} tags diverge on prefix of length {cut}",
                strat.name()
            );
            assert_eq!(
                truncated.strong(),
                &full.strong()[..cut],
                "{} strong flags diverge on prefix of length {cut}",
                strat.name()
            );
        }
    }
}

#[test]
fn check_mode_inspects_future_bars() {
    // Sanity for the inverse: a check-mode signal confirmed by a late rally
    // bar must disappear when that future bar is truncated away.
    let mut closes: Vec<f64> = (0..60)
        .map(|i| 300.0 - 1.5 * i as f64 + if i % 4 == 3 { 3.0 } else { 0.0 })
        .collect();
    closes.push(400.0); // breakout bar confirming the last decline signals

    let base_date = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let bars: Vec<Bar> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect();

    let strat = strategy(StrategyKind::Rsi);
    let params = params_for(StrategyKind::Rsi);
    let n = bars.len();

    let full = strat.calculate(&bars, &params, Mode::Check).unwrap();
    let truncated = strat.calculate(&bars[..n - 1], &params, Mode::Check).unwrap();
    assert_ne!(
        truncated.tags(),
        &full.tags()[..n - 1],
        "truncating the breakout bar should drop the confirmed signals"
    );
}
