//! SigCal Core — per-instrument indicator calibration primitives.
//!
//! This crate contains the numeric heart of the calibration engine:
//! - Domain types (OHLCV bars)
//! - Numeric primitives (ATR, rolling windows, EMA, RSI, stochastic %K/%D,
//!   periodogram cycle estimation, forward excursion ranges)
//! - Market-regime classifier (volatility / trend-duration windows)
//! - Reversal strategies (KD, MACD, RSI) behind one sealed-mode trait
//! - Forward win-rate evaluator with runs-test diagnostics
//! - Deterministic per-trial seed derivation

pub mod domain;
pub mod evaluate;
pub mod indicators;
pub mod regime;
pub mod seeds;
pub mod strategy;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything that crosses the optimizer's worker
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();

        require_send::<strategy::SignalFrame>();
        require_sync::<strategy::SignalFrame>();
        require_send::<strategy::IndicatorParams>();
        require_sync::<strategy::IndicatorParams>();
        require_send::<strategy::Mode>();
        require_sync::<strategy::Mode>();

        require_send::<evaluate::Evaluation>();
        require_sync::<evaluate::Evaluation>();
        require_send::<evaluate::EvalConfig>();
        require_sync::<evaluate::EvalConfig>();

        require_send::<regime::RegimeSummary>();
        require_sync::<regime::RegimeSummary>();

        require_send::<seeds::TrialSeeds>();
        require_sync::<seeds::TrialSeeds>();
    }

    /// Architecture contract: train-mode detection cannot see future bars.
    ///
    /// The `Mode` flag is a sealed enum dispatched once per `calculate` call,
    /// so the no-lookahead contract is carried by the type, not by a string.
    /// `tests/lookahead_test.rs` verifies the runtime half of the contract.
    #[test]
    fn mode_is_a_closed_enum() {
        let modes = [strategy::Mode::Train, strategy::Mode::Check];
        assert_eq!(modes.len(), 2);
    }
}
