//! Optimization objective.
//!
//! One scalar score per proposed point. Anything degenerate — a point the
//! strategy rejects, a frame with no winning side, a NaN score — maps to 0.0
//! so the search keeps moving instead of aborting a trial.

use sigcal_core::domain::Bar;
use sigcal_core::evaluate::{evaluate, EvalConfig};
use sigcal_core::strategy::{Mode, ReversalStrategy};

/// A fixed (bars, strategy, horizon) scoring context.
pub struct Objective<'a> {
    pub bars: &'a [Bar],
    pub strategy: &'a dyn ReversalStrategy,
    pub eval_config: EvalConfig,
    /// Desired strong-signal count, already scaled from the density target.
    pub density_target_count: f64,
}

impl Objective<'_> {
    /// Score a raw optimizer point. Always finite, never negative.
    pub fn score(&self, point: &[f64]) -> f64 {
        let params = match self.strategy.params_from_point(point) {
            Ok(p) => p,
            Err(_) => return 0.0,
        };
        let frame = match self.strategy.calculate(self.bars, &params, Mode::Train) {
            Ok(f) => f,
            Err(_) => return 0.0,
        };
        let eval = evaluate(self.bars, &frame, &self.eval_config);
        let score = self.strategy.score(&eval, self.density_target_count);
        if score.is_finite() && score > 0.0 {
            score
        } else {
            0.0
        }
    }
}
