//! One sequential optimization trial with early stopping.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use sigcal_core::strategy::ParamRange;

use crate::objective::Objective;
use crate::optimize::tpe::{TpeConfig, TpeSearch};

/// Budget and early-stop settings for a single trial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Maximum proposals per trial.
    pub evals: usize,
    /// Stop after this many proposals without improvement.
    pub patience: usize,
    /// Minimum score gain that counts as improvement.
    pub min_delta: f64,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            evals: 500,
            patience: 100,
            min_delta: 0.001,
        }
    }
}

/// Best result of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub score: f64,
    pub point: Vec<f64>,
    /// Proposals actually evaluated (early stop makes this < evals).
    pub evals_used: usize,
}

/// Run one trial: propose, score, record, keep the best.
pub fn run_trial(objective: &Objective<'_>, config: &TrialConfig, rng: &mut StdRng) -> Trial {
    search(objective.strategy.space(), |p| objective.score(p), config, rng)
}

/// The proposal loop. Best tracking is strictly greater-than; `min_delta`
/// only decides whether a proposal resets the patience counter, so the
/// returned trial always carries the true maximum seen.
fn search(
    space: Vec<ParamRange>,
    score_fn: impl Fn(&[f64]) -> f64,
    config: &TrialConfig,
    rng: &mut StdRng,
) -> Trial {
    let mut tpe = TpeSearch::new(space, TpeConfig::default());

    let mut best_score = f64::NEG_INFINITY;
    let mut best_point = Vec::new();
    let mut since_improvement = 0usize;
    let mut evals_used = 0usize;

    for _ in 0..config.evals.max(1) {
        let point = tpe.propose(rng);
        let score = score_fn(&point);
        evals_used += 1;

        let prev_best = best_score;
        if score > best_score || best_point.is_empty() {
            best_score = score;
            best_point = point.clone();
        }

        if score > prev_best + config.min_delta {
            since_improvement = 0;
        } else {
            since_improvement += 1;
            if since_improvement >= config.patience {
                tpe.record(point, score);
                break;
            }
        }
        tpe.record(point, score);
    }

    Trial {
        score: best_score.max(0.0),
        point: best_point,
        evals_used,
    }
}
