//! Tree-structured Parzen Estimator search.
//!
//! After a random startup phase, observations are split at the gamma
//! quantile into a good and a bad set. Candidates are drawn from a
//! per-dimension Gaussian mixture over the good set and ranked by the
//! density ratio l(x)/g(x); the winner becomes the next proposal. Every
//! dimension is snapped back onto its `ParamRange` grid, so the objective
//! only ever sees feasible points.

use rand::rngs::StdRng;
use rand::Rng;
use sigcal_core::strategy::ParamRange;

#[derive(Debug, Clone, Copy)]
pub struct TpeConfig {
    /// Proposals drawn uniformly before the estimator activates.
    pub n_startup: usize,
    /// Quantile of observations forming the good set.
    pub gamma: f64,
    /// Candidates ranked per proposal.
    pub n_candidates: usize,
}

impl Default for TpeConfig {
    fn default() -> Self {
        Self {
            n_startup: 20,
            gamma: 0.25,
            n_candidates: 24,
        }
    }
}

/// Sequential proposer for one trial. Not shared across threads.
pub struct TpeSearch {
    space: Vec<ParamRange>,
    config: TpeConfig,
    /// (point, score), in observation order.
    observations: Vec<(Vec<f64>, f64)>,
}

impl TpeSearch {
    pub fn new(space: Vec<ParamRange>, config: TpeConfig) -> Self {
        Self {
            space,
            config,
            observations: Vec::new(),
        }
    }

    pub fn record(&mut self, point: Vec<f64>, score: f64) {
        self.observations.push((point, score));
    }

    /// Next point to evaluate.
    pub fn propose(&self, rng: &mut StdRng) -> Vec<f64> {
        if self.observations.len() < self.config.n_startup {
            return self.random_point(rng);
        }

        let (good, bad) = self.split();
        if good.is_empty() || bad.is_empty() {
            return self.random_point(rng);
        }

        let mut best_point = None;
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..self.config.n_candidates {
            let candidate = self.sample_from_good(&good, rng);
            let ratio = self.log_density(&candidate, &good) - self.log_density(&candidate, &bad);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_point = Some(candidate);
            }
        }
        best_point.unwrap_or_else(|| self.random_point(rng))
    }

    fn random_point(&self, rng: &mut StdRng) -> Vec<f64> {
        self.space.iter().map(|r| r.sample(rng)).collect()
    }

    /// Split observations at the gamma quantile by score, best first.
    fn split(&self) -> (Vec<&Vec<f64>>, Vec<&Vec<f64>>) {
        let mut order: Vec<usize> = (0..self.observations.len()).collect();
        order.sort_by(|&a, &b| {
            self.observations[b]
                .1
                .partial_cmp(&self.observations[a].1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let n_good = ((self.observations.len() as f64 * self.config.gamma).ceil() as usize).max(1);
        let good = order[..n_good.min(order.len())]
            .iter()
            .map(|&i| &self.observations[i].0)
            .collect();
        let bad = order[n_good.min(order.len())..]
            .iter()
            .map(|&i| &self.observations[i].0)
            .collect();
        (good, bad)
    }

    /// Draw one candidate: per dimension, a Gaussian around the value of a
    /// randomly chosen good observation, quantized onto the grid.
    fn sample_from_good(&self, good: &[&Vec<f64>], rng: &mut StdRng) -> Vec<f64> {
        self.space
            .iter()
            .enumerate()
            .map(|(dim, range)| {
                let anchor = good[rng.gen_range(0..good.len())][dim];
                let sigma = self.bandwidth(dim, good);
                range.quantize(anchor + sigma * sample_standard_normal(rng))
            })
            .collect()
    }

    /// Kernel bandwidth per dimension: range width shrinking with the good
    /// set size, never below the quantization step.
    fn bandwidth(&self, dim: usize, set: &[&Vec<f64>]) -> f64 {
        let range = &self.space[dim];
        let width = range.hi - range.lo;
        (width / (set.len() as f64).sqrt()).max(range.step)
    }

    /// Log of the Gaussian-mixture density of `point` under `set`,
    /// summed over dimensions.
    fn log_density(&self, point: &[f64], set: &[&Vec<f64>]) -> f64 {
        let mut total = 0.0;
        for (dim, &x) in point.iter().enumerate() {
            let sigma = self.bandwidth(dim, set);
            let mut mixture = 0.0;
            for obs in set {
                let z = (x - obs[dim]) / sigma;
                mixture += (-0.5 * z * z).exp() / sigma;
            }
            mixture /= set.len() as f64;
            total += mixture.max(f64::MIN_POSITIVE).ln();
        }
        total
    }
}

/// Standard normal draw via Box-Muller.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
