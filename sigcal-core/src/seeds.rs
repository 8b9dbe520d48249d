//! Deterministic per-trial seed derivation.
//!
//! A master seed is expanded into per-(symbol, trial) sub-seeds with BLAKE3.
//! Derivation is hash-based rather than order-dependent, so the same master
//! seed produces identical trial RNGs no matter how the rayon pool schedules
//! the trials.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy)]
pub struct TrialSeeds {
    master_seed: u64,
}

impl TrialSeeds {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the deterministic sub-seed for one (symbol, trial) pair.
    pub fn sub_seed(&self, symbol: &str, trial: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(&trial.to_le_bytes());
        let hash = hasher.finalize();
        u64::from_le_bytes(hash.as_bytes()[..8].try_into().unwrap())
    }

    /// Seeded StdRng for one (symbol, trial) pair.
    pub fn rng_for(&self, symbol: &str, trial: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, trial))
    }
}
