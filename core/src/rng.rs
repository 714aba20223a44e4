//! Random draws for the heuristic path's confidence jitter.
//!
//! RULE: the scorer holds no mutable RNG state. When a seed is configured,
//! each draw comes from a fresh Pcg64Mcg seeded from
//! (master_seed XOR record fingerprint), so the same record always gets the
//! same confidence and concurrent callers need no synchronisation.
//! Without a seed every draw comes from the thread RNG.

use crate::features::{FeatureRecord, FEATURE_NAMES};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceJitter {
    seed: Option<u64>,
}

impl ConfidenceJitter {
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn unseeded() -> Self {
        Self { seed: None }
    }

    pub fn from_config(seed: Option<u64>) -> Self {
        Self { seed }
    }

    pub fn is_deterministic(&self) -> bool {
        self.seed.is_some()
    }

    /// Roll a float in [0.0, 1.0) for `record`.
    pub fn draw(&self, record: &FeatureRecord) -> f64 {
        let bits = match self.seed {
            Some(master) => {
                let derived = master ^ fingerprint(record).wrapping_mul(GOLDEN_GAMMA);
                Pcg64Mcg::seed_from_u64(derived).next_u64()
            }
            None => rand::random::<u64>(),
        };
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Order-sensitive mix of every scored attribute's bit pattern.
fn fingerprint(record: &FeatureRecord) -> u64 {
    FEATURE_NAMES.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, name| {
        let bits = record.value_of(name).unwrap_or(0.0).to_bits();
        (acc ^ bits).wrapping_mul(0x0000_0100_0000_01b3).rotate_left(17)
    })
}
