//! Split/no-split decision rule
//!
//! Comparing a uniform float draw against exactly 0.5 is measurably biased
//! once the float source is quantized. At 0.5 we instead read a single bit
//! from the xoshiro256+ output, which is a fair coin as long as the bit sits
//! above the weak low end.

use std::ops::RangeInclusive;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::prng::Xoshiro256Plus;
use crate::consts::SPAWN_JITTER;

/// Bits of a xoshiro256+ output considered fair for single-bit extraction.
/// Bits below 10 fail linearity tests.
pub const SPLIT_BIT_RANGE: RangeInclusive<u32> = 10..=63;

/// How close to 0.5 a probability must be to take the bit-extraction path
pub const HALF_TOLERANCE: f32 = 1e-5;

/// Whether `probability` should be treated as an exact coin flip
#[inline]
pub fn is_coin_flip(probability: f32) -> bool {
    (probability - 0.5).abs() < HALF_TOLERANCE
}

/// Decide whether a collision splits (`true`) or fails (`false`).
///
/// `0.0` never splits and `1.0` always splits, without touching either source.
pub fn decide<R: Rng>(probability: f32, engine: &mut Xoshiro256Plus, rng: &mut R) -> bool {
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }

    if is_coin_flip(probability) {
        let word = engine.next_u64();
        let bit = rng.random_range(SPLIT_BIT_RANGE);
        return word & (1u64 << bit) != 0;
    }

    rng.random::<f32>() < probability
}

/// Owns both randomness sources used by the simulation
#[derive(Debug, Clone)]
pub struct SplitDecider {
    engine: Xoshiro256Plus,
    rng: Pcg32,
}

impl SplitDecider {
    pub fn new(engine: Xoshiro256Plus, rng: Pcg32) -> Self {
        Self { engine, rng }
    }

    /// Deterministic decider: both sources derived from one seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            engine: Xoshiro256Plus::seed_from_u64(seed),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Session decider seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            engine: Xoshiro256Plus::from_entropy(),
            rng: Pcg32::from_rng(&mut rand::rng()),
        }
    }

    #[inline]
    pub fn decide(&mut self, probability: f32) -> bool {
        decide(probability, &mut self.engine, &mut self.rng)
    }

    /// Uniform vector in `[-SPAWN_JITTER, SPAWN_JITTER]²`
    pub fn jitter(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER),
            self.rng.random_range(-SPAWN_JITTER..=SPAWN_JITTER),
        )
    }

    pub fn engine(&self) -> &Xoshiro256Plus {
        &self.engine
    }
}
