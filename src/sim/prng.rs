//! xoshiro256+ engine for unbiased bit extraction
//!
//! 256 bits of state, 64-bit output. The low ~10 bits of every output are
//! statistically weak (a known property of the `+` scrambler), so consumers
//! that look at individual bits must stay at or above index 10.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seeding failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeedError {
    /// The all-zero state is a fixed point: every output would be 0
    #[error("xoshiro256+ state must not be all zero")]
    AllZero,
}

/// Fallback state if SplitMix64 ever expands to all zeros
const FALLBACK_STATE: [u64; 4] = [
    0x180e_c6d3_3cfd_0aba,
    0xd5a6_1266_f0c9_392c,
    0xa958_2618_e03f_c9aa,
    0x39ab_dc45_29b1_661c,
];

/// xoshiro256+ generator (Blackman & Vigna)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xoshiro256Plus {
    s: [u64; 4],
}

impl Xoshiro256Plus {
    /// Create from an explicit state. Rejects the all-zero vector.
    pub fn from_state(state: [u64; 4]) -> Result<Self, SeedError> {
        if state.iter().all(|&w| w == 0) {
            return Err(SeedError::AllZero);
        }
        Ok(Self { s: state })
    }

    /// Expand a single word into the full state with SplitMix64
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = seed;
        let state = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self::from_state(state).unwrap_or(Self { s: FALLBACK_STATE })
    }

    /// Seed once from the operating system's entropy source
    pub fn from_entropy() -> Self {
        let mut os = rand::rng();
        loop {
            let state = [os.next_u64(), os.next_u64(), os.next_u64(), os.next_u64()];
            if let Ok(engine) = Self::from_state(state) {
                return engine;
            }
        }
    }

    /// Current state words (for snapshots)
    pub fn state(&self) -> [u64; 4] {
        self.s
    }

    /// Advance the state and return the next output
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let result = self.s[0].wrapping_add(self.s[3]);
        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

impl RngCore for Xoshiro256Plus {
    /// Upper half only: the low bits are the weak ones
    fn next_u32(&mut self) -> u32 {
        (Xoshiro256Plus::next_u64(self) >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        Xoshiro256Plus::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = Xoshiro256Plus::next_u64(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
