//! Deterministic random number generation for gameplay logic.
//!
//! ## Key Features
//!
//! - **Deterministic**: Same seed produces identical sequence on every peer
//! - **Serializable**: O(1) state capture and restore for save games
//! - **Inclusive ranges**: `random_int(lo, hi)` and `random_real(lo, hi)` both
//!   include `hi`, matching how module data ranges are written
//!
//! Every draw that can change a gameplay outcome must come from the
//! simulation's `GameRng`. Cosmetic randomness has no business here.
//!
//! ```
//! use rts_behaviors::core::GameRng;
//!
//! let mut a = GameRng::new(42);
//! let mut b = GameRng::new(42);
//! assert_eq!(a.random_int(0, 100), b.random_int(0, 100));
//!
//! let roll = a.random_real(0.35, 0.65);
//! assert!((0.35..=0.65).contains(&roll));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic RNG shared by every module of one simulation.
///
/// Uses ChaCha8: fast, portable, and its stream position can be saved.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this stream started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random integer in `lo..=hi`. Returns `lo` when the range is empty.
    pub fn random_int(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }

    /// Random real in `lo..=hi`. Returns `lo` when the range is empty.
    pub fn random_real(&mut self, lo: f32, hi: f32) -> f32 {
        if hi <= lo {
            return lo;
        }
        self.inner.gen_range(lo..=hi)
    }

    /// Uniform index into a list of `len` entries, `None` for an empty list.
    pub fn random_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.random_int(0, len as i32 - 1) as usize)
    }

    /// Weighted pick by linear scan with a decrementing roll.
    ///
    /// Rolls in `1..=total`, walks the weights in order subtracting each, and
    /// picks the first entry that brings the roll to zero or below. Ties are
    /// broken by position, so callers must pass candidates in a stable order.
    ///
    /// Returns `None` if weights are empty or sum to zero.
    pub fn pick_weighted(&mut self, weights: &[i32]) -> Option<usize> {
        let total: i32 = weights.iter().map(|w| (*w).max(0)).sum();
        if total <= 0 {
            return None;
        }

        let mut roll = self.random_int(1, total);
        for (i, &weight) in weights.iter().enumerate() {
            roll -= weight.max(0);
            if roll <= 0 {
                return Some(i);
            }
        }

        // Unreachable with non-negative weights; keep the last candidate.
        Some(weights.len() - 1)
    }

    /// Get the current state for serialization.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Serializable RNG state for checkpointing.
///
/// Uses ChaCha8 word position for O(1) serialization regardless of
/// how many random numbers have been generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    /// Original seed
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter)
    pub word_pos: u128,
}
