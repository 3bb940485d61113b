//! Random level assignment for new nodes.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws the maximum level of a node about to be inserted.
pub trait RandomLevelGenerator: Send {
    fn max_level(&mut self) -> u32;
}

/// Exponentially decaying level distribution: `floor(-ln(U) * 1/ln(M))`.
///
/// With `M` links per hierarchic level, each level holds roughly `1/M` of
/// the nodes of the level below it, so the expected graph height is
/// `O(log N)`.
pub struct InvLogLevelGenerator {
    level_multiplier: f64,
    rng: StdRng,
}

impl InvLogLevelGenerator {
    /// Generator for `m` links per hierarchic level, seeded from the OS.
    pub fn new(m: u32) -> Self {
        Self::with_seed(m, rand::random())
    }

    /// Deterministic generator.
    pub fn with_seed(m: u32, seed: u64) -> Self {
        let m = m.max(2) as f64;
        Self {
            level_multiplier: 1.0 / m.ln(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomLevelGenerator for InvLogLevelGenerator {
    fn max_level(&mut self) -> u32 {
        // gen::<f64>() is in [0, 1); 1 - r keeps the log argument positive.
        let r: f64 = 1.0 - self.rng.gen::<f64>();
        let level = (-r.ln() * self.level_multiplier).floor();
        level.min(u32::MAX as f64) as u32
    }
}

/// Replays a fixed sequence of levels, then returns 0 forever.
#[derive(Debug, Default, Clone)]
pub struct FixedLevelGenerator {
    levels: VecDeque<u32>,
}

impl FixedLevelGenerator {
    pub fn new(levels: impl IntoIterator<Item = u32>) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }
}

impl RandomLevelGenerator for FixedLevelGenerator {
    fn max_level(&mut self) -> u32 {
        self.levels.pop_front().unwrap_or(0)
    }
}
