//! Random number generator abstraction for determinism.
//!
//! In production, this wraps a real RNG. In tests, a sequenced
//! implementation is injected so every die roll is repeatable.

use rand::Rng;

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}

/// Production RNG backed by `rand`'s thread-local generator.
#[derive(Debug, Default)]
pub struct ThreadRngAdapter;

impl DeterministicRng for ThreadRngAdapter {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        rand::rng().random_range(min..=max)
    }
}
