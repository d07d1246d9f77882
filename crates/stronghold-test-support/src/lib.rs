//! Shared test mocks and utilities for the Stronghold check engine.

mod clock;
mod rng;

pub use clock::FixedClock;
pub use rng::{MockRng, SequenceRng};
