//! Stronghold Core — shared domain abstractions.
//!
//! This crate defines the fundamental types and traits that the check
//! engine, store, registry, and API all depend on. It contains no
//! infrastructure code.

pub mod check;
pub mod clock;
pub mod error;
pub mod modifier;
pub mod outcome;
pub mod resource;
pub mod rng;
