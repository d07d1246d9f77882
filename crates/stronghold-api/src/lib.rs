//! Stronghold API — HTTP surface over the check engine.
//!
//! Exposed as a library so integration tests can assemble the same router
//! the binary serves.

pub mod error;
pub mod routes;
pub mod state;
