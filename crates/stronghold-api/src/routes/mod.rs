//! Route modules.

pub mod checks;
pub mod health;
pub mod session;
pub mod turns;
