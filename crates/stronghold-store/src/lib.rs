//! Stronghold Store — the one shared session document and its store.
//!
//! All participants observe and mutate a single `SessionDocument`; the
//! `SessionStore` trait abstracts how it is held (in memory here, any
//! key-value store with a watch mechanism elsewhere) and propagates every
//! update to all subscribers.

pub mod document;
pub mod memory;
pub mod store;

pub use document::SessionDocument;
pub use memory::MemoryStore;
pub use store::{Mutator, SessionStore};
