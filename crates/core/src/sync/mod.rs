//! Offline-first sync engine and the categorization session built on it.

mod engine;
mod session;

pub use engine::*;
pub use session::*;
