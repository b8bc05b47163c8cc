//! SQLite-backed implementation of the [`tally_core::LocalStore`] seam:
//! the durable snapshot mirror and the pending sync queue.

mod repository;

pub use repository::SqliteStore;
