//! Offline-first transaction categorization core.
//!
//! Reconciles local optimistic edits, a durable local mirror of server
//! state, and a pending-write queue across unreliable connectivity. The
//! I/O seams ([`LocalStore`], [`RemoteGateway`], [`ReachabilityProbe`])
//! are implemented by sibling crates; this crate owns the domain model,
//! the [`SyncEngine`] state machine, and the [`CategorizationSession`].

pub mod errors;
pub mod gateway;
pub mod models;
pub mod store;
pub mod sync;

pub use errors::{Error, Result};
pub use gateway::{PushAck, ReachabilityProbe, RemoteGateway};
pub use models::{Category, Snapshot, Taxonomy, Transaction, TransactionStatus};
pub use store::LocalStore;
pub use sync::{ApplyOutcome, CategorizationSession, EngineStatus, SyncEngine, MILESTONE_INTERVAL};
