//! Local persistence contract: durable snapshot mirror plus the
//! pending-write queue.

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{Snapshot, Taxonomy, Transaction};

/// Durable key-value persistence of the last known transaction/taxonomy
/// snapshot and the pending sync queue, surviving process restarts.
///
/// Absence is a valid state everywhere: a missing key yields `None` or an
/// empty queue, never an error.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Persist the latest snapshot. Both values must eventually be
    /// saved; callers never observe an error for a partially applied
    /// write.
    async fn save_snapshot(&self, transactions: &[Transaction], taxonomy: &Taxonomy)
        -> Result<()>;

    /// Load the last saved snapshot. `None` signals a cold start with
    /// nothing previously cached.
    async fn load_snapshot(&self) -> Result<Option<Snapshot>>;

    /// Upsert a transaction into the pending queue by id, replacing any
    /// prior pending edit for the same id.
    async fn enqueue(&self, transaction: &Transaction) -> Result<()>;

    /// Current queue contents, without clearing.
    async fn queue_snapshot(&self) -> Result<Vec<Transaction>>;

    /// Empty the queue. Called only after the caller has confirmed a
    /// successful remote flush.
    async fn clear_queue(&self) -> Result<()>;
}
