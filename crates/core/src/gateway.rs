//! Remote data service contract and connectivity probing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::models::{Snapshot, Transaction};

/// Outcome of a dispatched push.
///
/// The write transport may be constrained to an opaque response (a
/// preflight-free content type against the spreadsheet service), so a
/// push that left the process cannot always confirm server-side
/// acceptance. `Dispatched` is that ambiguous-but-probably-durable case;
/// callers must not treat it as a durable-on-server guarantee. The
/// pending queue's upsert-by-id semantics are the safety net, and this
/// is a documented consistency gap rather than something resolved with
/// unbounded retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushAck {
    /// The service returned a readable acknowledgement.
    Confirmed,
    /// The request was dispatched without a local transport error, but
    /// the response could not confirm acceptance.
    Dispatched,
}

/// Fetch/post abstraction over the remote transactional data service,
/// normalizing its native record shape into the domain model.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Fetch all transactions and the category taxonomy.
    ///
    /// Fails with [`Error::Network`](crate::Error::Network) on transport
    /// failure or a malformed response.
    async fn fetch_all(&self) -> Result<Snapshot>;

    /// Push categorized transactions to the service, best-effort.
    ///
    /// `Err` means a definite local failure before or during dispatch;
    /// `Ok` carries the degraded-response classification.
    async fn push(&self, transactions: &[Transaction]) -> Result<PushAck>;
}

/// Active reachability check against a known-reachable endpoint.
///
/// The platform's own online/offline signal is a hint, not ground truth:
/// a platform can report online while actually unreachable. The probe is
/// the authoritative source.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Issue a lightweight, cache-busting request; `true` iff it
    /// succeeded.
    async fn check(&self) -> bool;
}
