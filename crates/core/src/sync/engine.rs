//! Sync engine: online/offline detection, optimistic mutation, queue
//! draining, and cache reconciliation.
//!
//! The engine owns the only mutable shared state in the core (the cached
//! snapshot, the connectivity flags, and access to the pending queue).
//! Every public operation serializes on one mutex, so a queue drain and a
//! concurrent categorization never interleave their read-modify-write
//! sequences and a drain on reconnect happens-before any later direct
//! push.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};

use crate::errors::{Error, Result};
use crate::gateway::{PushAck, ReachabilityProbe, RemoteGateway};
use crate::models::{merge_transactions, Snapshot, Taxonomy, Transaction, TransactionStatus};
use crate::store::LocalStore;

/// Lightweight engine status published to subscribers on every change,
/// replacing UI-framework re-render triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending_count: usize,
}

/// How a categorization left the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Offline: persisted locally and queued for the next reconnect.
    Queued,
    /// Online: dispatched to the remote gateway.
    Pushed(PushAck),
}

struct EngineState {
    cache: Option<Snapshot>,
    is_online: bool,
    is_syncing: bool,
    pending_count: usize,
}

impl EngineState {
    fn status(&self) -> EngineStatus {
        EngineStatus {
            is_online: self.is_online,
            is_syncing: self.is_syncing,
            pending_count: self.pending_count,
        }
    }
}

/// Orchestrates the local store, the remote gateway, and the reachability
/// probe. Starts offline; connectivity is established by the platform
/// hint or a probe.
pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    probe: Arc<dyn ReachabilityProbe>,
    state: Mutex<EngineState>,
    status_tx: watch::Sender<EngineStatus>,
    probe_seq: AtomicU64,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        let (status_tx, _) = watch::channel(EngineStatus::default());
        Self {
            store,
            gateway,
            probe,
            state: Mutex::new(EngineState {
                cache: None,
                is_online: false,
                is_syncing: false,
                pending_count: 0,
            }),
            status_tx,
            probe_seq: AtomicU64::new(0),
        }
    }

    /// Subscribe to status changes (`is_online`, `is_syncing`, pending
    /// queue depth).
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status_tx.subscribe()
    }

    fn publish(&self, state: &EngineState) {
        self.status_tx.send_replace(state.status());
    }

    /// Serve the current snapshot: remote-first when online (with
    /// write-through to the local store), cached when fresh, local store
    /// when offline or unreachable.
    ///
    /// Fails with [`Error::NoDataAvailable`] only on a cold start with no
    /// cache and no reachable remote.
    pub async fn load(&self) -> Result<Snapshot> {
        let mut state = self.state.lock().await;

        state.pending_count = self.store.queue_snapshot().await?.len();

        if let Some(snapshot) = &state.cache {
            return Ok(snapshot.clone());
        }

        if state.is_online {
            match self.gateway.fetch_all().await {
                Ok(snapshot) => {
                    self.store
                        .save_snapshot(&snapshot.transactions, &snapshot.taxonomy)
                        .await?;
                    debug!(
                        "Fetched {} transaction(s), {} taxonomy root(s)",
                        snapshot.transactions.len(),
                        snapshot.taxonomy.len()
                    );
                    state.cache = Some(snapshot.clone());
                    self.publish(&state);
                    return Ok(snapshot);
                }
                Err(err) => {
                    warn!("Remote fetch failed, falling back to local data: {}", err);
                }
            }
        }

        match self.store.load_snapshot().await? {
            Some(snapshot) => {
                state.cache = Some(snapshot.clone());
                self.publish(&state);
                Ok(snapshot)
            }
            None => Err(Error::NoDataAvailable),
        }
    }

    /// Platform connectivity signal. A hint only: necessary but not
    /// sufficient, so it feeds the same transition logic as the probe.
    pub async fn set_online_hint(&self, online: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        self.transition_locked(&mut state, online).await
    }

    /// Active reachability check. Only the most recent probe's outcome
    /// may update `is_online`; a result superseded by a newer probe is
    /// discarded. Returns the connectivity the engine settled on.
    pub async fn probe_connectivity(&self) -> Result<bool> {
        let seq = self.probe_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let reachable = self.probe.check().await;

        let mut state = self.state.lock().await;
        if self.probe_seq.load(Ordering::SeqCst) != seq {
            debug!("Discarding superseded connectivity probe result");
            return Ok(state.is_online);
        }
        self.transition_locked(&mut state, reachable).await?;
        Ok(reachable)
    }

    async fn transition_locked(&self, state: &mut EngineState, online: bool) -> Result<()> {
        let was_online = state.is_online;
        state.is_online = online;

        if online && !was_online {
            info!("Connectivity restored; invalidating cache and draining queue");
            // Invalidate so the next load() re-fetches from the remote.
            state.cache = None;
            let result = self.drain_locked(state).await;
            self.publish(state);
            return result;
        }

        if was_online != online {
            debug!("Connectivity lost");
            self.publish(state);
        }
        Ok(())
    }

    /// The core write path. Ordered for consistency under interruption:
    /// persist locally first, then update the in-memory view (keeping the
    /// pre-update view for rollback), then queue or push.
    ///
    /// On a definite local push failure the optimistic view is rolled
    /// back but the local store write is not: local durability is
    /// preferred over transient consistency.
    pub async fn apply_categorization(&self, updates: Vec<Transaction>) -> Result<ApplyOutcome> {
        if updates.is_empty() {
            return Ok(ApplyOutcome::Queued);
        }

        let mut state = self.state.lock().await;

        // 1. Durability before any network attempt.
        if let Some(mut stored) = self.store.load_snapshot().await? {
            merge_transactions(&mut stored.transactions, &updates);
            self.store
                .save_snapshot(&stored.transactions, &stored.taxonomy)
                .await?;
        }

        // 2. Optimistic merge into the view, pre-update view saved.
        let previous = state.cache.clone();
        if let Some(cache) = state.cache.as_mut() {
            merge_transactions(&mut cache.transactions, &updates);
        }

        // 3. Offline: upsert into the pending queue and stop.
        if !state.is_online {
            for transaction in &updates {
                self.store.enqueue(transaction).await?;
            }
            state.pending_count = self.store.queue_snapshot().await?.len();
            debug!("Offline; queued {} categorization(s)", updates.len());
            self.publish(&state);
            return Ok(ApplyOutcome::Queued);
        }

        // 4. Online: push directly.
        match self.gateway.push(&updates).await {
            Ok(ack) => {
                // An online push supersedes anything still queued.
                self.store.clear_queue().await?;
                state.pending_count = 0;
                self.mark_synced(&mut state, &updates).await?;
                self.publish(&state);
                Ok(ApplyOutcome::Pushed(ack))
            }
            Err(err) => {
                warn!("Push failed; rolling back optimistic view: {}", err);
                state.cache = previous;
                self.publish(&state);
                Err(err)
            }
        }
    }

    /// Drain the pending queue after a reconnect. Transitions trigger
    /// this exactly once; calling it with an empty queue is a no-op.
    /// `is_syncing` is cleared on every exit path.
    pub async fn drain_queue_on_reconnect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let result = self.drain_locked(&mut state).await;
        self.publish(&state);
        result
    }

    async fn drain_locked(&self, state: &mut EngineState) -> Result<()> {
        let queue = self.store.queue_snapshot().await?;
        state.pending_count = queue.len();
        if queue.is_empty() {
            return Ok(());
        }

        info!("Draining {} queued categorization(s)", queue.len());
        state.is_syncing = true;
        self.publish(state);

        let result = match self.gateway.push(&queue).await {
            Ok(_) => match self.store.clear_queue().await {
                Ok(()) => {
                    state.pending_count = 0;
                    self.mark_synced(state, &queue).await
                }
                Err(err) => Err(err),
            },
            Err(err) => {
                warn!("Queue drain failed; keeping pending queue: {}", err);
                Err(err)
            }
        };

        state.is_syncing = false;
        result
    }

    /// Advance pushed transactions to `Synced`, in the view and the
    /// store mirror. Only items that already passed through
    /// `Categorized` advance; a `Pending` item never jumps straight to
    /// `Synced`.
    async fn mark_synced(&self, state: &mut EngineState, pushed: &[Transaction]) -> Result<()> {
        let synced: Vec<Transaction> = pushed
            .iter()
            .filter(|t| t.status == TransactionStatus::Categorized)
            .map(|t| Transaction {
                status: TransactionStatus::Synced,
                ..t.clone()
            })
            .collect();
        if synced.is_empty() {
            return Ok(());
        }

        if let Some(cache) = state.cache.as_mut() {
            merge_transactions(&mut cache.transactions, &synced);
        }
        if let Some(mut stored) = self.store.load_snapshot().await? {
            merge_transactions(&mut stored.transactions, &synced);
            self.store
                .save_snapshot(&stored.transactions, &stored.taxonomy)
                .await?;
        }
        Ok(())
    }

    /// Current in-memory transaction list, in the stable order the
    /// remote returned them.
    pub async fn transactions(&self) -> Vec<Transaction> {
        let state = self.state.lock().await;
        state
            .cache
            .as_ref()
            .map(|s| s.transactions.clone())
            .unwrap_or_default()
    }

    /// Current in-memory taxonomy.
    pub async fn taxonomy(&self) -> Taxonomy {
        let state = self.state.lock().await;
        state
            .cache
            .as_ref()
            .map(|s| s.taxonomy.clone())
            .unwrap_or_default()
    }

    pub async fn is_online(&self) -> bool {
        self.state.lock().await.is_online
    }

    pub async fn is_syncing(&self) -> bool {
        self.state.lock().await.is_syncing
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending_count
    }
}
