//! Categorization session: one-at-a-time and batch workflows over the
//! Pending subset of transactions.

use std::sync::Arc;

use crate::errors::Result;
use crate::models::{Category, Transaction, TransactionStatus};
use crate::sync::engine::{ApplyOutcome, SyncEngine};

/// Every Nth categorization fires the milestone hook (the presentation
/// layer decides how to celebrate).
pub const MILESTONE_INTERVAL: u64 = 10;

/// Cursor-driven categorization workflow.
///
/// The cursor indexes into the Pending subset of the engine's stable
/// transaction order. Categorizing does not advance it: the categorized
/// item leaves the Pending subset and the next item slides into the same
/// index. Only `skip` moves the cursor explicitly.
pub struct CategorizationSession {
    engine: Arc<SyncEngine>,
    cursor: usize,
    categorized_count: u64,
    milestone_hook: Option<Box<dyn Fn(u64) + Send + Sync>>,
}

impl CategorizationSession {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            cursor: 0,
            categorized_count: 0,
            milestone_hook: None,
        }
    }

    /// Install a hook fired with the running total on every
    /// [`MILESTONE_INTERVAL`]th categorization.
    pub fn with_milestone_hook(mut self, hook: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.milestone_hook = Some(Box::new(hook));
        self
    }

    async fn pending(&self) -> Vec<Transaction> {
        self.engine
            .transactions()
            .await
            .into_iter()
            .filter(|t| t.status == TransactionStatus::Pending)
            .collect()
    }

    /// The transaction under the cursor; `None` when nothing is pending.
    pub async fn current_item(&self) -> Option<Transaction> {
        self.pending().await.into_iter().nth(self.cursor)
    }

    /// Number of transactions still pending.
    pub async fn remaining(&self) -> usize {
        self.pending().await.len()
    }

    /// Total categorized through this session.
    pub fn total_categorized(&self) -> u64 {
        self.categorized_count
    }

    fn build_update(
        current: &Transaction,
        category: &Category,
        resolved_path: Option<&str>,
    ) -> Transaction {
        Transaction {
            category_id: Some(category.id.clone()),
            category_name: Some(
                resolved_path
                    .map(str::to_string)
                    .unwrap_or_else(|| category.name.clone()),
            ),
            status: TransactionStatus::Categorized,
            ..current.clone()
        }
    }

    fn record_categorized(&mut self, count: u64) {
        let before = self.categorized_count;
        self.categorized_count += count;
        if let Some(hook) = &self.milestone_hook {
            if self.categorized_count / MILESTONE_INTERVAL > before / MILESTONE_INTERVAL {
                hook(self.categorized_count);
            }
        }
    }

    /// Assign `category` to the current item and submit it through the
    /// engine. `category` must be a leaf; internal nodes are drill-down
    /// targets, which the caller excludes by construction.
    /// `resolved_path` is the human-readable ancestor path recorded as
    /// the category name.
    ///
    /// Returns `None` when nothing is pending. The cursor clamps back to
    /// the front after categorizing the last pending item.
    pub async fn categorize(
        &mut self,
        category: &Category,
        resolved_path: Option<&str>,
    ) -> Result<Option<ApplyOutcome>> {
        debug_assert!(category.is_leaf(), "assignment target must be a leaf");

        let pending = self.pending().await;
        let Some(current) = pending.get(self.cursor) else {
            return Ok(None);
        };

        let update = Self::build_update(current, category, resolved_path);
        let outcome = self.engine.apply_categorization(vec![update]).await?;

        self.record_categorized(1);
        if self.cursor >= pending.len().saturating_sub(1) {
            self.cursor = 0;
        }
        Ok(Some(outcome))
    }

    /// Advance past the current item without mutating it. No-op at the
    /// end of the list; the cursor does not wrap.
    pub async fn skip(&mut self) {
        let remaining = self.remaining().await;
        if self.cursor + 1 < remaining {
            self.cursor += 1;
        }
    }

    /// Assign the same category to every transaction in `ids`, as one
    /// `apply_categorization` call: one optimistic merge, one push.
    /// Unknown ids are dropped.
    pub async fn categorize_batch(
        &mut self,
        ids: &[String],
        category: &Category,
        resolved_path: Option<&str>,
    ) -> Result<ApplyOutcome> {
        debug_assert!(category.is_leaf(), "assignment target must be a leaf");

        let transactions = self.engine.transactions().await;
        let updates: Vec<Transaction> = ids
            .iter()
            .filter_map(|id| transactions.iter().find(|t| &t.id == id))
            .map(|t| Self::build_update(t, category, resolved_path))
            .collect();

        let applied = updates.len() as u64;
        let outcome = self.engine.apply_categorization(updates).await?;

        self.record_categorized(applied);
        let remaining = self.remaining().await;
        if self.cursor >= remaining {
            self.cursor = 0;
        }
        Ok(outcome)
    }
}
