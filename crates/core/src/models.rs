//! Domain models for transactions and the category taxonomy.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a transaction.
///
/// Status only advances (`Pending` → `Categorized` → `Synced`); the only
/// backward move is an explicit rollback of a failed optimistic update,
/// which restores a saved prior view rather than merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Categorized,
    Synced,
}

impl TransactionStatus {
    /// Position in the lifecycle, used to refuse regression on merge.
    pub fn rank(self) -> u8 {
        match self {
            TransactionStatus::Pending => 0,
            TransactionStatus::Categorized => 1,
            TransactionStatus::Synced => 2,
        }
    }
}

/// A financial transaction awaiting or carrying a category assignment.
///
/// `id` is the remote row identifier when the service provides one, else
/// the establishment display name. Two rows with the same name and no
/// explicit id therefore collide; that is the accepted identity policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub original_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub status: TransactionStatus,
}

impl Transaction {
    /// A transaction is addressable only with a non-empty id.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Node in the category tree.
///
/// Ids join ancestor names with `-`; `parent_id` is synthesized the same
/// way. Leaves (no children) are the only valid assignment targets;
/// internal nodes trigger drill-down in the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
}

impl Category {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Ordered forest of category roots, read-only from the core's view.
pub type Taxonomy = Vec<Category>;

/// The last known transaction/taxonomy state, cached in memory and
/// mirrored to the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub transactions: Vec<Transaction>,
    pub taxonomy: Taxonomy,
}

/// Merge `updates` into `base` by id, in place.
///
/// Unmatched base entries are untouched; updates for unknown ids are
/// dropped (the snapshot is the authority on which rows exist). Status
/// never regresses: an update carrying a lower-ranked status keeps the
/// existing status while the category fields still apply.
pub fn merge_transactions(base: &mut [Transaction], updates: &[Transaction]) {
    for existing in base.iter_mut() {
        if let Some(update) = updates.iter().find(|u| u.id == existing.id) {
            let status = if update.status.rank() >= existing.status.rank() {
                update.status
            } else {
                existing.status
            };
            *existing = Transaction {
                status,
                ..update.clone()
            };
        }
    }
}
