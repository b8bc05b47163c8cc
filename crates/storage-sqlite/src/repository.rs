//! Key-value repository backing the [`LocalStore`] contract.

use std::path::Path;

use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use tally_core::errors::{Error, Result};
use tally_core::models::{Snapshot, Taxonomy, Transaction};
use tally_core::store::LocalStore;

const TRANSACTIONS_KEY: &str = "transactions";
const TAXONOMY_KEY: &str = "taxonomy";
const PENDING_SYNC_KEY: &str = "pending_sync";

fn storage_err(err: rusqlite::Error) -> Error {
    Error::storage(err.to_string())
}

/// Durable mapping from the three logical keys (`transactions`,
/// `taxonomy`, `pending_sync`) to JSON documents in a single SQLite
/// table. Missing keys are a valid state, never an error.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::initialize(conn)
    }

    /// Ephemeral store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
        let value: Option<String> = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_err)?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, json),
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn delete(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])
            .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn save_snapshot(
        &self,
        transactions: &[Transaction],
        taxonomy: &Taxonomy,
    ) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(storage_err)?;
        Self::set(&tx, TRANSACTIONS_KEY, &transactions)?;
        Self::set(&tx, TAXONOMY_KEY, taxonomy)?;
        tx.commit().map_err(storage_err)?;
        debug!("Saved snapshot with {} transaction(s)", transactions.len());
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        let conn = self.conn.lock().await;
        let transactions: Option<Vec<Transaction>> = Self::get(&conn, TRANSACTIONS_KEY)?;
        let taxonomy: Option<Taxonomy> = Self::get(&conn, TAXONOMY_KEY)?;
        match (transactions, taxonomy) {
            (Some(transactions), Some(taxonomy)) => Ok(Some(Snapshot {
                transactions,
                taxonomy,
            })),
            _ => Ok(None),
        }
    }

    async fn enqueue(&self, transaction: &Transaction) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut queue: Vec<Transaction> = Self::get(&conn, PENDING_SYNC_KEY)?.unwrap_or_default();
        if let Some(existing) = queue.iter_mut().find(|t| t.id == transaction.id) {
            *existing = transaction.clone();
        } else {
            queue.push(transaction.clone());
        }
        Self::set(&conn, PENDING_SYNC_KEY, &queue)
    }

    async fn queue_snapshot(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().await;
        Ok(Self::get(&conn, PENDING_SYNC_KEY)?.unwrap_or_default())
    }

    async fn clear_queue(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        Self::delete(&conn, PENDING_SYNC_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::models::TransactionStatus;

    fn tx(id: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            original_name: id.to_string(),
            amount: Some(9.9),
            date: Some("01/02/2024".to_string()),
            category_id: None,
            category_name: None,
            status: TransactionStatus::Pending,
        }
    }

    #[tokio::test]
    async fn missing_keys_are_absence_not_errors() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.load_snapshot().await.unwrap().is_none());
        assert!(store.queue_snapshot().await.unwrap().is_empty());
        store.clear_queue().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let transactions = vec![tx("a"), tx("b")];
        store.save_snapshot(&transactions, &vec![]).await.unwrap();

        let snapshot = store.load_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.transactions, transactions);
        assert!(snapshot.taxonomy.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_absent_until_both_keys_exist() {
        let store = SqliteStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().await;
            SqliteStore::set(&conn, TRANSACTIONS_KEY, &vec![tx("a")]).unwrap();
        }
        assert!(store.load_snapshot().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enqueue_upserts_by_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.enqueue(&tx("a")).await.unwrap();
        store.enqueue(&tx("b")).await.unwrap();

        let mut edited = tx("a");
        edited.category_id = Some("Food-Groceries-Supermarket".to_string());
        edited.status = TransactionStatus::Categorized;
        store.enqueue(&edited).await.unwrap();

        let queue = store.queue_snapshot().await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].status, TransactionStatus::Categorized);
        assert_eq!(
            queue[0].category_id.as_deref(),
            Some("Food-Groceries-Supermarket")
        );
        assert_eq!(queue[1].id, "b");
    }

    #[tokio::test]
    async fn clear_queue_empties_only_the_queue() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save_snapshot(&[tx("a")], &vec![]).await.unwrap();
        store.enqueue(&tx("a")).await.unwrap();

        store.clear_queue().await.unwrap();
        assert!(store.queue_snapshot().await.unwrap().is_empty());
        assert!(store.load_snapshot().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_snapshot(&[tx("a")], &vec![]).await.unwrap();
            store.enqueue(&tx("a")).await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let snapshot = reopened.load_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.transactions[0].id, "a");
        assert_eq!(reopened.queue_snapshot().await.unwrap().len(), 1);
    }
}
