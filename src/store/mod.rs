//! Ledger store abstraction.
//!
//! The persistence engine is an external collaborator: anything exposing
//! document-style CRUD plus a single-document compare-and-swap can back the
//! finance service. `Ledger` is the typed facade the services use; its
//! `transact` primitive is the one write path for every status-changing
//! mutation, so two concurrent writers racing on the same document cannot
//! both succeed blindly — the loser re-reads and re-validates.
//!
//! `MemoryStore` is the reference implementation, used by the binary and
//! the test suite.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use crate::error::AppError;
use crate::services::metrics::STORE_TXN_DURATION;

/// Collection names used by the finance service.
pub mod collections {
    pub const INVOICES: &str = "invoices";
    pub const FACTORING_SUBMISSIONS: &str = "factoring_submissions";
    pub const PAYMENTS: &str = "payments";
    pub const WEBHOOK_EVENTS: &str = "webhook_events";
    pub const LOADS: &str = "loads";
}

/// A document plus the version its content was read at.
#[derive(Debug, Clone)]
pub struct VersionedDoc {
    pub value: Value,
    pub version: u64,
}

/// Document store contract: get/put/CAS on single documents plus a bounded
/// collection scan. Implementations must make `compare_and_put` atomic with
/// respect to concurrent writers of the same document.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDoc>, AppError>;

    /// Unconditional write (insert or replace).
    async fn put(&self, collection: &str, id: &str, value: Value) -> Result<(), AppError>;

    /// Write `value` only if the document's current version matches
    /// `expected` (`None` = document must not exist). Returns `false` on a
    /// version mismatch.
    async fn compare_and_put(
        &self,
        collection: &str,
        id: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<bool, AppError>;

    /// Up to `limit` documents from a collection, ordered by document id.
    async fn scan(&self, collection: &str, limit: usize) -> Result<Vec<Value>, AppError>;
}

struct Entry {
    value: Value,
    version: u64,
}

/// In-memory ledger store backed by sharded concurrent maps.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Arc<DashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Arc<DashMap<String, Entry>> {
        self.collections
            .entry(name.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<VersionedDoc>, AppError> {
        let col = self.collection(collection);
        Ok(col.get(id).map(|e| VersionedDoc {
            value: e.value.clone(),
            version: e.version,
        }))
    }

    async fn put(&self, collection: &str, id: &str, value: Value) -> Result<(), AppError> {
        let col = self.collection(collection);
        match col.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                let next = occ.get().version + 1;
                occ.insert(Entry {
                    value,
                    version: next,
                });
            }
            dashmap::mapref::entry::Entry::Vacant(vac) => {
                vac.insert(Entry { value, version: 1 });
            }
        }
        Ok(())
    }

    async fn compare_and_put(
        &self,
        collection: &str,
        id: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<bool, AppError> {
        let col = self.collection(collection);
        // The entry holds the shard lock, which makes the check-and-write
        // atomic against concurrent writers of the same document.
        let result = match col.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut occ) => {
                let Some(expected) = expected else {
                    return Ok(false);
                };
                if occ.get().version != expected {
                    return Ok(false);
                }
                occ.insert(Entry {
                    value,
                    version: expected + 1,
                });
                Ok(true)
            }
            dashmap::mapref::entry::Entry::Vacant(vac) => {
                if expected.is_some() {
                    return Ok(false);
                }
                vac.insert(Entry { value, version: 1 });
                Ok(true)
            }
        };
        result
    }

    async fn scan(&self, collection: &str, limit: usize) -> Result<Vec<Value>, AppError> {
        let col = self.collection(collection);
        let mut ids: Vec<String> = col.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids.truncate(limit);
        Ok(ids
            .into_iter()
            .filter_map(|id| col.get(&id).map(|e| e.value.clone()))
            .collect())
    }
}

/// How many CAS attempts a transaction makes before surfacing a retryable
/// conflict to the caller.
const MAX_TXN_ATTEMPTS: usize = 5;

/// Typed facade over a [`LedgerStore`].
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        match self.store.get(collection, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc.value)?)),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> Result<(), AppError> {
        let value = serde_json::to_value(record)?;
        self.store.put(collection, id, value).await
    }

    pub async fn scan<T: DeserializeOwned>(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<T>, AppError> {
        let values = self.store.scan(collection, limit).await?;
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(AppError::from))
            .collect()
    }

    /// Single-document read-modify-write transaction.
    ///
    /// `apply` receives the current record (or `None`) and must return the
    /// full record to write. Business errors from `apply` abort the
    /// transaction with no partial writes. A lost CAS race re-reads and
    /// re-runs `apply` against the winner's state; after
    /// [`MAX_TXN_ATTEMPTS`] losses the caller gets a retryable
    /// [`AppError::Conflict`].
    #[instrument(skip(self, apply), fields(collection = collection, id = id))]
    pub async fn transact<T, F>(
        &self,
        collection: &str,
        id: &str,
        mut apply: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnMut(Option<T>) -> Result<T, AppError>,
    {
        let timer = STORE_TXN_DURATION
            .with_label_values(&[collection])
            .start_timer();

        let mut attempts = 0;
        let result = loop {
            if attempts == MAX_TXN_ATTEMPTS {
                break Err(AppError::Conflict(anyhow::anyhow!(
                    "Transaction on {}/{} lost {} consecutive races",
                    collection,
                    id,
                    MAX_TXN_ATTEMPTS
                )));
            }
            attempts += 1;

            let current = self.store.get(collection, id).await?;
            let (decoded, expected) = match current {
                Some(doc) => (Some(serde_json::from_value(doc.value)?), Some(doc.version)),
                None => (None, None),
            };

            let next = apply(decoded)?;
            let value = serde_json::to_value(&next)?;

            if self
                .store
                .compare_and_put(collection, id, expected, value)
                .await?
            {
                break Ok(next);
            }
        };

        timer.observe_duration();
        result
    }
}
