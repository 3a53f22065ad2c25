//! Load lookup collaborator.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::error::AppError;
use crate::models::LoadRecord;
use crate::store::{collections, Ledger};

/// Resolves a load to its delivery status, payer identity, and payment
/// terms. Owned by the dispatch subsystem; the finance service only
/// consumes this narrow interface.
#[async_trait]
pub trait LoadLookup: Send + Sync {
    async fn get_load(&self, load_id: &str) -> Result<Option<LoadRecord>, AppError>;

    /// Best-effort patch (invoice back-references). Callers log failures
    /// instead of propagating them.
    async fn update_load(&self, load_id: &str, patch: Value) -> Result<(), AppError>;
}

/// Load lookup backed by the ledger store's `loads` collection.
#[derive(Clone)]
pub struct LedgerLoadLookup {
    ledger: Ledger,
}

impl LedgerLoadLookup {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl LoadLookup for LedgerLoadLookup {
    #[instrument(skip(self), fields(load_id = load_id))]
    async fn get_load(&self, load_id: &str) -> Result<Option<LoadRecord>, AppError> {
        self.ledger.get(collections::LOADS, load_id).await
    }

    #[instrument(skip(self, patch), fields(load_id = load_id))]
    async fn update_load(&self, load_id: &str, patch: Value) -> Result<(), AppError> {
        self.ledger
            .transact::<Value, _>(collections::LOADS, load_id, |current| {
                let mut doc = current.ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!("Load {} not found", load_id))
                })?;
                if let (Some(doc), Some(patch)) = (doc.as_object_mut(), patch.as_object()) {
                    for (k, v) in patch {
                        doc.insert(k.clone(), v.clone());
                    }
                }
                Ok(doc)
            })
            .await?;
        Ok(())
    }
}
