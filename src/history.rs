//! Observation batch history
//!
//! Raw observation batches are appended per (account, identifier) and later
//! read back as one concatenated series for re-filtering. The engine never
//! touches this; the service layer calls it before `forward`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type AccountId = i64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Unique identifier must not be empty")]
    EmptyIdentifier,

    #[error("Observation batch is empty")]
    EmptyBatch,

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Metadata for one stored batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub account_id: AccountId,
    pub unique_identifier: String,
    /// Position of this batch within the identifier's history (0-based)
    pub sequence: usize,
    pub observations: usize,
    pub recorded_at: DateTime<Utc>,
}

pub trait ObservationStore: Send + Sync {
    /// Append a batch of observation vectors
    fn append_batch(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
        batch: Vec<Vec<f64>>,
    ) -> Result<BatchRecord, StoreError>;

    /// All batches for the identifier, oldest first, concatenated.
    /// Unknown identifiers yield an empty series.
    fn fetch_concatenated(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
    ) -> Result<Vec<Vec<f64>>, StoreError>;
}

#[derive(Clone, Debug)]
struct StoredBatch {
    record: BatchRecord,
    data: Vec<Vec<f64>>,
}

type BatchKey = (AccountId, String);

/// Process-local store
#[derive(Clone, Default)]
pub struct InMemoryStore {
    batches: Arc<Mutex<HashMap<BatchKey, Vec<StoredBatch>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records for an identifier, oldest first
    pub fn records(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
    ) -> Result<Vec<BatchRecord>, StoreError> {
        let batches = self.batches.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(batches
            .get(&(account_id, unique_identifier.to_string()))
            .map(|stored| stored.iter().map(|b| b.record.clone()).collect())
            .unwrap_or_default())
    }
}

impl ObservationStore for InMemoryStore {
    fn append_batch(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
        batch: Vec<Vec<f64>>,
    ) -> Result<BatchRecord, StoreError> {
        if unique_identifier.trim().is_empty() {
            return Err(StoreError::EmptyIdentifier);
        }
        if batch.is_empty() {
            return Err(StoreError::EmptyBatch);
        }

        let mut batches = self.batches.lock().map_err(|_| StoreError::Poisoned)?;
        let history = batches
            .entry((account_id, unique_identifier.to_string()))
            .or_default();

        let record = BatchRecord {
            account_id,
            unique_identifier: unique_identifier.to_string(),
            sequence: history.len(),
            observations: batch.len(),
            recorded_at: Utc::now(),
        };
        history.push(StoredBatch {
            record: record.clone(),
            data: batch,
        });

        log::info!(
            "stored batch {} for account {} / {} ({} observations)",
            record.sequence,
            account_id,
            unique_identifier,
            record.observations
        );
        Ok(record)
    }

    fn fetch_concatenated(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
    ) -> Result<Vec<Vec<f64>>, StoreError> {
        if unique_identifier.trim().is_empty() {
            return Err(StoreError::EmptyIdentifier);
        }

        let batches = self.batches.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(batches
            .get(&(account_id, unique_identifier.to_string()))
            .map(|stored| {
                stored
                    .iter()
                    .flat_map(|b| b.data.iter().cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}
