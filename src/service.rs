//! Caller-side orchestration around the engine.
//!
//! Turns a batch of plain observation rows into the report shape callers
//! consume, and keeps "save a batch" and "filter the stored history" as two
//! separate operations over an `ObservationStore`.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{EngineError, EngineResult};
use crate::filters::kalman::KalmanEngine;
use crate::history::{AccountId, BatchRecord, ObservationStore, StoreError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No stored observations for '{0}'")]
    NoHistory(String),
}

/// Filtered, raw and smoothed outputs for one series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KalmanReport {
    /// First component of each one-step-ahead predicted observation
    pub filtered_data: Vec<f64>,
    /// Updated state vectors from the forward pass
    pub raw_state: Vec<Vec<f64>>,
    /// RTS-smoothed state vectors
    pub smooth_state: Vec<Vec<f64>>,
    pub input_data: Vec<Vec<f64>>,
}

/// Acknowledgement for a stored batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveReceipt {
    pub message: String,
    pub record: BatchRecord,
}

fn to_rows(states: &[DVector<f64>]) -> Vec<Vec<f64>> {
    states
        .iter()
        .map(|s| s.iter().copied().collect())
        .collect()
}

/// Forward + smooth one batch; each inner list is one observation vector
pub fn process_batch(engine: &KalmanEngine, input: &[Vec<f64>]) -> EngineResult<KalmanReport> {
    let observations: Vec<DVector<f64>> = input
        .iter()
        .map(|row| DVector::from_column_slice(row))
        .collect();

    let trace = engine.forward(&observations)?;
    let smoothed = engine.smooth_trace(&trace)?;

    Ok(KalmanReport {
        filtered_data: trace.filtered_observations(),
        raw_state: to_rows(&trace.states()),
        smooth_state: to_rows(&smoothed.states()),
        input_data: input.to_vec(),
    })
}

pub struct KalmanService<S: ObservationStore> {
    engine: KalmanEngine,
    store: S,
}

impl<S: ObservationStore> KalmanService<S> {
    pub fn new(engine: KalmanEngine, store: S) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &KalmanEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Filter a batch without storing it
    pub fn process(&self, input: &[Vec<f64>]) -> Result<KalmanReport, ServiceError> {
        Ok(process_batch(&self.engine, input)?)
    }

    /// Store a batch for later re-filtering. Rows must fit the model.
    pub fn save_batch(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
        batch: Vec<Vec<f64>>,
    ) -> Result<SaveReceipt, ServiceError> {
        let observations: Vec<DVector<f64>> = batch
            .iter()
            .map(|row| DVector::from_column_slice(row))
            .collect();
        self.engine.model().check_observations(&observations)?;

        let record = self
            .store
            .append_batch(account_id, unique_identifier, batch)?;
        Ok(SaveReceipt {
            message: format!(
                "Saved {} observations for '{}'",
                record.observations, record.unique_identifier
            ),
            record,
        })
    }

    /// Re-filter everything stored under the identifier
    pub fn filter_history(
        &self,
        account_id: AccountId,
        unique_identifier: &str,
    ) -> Result<KalmanReport, ServiceError> {
        let history = self
            .store
            .fetch_concatenated(account_id, unique_identifier)?;
        if history.is_empty() {
            return Err(ServiceError::NoHistory(unique_identifier.to_string()));
        }

        log::debug!(
            "filtering {} stored observations for account {} / {}",
            history.len(),
            account_id,
            unique_identifier
        );
        Ok(process_batch(&self.engine, &history)?)
    }
}
