//! Linear Kalman filter with a Rauch-Tung-Striebel smoother.
//!
//! Build a [`StateSpaceModel`] once, wrap it in a [`KalmanEngine`], then run
//! [`KalmanEngine::forward`] per observation batch and optionally
//! [`KalmanEngine::smooth`] over the result. The engine holds no state
//! between calls and can be shared across threads.

pub mod config;
pub mod error;
pub mod filters;
pub mod history;
pub mod interop;
pub mod model;
pub mod service;
pub mod types;

pub use config::{ConfigError, EngineConfig, ModelConfig};
pub use error::{EngineError, EngineResult};
pub use filters::{InitialCovariance, KalmanEngine};
pub use history::{InMemoryStore, ObservationStore, StoreError};
pub use model::StateSpaceModel;
pub use service::{process_batch, KalmanReport, KalmanService, ServiceError};
pub use types::{FilterStep, FilterTrace, SmoothedStep, SmoothedTrace};
