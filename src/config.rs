//! Engine configuration
//!
//! The model constants live in a JSON document so callers can swap models
//! without recompiling. Missing fields fall back to the scalar random walk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;
use crate::filters::kalman::{InitialCovariance, KalmanEngine};
use crate::model::StateSpaceModel;
use crate::types::linalg::DEFAULT_SINGULAR_TOLERANCE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Row-major model constants
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub f: Vec<Vec<f64>>,
    pub h: Vec<Vec<f64>>,
    pub q: Vec<Vec<f64>>,
    pub r: Vec<Vec<f64>>,
    pub x0: Vec<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            f: vec![vec![1.0]],
            h: vec![vec![1.0]],
            q: vec![vec![0.01]],
            r: vec![vec![1.0]],
            x0: vec![0.0],
        }
    }
}

impl ModelConfig {
    pub fn build(&self) -> Result<StateSpaceModel, EngineError> {
        StateSpaceModel::from_rows(&self.f, &self.h, &self.q, &self.r, &self.x0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelConfig,
    pub initial_covariance: InitialCovariance,
    pub singular_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            initial_covariance: InitialCovariance::default(),
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Validate settings and build the engine
    pub fn build_engine(&self) -> Result<KalmanEngine, ConfigError> {
        let model = self.model.build()?;
        log::debug!(
            "engine config: n={}, m={}, P0={:?}",
            model.state_dim(),
            model.observation_dim(),
            self.initial_covariance
        );

        let engine = KalmanEngine::new(model)
            .with_initial_covariance(self.initial_covariance)?
            .with_singular_tolerance(self.singular_tolerance)?;
        Ok(engine)
    }
}
