/// Linear Kalman filter (forward pass)
///
/// Per step t, starting from x = x0 and P = P0:
///   x_pred = F x,              P_pred = F P F^T + Q
///   y      = z(t) - H x_pred,  S      = H P_pred H^T + R
///   K      = P_pred H^T S^-1
///   x      = x_pred + K y,     P      = sym((I - K H) P_pred)
///
/// The engine keeps no state between calls: every call starts from x0/P0.
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::model::StateSpaceModel;
use crate::types::linalg::{guarded_inverse, symmetrize, DEFAULT_SINGULAR_TOLERANCE};
use crate::types::{FilterStep, FilterTrace};

/// Initial covariance P0 used by every forward pass
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialCovariance {
    /// P0 = scale * I
    ScaledIdentity { scale: f64 },
    /// P0 = Q
    ProcessNoise,
}

impl Default for InitialCovariance {
    fn default() -> Self {
        InitialCovariance::ScaledIdentity { scale: 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct KalmanEngine {
    model: StateSpaceModel,
    initial_covariance: InitialCovariance,
    singular_tolerance: f64,
}

impl KalmanEngine {
    /// Engine with P0 = I and the default singularity tolerance
    pub fn new(model: StateSpaceModel) -> Self {
        Self {
            model,
            initial_covariance: InitialCovariance::default(),
            singular_tolerance: DEFAULT_SINGULAR_TOLERANCE,
        }
    }

    /// Set P0. A scaled identity needs a finite, non-negative scale.
    pub fn with_initial_covariance(
        mut self,
        initial_covariance: InitialCovariance,
    ) -> EngineResult<Self> {
        if let InitialCovariance::ScaledIdentity { scale } = initial_covariance {
            if !scale.is_finite() || scale < 0.0 {
                return Err(EngineError::InvalidSetting(format!(
                    "initial covariance scale must be finite and non-negative, got {}",
                    scale
                )));
            }
        }
        self.initial_covariance = initial_covariance;
        Ok(self)
    }

    /// Relative LU pivot threshold for treating S or P_pred as singular, in (0, 1)
    pub fn with_singular_tolerance(mut self, tolerance: f64) -> EngineResult<Self> {
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return Err(EngineError::InvalidSetting(format!(
                "singular_tolerance must be in (0, 1), got {}",
                tolerance
            )));
        }
        self.singular_tolerance = tolerance;
        Ok(self)
    }

    pub fn model(&self) -> &StateSpaceModel {
        &self.model
    }

    pub fn initial_covariance(&self) -> InitialCovariance {
        self.initial_covariance
    }

    pub fn singular_tolerance(&self) -> f64 {
        self.singular_tolerance
    }

    /// Materialize P0 for this model
    pub fn initial_covariance_matrix(&self) -> DMatrix<f64> {
        let n = self.model.state_dim();
        match self.initial_covariance {
            InitialCovariance::ScaledIdentity { scale } => DMatrix::identity(n, n) * scale,
            InitialCovariance::ProcessNoise => self.model.q().clone(),
        }
    }

    /// Run the filter over an ordered observation sequence.
    ///
    /// Returns one `FilterStep` per observation. Fails without partial output
    /// on an empty/mis-sized sequence or a singular innovation covariance.
    pub fn forward(&self, observations: &[DVector<f64>]) -> EngineResult<FilterTrace> {
        self.model.check_observations(observations)?;

        let f = self.model.f();
        let h = self.model.h();
        let q = self.model.q();
        let r = self.model.r();
        let f_t = f.transpose();
        let h_t = h.transpose();
        let n = self.model.state_dim();
        let identity = DMatrix::<f64>::identity(n, n);

        log::debug!(
            "forward pass: {} observations, n={}, m={}",
            observations.len(),
            n,
            self.model.observation_dim()
        );

        let mut x = self.model.x0().clone();
        let mut p = self.initial_covariance_matrix();
        let mut steps = Vec::with_capacity(observations.len());

        for (t, z) in observations.iter().enumerate() {
            // Predict
            let x_pred = f * &x;
            let p_pred = f * &p * &f_t + q;

            // Innovation
            let predicted_observation = h * &x_pred;
            let innovation = z - &predicted_observation;
            let s = h * &p_pred * &h_t + r;

            // Gain
            let s_inv = guarded_inverse(&s, self.singular_tolerance).ok_or_else(|| {
                log::warn!("innovation covariance is singular at step {}", t);
                EngineError::SingularCovariance {
                    matrix: "innovation",
                    step: t,
                }
            })?;
            let gain = &p_pred * &h_t * s_inv;

            // Update
            x = x_pred + &gain * innovation;
            p = symmetrize(&((&identity - &gain * h) * p_pred));

            steps.push(FilterStep {
                state: x.clone(),
                covariance: p.clone(),
                predicted_observation,
            });
        }

        Ok(FilterTrace::new(steps))
    }
}
