/// Rauch-Tung-Striebel fixed-interval smoother (backward pass)
///
/// Runs over the updated estimates of a forward pass, t = T-2 down to 0:
///   P_pred(t) = F P(t) F^T + Q
///   C(t)      = P(t) F^T P_pred(t)^-1
///   xs(t)     = x(t) + C(t) (xs(t+1) - F x(t))
///   Ps(t)     = P(t) + C(t) (Ps(t+1) - P_pred(t)) C(t)^T
///
/// The final index keeps the filter's own estimate.
use nalgebra::{DMatrix, DVector};

use super::kalman::KalmanEngine;
use crate::error::{EngineError, EngineResult};
use crate::types::linalg::{guarded_inverse, symmetrize};
use crate::types::{FilterTrace, SmoothedStep, SmoothedTrace};

impl KalmanEngine {
    /// Smooth a forward pass given its state and covariance sequences
    pub fn smooth(
        &self,
        states: &[DVector<f64>],
        covariances: &[DMatrix<f64>],
    ) -> EngineResult<SmoothedTrace> {
        if states.is_empty() || states.len() != covariances.len() {
            return Err(EngineError::TraceLengthMismatch {
                states: states.len(),
                covariances: covariances.len(),
            });
        }
        self.check_trace_shapes(states, covariances)?;

        let f = self.model().f();
        let q = self.model().q();
        let f_t = f.transpose();
        let n = self.model().state_dim();
        let last = states.len() - 1;

        log::debug!("smoothing pass: {} steps, n={}", states.len(), n);

        let mut next_state = states[last].clone();
        let mut next_covariance = covariances[last].clone();
        let mut reversed = Vec::with_capacity(states.len());
        reversed.push(SmoothedStep {
            state: next_state.clone(),
            covariance: next_covariance.clone(),
            gain: DMatrix::zeros(n, n),
        });

        for t in (0..last).rev() {
            let x = &states[t];
            let p = &covariances[t];

            let p_pred = f * p * &f_t + q;
            let p_pred_inv = guarded_inverse(&p_pred, self.singular_tolerance()).ok_or_else(|| {
                log::warn!("predicted covariance is singular at step {}", t);
                EngineError::SingularCovariance {
                    matrix: "predicted",
                    step: t,
                }
            })?;
            let gain = p * &f_t * p_pred_inv;

            let state = x + &gain * (&next_state - f * x);
            let covariance =
                symmetrize(&(p + &gain * (&next_covariance - &p_pred) * gain.transpose()));

            next_state = state.clone();
            next_covariance = covariance.clone();
            reversed.push(SmoothedStep {
                state,
                covariance,
                gain,
            });
        }

        reversed.reverse();
        Ok(SmoothedTrace::new(reversed))
    }

    /// Smooth the output of `forward`
    pub fn smooth_trace(&self, trace: &FilterTrace) -> EngineResult<SmoothedTrace> {
        self.smooth(&trace.states(), &trace.covariances())
    }

    fn check_trace_shapes(
        &self,
        states: &[DVector<f64>],
        covariances: &[DMatrix<f64>],
    ) -> EngineResult<()> {
        let n = self.model().state_dim();
        for (t, (x, p)) in states.iter().zip(covariances.iter()).enumerate() {
            if x.len() != n {
                return Err(EngineError::TraceShapeMismatch {
                    step: t,
                    detail: format!("state has length {}, expected {}", x.len(), n),
                });
            }
            if p.shape() != (n, n) {
                return Err(EngineError::TraceShapeMismatch {
                    step: t,
                    detail: format!(
                        "covariance is {}x{}, expected {}x{}",
                        p.nrows(),
                        p.ncols(),
                        n,
                        n
                    ),
                });
            }
        }
        Ok(())
    }
}
