pub mod linalg;

pub use linalg::*;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// One forward-pass step: updated estimate plus the one-step-ahead prediction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    /// Updated state estimate x(t) [n]
    pub state: DVector<f64>,

    /// Updated state covariance P(t) [n x n]
    pub covariance: DMatrix<f64>,

    /// Predicted observation H * x_pred(t) [m]
    pub predicted_observation: DVector<f64>,
}

/// Output of the forward filter, ordered by time
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterTrace {
    pub steps: Vec<FilterStep>,
}

impl FilterTrace {
    pub fn new(steps: Vec<FilterStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn states(&self) -> Vec<DVector<f64>> {
        self.steps.iter().map(|s| s.state.clone()).collect()
    }

    pub fn covariances(&self) -> Vec<DMatrix<f64>> {
        self.steps.iter().map(|s| s.covariance.clone()).collect()
    }

    pub fn predicted_observations(&self) -> Vec<DVector<f64>> {
        self.steps
            .iter()
            .map(|s| s.predicted_observation.clone())
            .collect()
    }

    /// First component of each predicted observation (the scalar "filtered" series).
    /// A step with an empty predicted observation yields NaN so indices stay aligned.
    pub fn filtered_observations(&self) -> Vec<f64> {
        self.steps
            .iter()
            .map(|s| s.predicted_observation.get(0).copied().unwrap_or(f64::NAN))
            .collect()
    }
}

/// One backward-pass step
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothedStep {
    /// Smoothed state estimate [n]
    pub state: DVector<f64>,

    /// Smoothed covariance [n x n]
    pub covariance: DMatrix<f64>,

    /// Smoother gain C(t) [n x n]; zero at the final index
    pub gain: DMatrix<f64>,
}

/// Output of the RTS smoother, ordered by time
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmoothedTrace {
    pub steps: Vec<SmoothedStep>,
}

impl SmoothedTrace {
    pub fn new(steps: Vec<SmoothedStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn states(&self) -> Vec<DVector<f64>> {
        self.steps.iter().map(|s| s.state.clone()).collect()
    }

    pub fn covariances(&self) -> Vec<DMatrix<f64>> {
        self.steps.iter().map(|s| s.covariance.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_observations_tolerates_empty_prediction() {
        let step = |prediction: Vec<f64>| FilterStep {
            state: DVector::zeros(1),
            covariance: DMatrix::identity(1, 1),
            predicted_observation: DVector::from_vec(prediction),
        };
        let trace = FilterTrace::new(vec![step(vec![2.5, 1.0]), step(vec![]), step(vec![3.0])]);

        let filtered = trace.filtered_observations();
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[0], 2.5);
        assert!(filtered[1].is_nan());
        assert_eq!(filtered[2], 3.0);
    }
}
