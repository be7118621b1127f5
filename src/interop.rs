//! Conversions between `ndarray` arrays and the engine's nalgebra types.
//!
//! Callers that hold their data as plain 2-D arrays (one row per time step)
//! can hand them over without reshaping by hand.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::error::{EngineError, EngineResult};
use crate::model::StateSpaceModel;

fn matrix_from_nd(array: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = array.dim();
    DMatrix::from_fn(rows, cols, |i, j| array[[i, j]])
}

fn vector_from_nd(array: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(array.len(), array.iter().copied())
}

/// Build a model from ndarray constants
pub fn model_from_arrays(
    f: &Array2<f64>,
    h: &Array2<f64>,
    q: &Array2<f64>,
    r: &Array2<f64>,
    x0: &Array1<f64>,
) -> EngineResult<StateSpaceModel> {
    StateSpaceModel::new(
        matrix_from_nd(f),
        matrix_from_nd(h),
        matrix_from_nd(q),
        matrix_from_nd(r),
        vector_from_nd(x0),
    )
}

/// One observation vector per row
pub fn observations_from_array(array: &Array2<f64>) -> Vec<DVector<f64>> {
    array
        .rows()
        .into_iter()
        .map(|row| DVector::from_iterator(row.len(), row.iter().copied()))
        .collect()
}

/// Stack state vectors as rows of a T x n array. All vectors must share a length.
pub fn states_to_array(states: &[DVector<f64>]) -> EngineResult<Array2<f64>> {
    let cols = states.first().map_or(0, |s| s.len());
    if let Some((t, s)) = states.iter().enumerate().find(|(_, s)| s.len() != cols) {
        return Err(EngineError::TraceShapeMismatch {
            step: t,
            detail: format!("state has length {}, expected {}", s.len(), cols),
        });
    }
    Ok(Array2::from_shape_fn((states.len(), cols), |(t, i)| {
        states[t][i]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::kalman::KalmanEngine;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_model_from_arrays() {
        let model = model_from_arrays(
            &arr2(&[[1.0, 1.0], [0.0, 1.0]]),
            &arr2(&[[1.0, 0.0]]),
            &arr2(&[[0.01, 0.0], [0.0, 0.01]]),
            &arr2(&[[1.0]]),
            &arr1(&[0.0, 0.0]),
        )
        .unwrap();
        assert_eq!(model.f()[(0, 1)], 1.0);
        assert_eq!(model.f()[(1, 0)], 0.0);
        assert_eq!(model.observation_dim(), 1);
    }

    #[test]
    fn test_model_from_arrays_rejects_mismatch() {
        let result = model_from_arrays(
            &arr2(&[[1.0, 0.0], [0.0, 1.0]]),
            &arr2(&[[1.0, 0.0, 0.0]]),
            &arr2(&[[1.0, 0.0], [0.0, 1.0]]),
            &arr2(&[[1.0]]),
            &arr1(&[0.0, 0.0]),
        );
        assert!(matches!(result, Err(EngineError::ModelDimension(_))));
    }

    #[test]
    fn test_transposed_view_is_read_by_index() {
        // Non-contiguous (transposed) input still converts element-wise
        let base = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let transposed = base.t().to_owned();
        let m = matrix_from_nd(&transposed);
        assert_eq!(m[(0, 1)], 3.0);
    }

    #[test]
    fn test_filter_from_array_rows() {
        let engine = KalmanEngine::new(StateSpaceModel::random_walk(0.01, 1.0, 0.0));
        let observations = observations_from_array(&arr2(&[[1.0], [1.1], [0.9]]));
        assert_eq!(observations.len(), 3);

        let trace = engine.forward(&observations).unwrap();
        let states = states_to_array(&trace.states()).unwrap();
        assert_eq!(states.dim(), (3, 1));
        assert_eq!(states[[2, 0]], trace.steps[2].state[0]);
    }

    #[test]
    fn test_states_to_array_rejects_ragged_rows() {
        let shorter_later = [DVector::zeros(2), DVector::zeros(1)];
        assert!(matches!(
            states_to_array(&shorter_later),
            Err(EngineError::TraceShapeMismatch { step: 1, .. })
        ));

        let longer_later = [DVector::zeros(1), DVector::zeros(2)];
        assert!(matches!(
            states_to_array(&longer_later),
            Err(EngineError::TraceShapeMismatch { step: 1, .. })
        ));

        assert_eq!(states_to_array(&[]).unwrap().dim(), (0, 0));
    }
}
