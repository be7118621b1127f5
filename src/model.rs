//! Linear state-space model
//!
//! x(t+1) = F x(t) + w,  w ~ N(0, Q)
//! z(t)   = H x(t) + v,  v ~ N(0, R)
//!
//! Shapes are checked once here; the engine trusts them afterwards.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::types::linalg::matrix_from_rows;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateSpaceModel {
    /// State transition [n x n]
    f: DMatrix<f64>,

    /// Observation matrix [m x n]
    h: DMatrix<f64>,

    /// Process noise covariance [n x n]
    q: DMatrix<f64>,

    /// Observation noise covariance [m x m]
    r: DMatrix<f64>,

    /// Initial state estimate [n]
    x0: DVector<f64>,
}

impl StateSpaceModel {
    /// Validate shapes and build the model
    pub fn new(
        f: DMatrix<f64>,
        h: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        x0: DVector<f64>,
    ) -> EngineResult<Self> {
        let (f_rows, f_cols) = f.shape();
        if f_rows != f_cols || f_rows == 0 {
            return Err(EngineError::ModelDimension(format!(
                "F must be non-empty and square, got {}x{}",
                f_rows, f_cols
            )));
        }
        let n = f_rows;

        let (h_rows, h_cols) = h.shape();
        if h_cols != n {
            return Err(EngineError::ModelDimension(format!(
                "H has {} columns but the state dimension is {}",
                h_cols, n
            )));
        }
        if h_rows == 0 {
            return Err(EngineError::ModelDimension(
                "H must have at least one row".to_string(),
            ));
        }
        let m = h_rows;

        if q.shape() != (n, n) {
            return Err(EngineError::ModelDimension(format!(
                "Q must be {}x{}, got {}x{}",
                n,
                n,
                q.nrows(),
                q.ncols()
            )));
        }

        if r.shape() != (m, m) {
            return Err(EngineError::ModelDimension(format!(
                "R must be square and match H's {} rows, got {}x{}",
                m,
                r.nrows(),
                r.ncols()
            )));
        }

        if x0.len() != n {
            return Err(EngineError::ModelDimension(format!(
                "x0 has length {} but the state dimension is {}",
                x0.len(),
                n
            )));
        }

        Ok(Self { f, h, q, r, x0 })
    }

    /// Build from row-major nested rows (plain numeric arrays)
    pub fn from_rows(
        f: &[Vec<f64>],
        h: &[Vec<f64>],
        q: &[Vec<f64>],
        r: &[Vec<f64>],
        x0: &[f64],
    ) -> EngineResult<Self> {
        let parse = |name: &str, rows: &[Vec<f64>]| {
            matrix_from_rows(rows).ok_or_else(|| {
                EngineError::ModelDimension(format!("{} has rows of unequal length", name))
            })
        };

        Self::new(
            parse("F", f)?,
            parse("H", h)?,
            parse("Q", q)?,
            parse("R", r)?,
            DVector::from_column_slice(x0),
        )
    }

    /// Scalar random walk: F = H = [[1]]
    pub fn random_walk(process_var: f64, observation_var: f64, initial: f64) -> Self {
        Self {
            f: DMatrix::identity(1, 1),
            h: DMatrix::identity(1, 1),
            q: DMatrix::from_element(1, 1, process_var),
            r: DMatrix::from_element(1, 1, observation_var),
            x0: DVector::from_element(1, initial),
        }
    }

    pub fn f(&self) -> &DMatrix<f64> {
        &self.f
    }

    pub fn h(&self) -> &DMatrix<f64> {
        &self.h
    }

    pub fn q(&self) -> &DMatrix<f64> {
        &self.q
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn x0(&self) -> &DVector<f64> {
        &self.x0
    }

    /// n
    pub fn state_dim(&self) -> usize {
        self.f.nrows()
    }

    /// m
    pub fn observation_dim(&self) -> usize {
        self.h.nrows()
    }

    /// Reject empty sequences and observations that don't fit this model
    pub fn check_observations(&self, observations: &[DVector<f64>]) -> EngineResult<()> {
        if observations.is_empty() {
            return Err(EngineError::InvalidObservation(
                "observation sequence is empty".to_string(),
            ));
        }

        let m = self.observation_dim();
        for (t, z) in observations.iter().enumerate() {
            if z.is_empty() {
                return Err(EngineError::InvalidObservation(format!(
                    "observation {} is empty",
                    t
                )));
            }
            if z.len() != m {
                return Err(EngineError::InvalidObservation(format!(
                    "observation {} has dimension {}, expected {}",
                    t,
                    z.len(),
                    m
                )));
            }
            if z.iter().any(|v| !v.is_finite()) {
                return Err(EngineError::InvalidObservation(format!(
                    "observation {} contains a non-finite value",
                    t
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_dimension_error(result: EngineResult<StateSpaceModel>) -> bool {
        matches!(result, Err(EngineError::ModelDimension(_)))
    }

    #[test]
    fn test_valid_two_state_model() {
        let model = StateSpaceModel::from_rows(
            &[vec![1.0, 1.0], vec![0.0, 1.0]],
            &[vec![1.0, 0.0]],
            &[vec![0.01, 0.0], vec![0.0, 0.01]],
            &[vec![0.5]],
            &[0.0, 1.0],
        )
        .unwrap();

        assert_eq!(model.state_dim(), 2);
        assert_eq!(model.observation_dim(), 1);
        assert_eq!(model.f()[(0, 1)], 1.0);
        assert_eq!(model.x0()[1], 1.0);
    }

    #[test]
    fn test_f_and_h_mismatch() {
        // F is 2x2 but H is 1x3
        let result = StateSpaceModel::new(
            DMatrix::identity(2, 2),
            DMatrix::from_element(1, 3, 1.0),
            DMatrix::identity(2, 2),
            DMatrix::identity(1, 1),
            DVector::zeros(2),
        );
        assert!(is_dimension_error(result));
    }

    #[test]
    fn test_shape_rules() {
        let f = || DMatrix::<f64>::identity(2, 2);
        let h = || DMatrix::<f64>::from_element(1, 2, 1.0);
        let q = || DMatrix::<f64>::identity(2, 2);
        let r = || DMatrix::<f64>::identity(1, 1);
        let x0 = || DVector::<f64>::zeros(2);

        // F not square
        assert!(is_dimension_error(StateSpaceModel::new(
            DMatrix::zeros(2, 3),
            h(),
            q(),
            r(),
            x0()
        )));
        // Q wrong size
        assert!(is_dimension_error(StateSpaceModel::new(
            f(),
            h(),
            DMatrix::identity(3, 3),
            r(),
            x0()
        )));
        // R not matching H rows
        assert!(is_dimension_error(StateSpaceModel::new(
            f(),
            h(),
            q(),
            DMatrix::identity(2, 2),
            x0()
        )));
        // R not square
        assert!(is_dimension_error(StateSpaceModel::new(
            f(),
            h(),
            q(),
            DMatrix::zeros(1, 2),
            x0()
        )));
        // x0 wrong length
        assert!(is_dimension_error(StateSpaceModel::new(
            f(),
            h(),
            q(),
            r(),
            DVector::zeros(3)
        )));
        // Empty model
        assert!(is_dimension_error(StateSpaceModel::new(
            DMatrix::zeros(0, 0),
            DMatrix::zeros(0, 0),
            DMatrix::zeros(0, 0),
            DMatrix::zeros(0, 0),
            DVector::zeros(0)
        )));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = StateSpaceModel::from_rows(
            &[vec![1.0, 0.0], vec![1.0]],
            &[vec![1.0, 0.0]],
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            &[vec![1.0]],
            &[0.0, 0.0],
        );
        assert!(is_dimension_error(result));
    }

    #[test]
    fn test_check_observations() {
        let model = StateSpaceModel::random_walk(0.01, 1.0, 0.0);

        assert!(matches!(
            model.check_observations(&[]),
            Err(EngineError::InvalidObservation(_))
        ));
        assert!(matches!(
            model.check_observations(&[DVector::zeros(0)]),
            Err(EngineError::InvalidObservation(_))
        ));
        assert!(matches!(
            model.check_observations(&[DVector::from_vec(vec![1.0]), DVector::zeros(2)]),
            Err(EngineError::InvalidObservation(_))
        ));
        assert!(matches!(
            model.check_observations(&[DVector::from_vec(vec![f64::NAN])]),
            Err(EngineError::InvalidObservation(_))
        ));
        assert!(model
            .check_observations(&[DVector::from_vec(vec![1.0])])
            .is_ok());
    }
}
