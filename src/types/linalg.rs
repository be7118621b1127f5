//! Linear algebra helpers for the Kalman engine
//!
//! Dynamic-size aliases plus the numerical guards shared by the
//! forward filter and the backward smoother.

use nalgebra::{DMatrix, DVector};

// ===== Dynamic Types =====
pub type StateVec = DVector<f64>;
pub type StateMat = DMatrix<f64>;
pub type ObsVec = DVector<f64>;

// ===== Tolerances =====
/// Relative LU pivot threshold below which a matrix is treated as singular.
pub const DEFAULT_SINGULAR_TOLERANCE: f64 = 1e-12;

/// Absolute tolerance used when checking covariance symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Force symmetry: `(P + P^T) / 2`
pub fn symmetrize(p: &DMatrix<f64>) -> DMatrix<f64> {
    (p + p.transpose()) * 0.5
}

/// Check `|P - P^T| <= tolerance` entry-wise
pub fn is_symmetric(p: &DMatrix<f64>, tolerance: f64) -> bool {
    if !p.is_square() {
        return false;
    }
    let n = p.nrows();
    (0..n).all(|i| (0..i).all(|j| (p[(i, j)] - p[(j, i)]).abs() <= tolerance))
}

/// Invert a square matrix, refusing near-singular inputs.
///
/// The matrix is first equilibrated as `D^-1/2 M D^-1/2` with `D` its
/// diagonal magnitudes, so covariances whose components differ wildly in
/// scale are judged on their correlation structure. It is rejected when it
/// holds non-finite entries, when every LU pivot of the equilibrated matrix
/// is zero, or when any pivot is within `tolerance` of zero relative to the
/// largest one.
pub fn guarded_inverse(m: &DMatrix<f64>, tolerance: f64) -> Option<DMatrix<f64>> {
    if !m.is_square() || m.nrows() == 0 || m.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let weights = m.diagonal().map(|d| {
        let magnitude = d.abs();
        if magnitude > 0.0 {
            1.0 / magnitude.sqrt()
        } else {
            1.0
        }
    });
    let d = DMatrix::from_diagonal(&weights);
    let equilibrated = &d * m * &d;

    let lu = equilibrated.lu();
    let pivots = lu.u().diagonal();
    let scale = pivots.iter().fold(0.0_f64, |acc, p| acc.max(p.abs()));
    if scale == 0.0 || pivots.iter().any(|p| p.abs() <= tolerance * scale) {
        return None;
    }

    // M^-1 = D (D M D)^-1 D
    let inverse = &d * lu.try_inverse()? * &d;
    if inverse.iter().all(|v| v.is_finite()) {
        Some(inverse)
    } else {
        None
    }
}

/// Build a matrix from row-major nested rows. `None` if rows are ragged.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Option<DMatrix<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |row| row.len());
    if rows.iter().any(|row| row.len() != n_cols) {
        return None;
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Some(DMatrix::from_row_slice(n_rows, n_cols, &flat))
}

/// Row-major nested rows of a matrix
pub fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_symmetrize_averages_off_diagonal() {
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 3.0, 4.0]);
        let sym = symmetrize(&p);
        assert_eq!(sym[(0, 1)], 2.0);
        assert_eq!(sym[(1, 0)], 2.0);
        assert_eq!(sym[(0, 0)], 2.0);
        assert!(is_symmetric(&sym, 0.0));
        assert!(!is_symmetric(&p, 0.5));
    }

    #[test]
    fn test_guarded_inverse_regular() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let inv = guarded_inverse(&m, DEFAULT_SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(&m * inv, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn test_guarded_inverse_rejects_singular() {
        let rank_one = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(guarded_inverse(&rank_one, DEFAULT_SINGULAR_TOLERANCE).is_none());

        let zero = DMatrix::<f64>::zeros(1, 1);
        assert!(guarded_inverse(&zero, DEFAULT_SINGULAR_TOLERANCE).is_none());

        let nan = DMatrix::from_row_slice(1, 1, &[f64::NAN]);
        assert!(guarded_inverse(&nan, DEFAULT_SINGULAR_TOLERANCE).is_none());
    }

    #[test]
    fn test_guarded_inverse_accepts_small_but_well_conditioned() {
        let tiny = DMatrix::identity(3, 3) * 1e-10;
        let inv = guarded_inverse(&tiny, DEFAULT_SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(inv[(2, 2)], 1e10, max_relative = 1e-12);
    }

    #[test]
    fn test_guarded_inverse_mixed_scale_diagonal() {
        let s = DMatrix::from_diagonal(&DVector::from_vec(vec![3e6, 3e-8]));
        let inv = guarded_inverse(&s, DEFAULT_SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(inv[(0, 0)], 1.0 / 3e6, max_relative = 1e-12);
        assert_relative_eq!(inv[(1, 1)], 1.0 / 3e-8, max_relative = 1e-12);
        assert_eq!(inv[(0, 1)], 0.0);
    }

    #[test]
    fn test_guarded_inverse_mixed_scale_correlated() {
        // SPD with off-diagonal coupling and a 1e14 spread in variances
        let s = DMatrix::from_row_slice(2, 2, &[1e6, 0.05, 0.05, 1e-8]);
        let inv = guarded_inverse(&s, DEFAULT_SINGULAR_TOLERANCE).unwrap();
        assert_relative_eq!(&s * inv, DMatrix::identity(2, 2), epsilon = 1e-6);

        // Perfect correlation stays singular after equilibration
        let rank_one = DMatrix::from_row_slice(2, 2, &[1e6, 0.1, 0.1, 1e-8]);
        assert!(guarded_inverse(&rank_one, DEFAULT_SINGULAR_TOLERANCE).is_none());
    }

    #[test]
    fn test_matrix_rows_round_trip_and_ragged() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let m = matrix_from_rows(&rows).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(matrix_to_rows(&m), rows);

        assert!(matrix_from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }
}
