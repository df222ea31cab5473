//! Thin bridge between `ndarray` containers and `faer` factorizations.
//!
//! Training only needs one dense operation: solving the symmetric positive
//! definite system of the penalized IRLS normal equations.

use faer::linalg::solvers::{self, Solve};
use faer::{Mat, MatRef, Side};
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaerLinalgError {
    #[error("Cholesky factorization failed: {0:?}")]
    Cholesky(solvers::LltError),
    #[error("System matrix is {rows}x{cols} but the right-hand side has {rhs} entries.")]
    DimensionMismatch { rows: usize, cols: usize, rhs: usize },
}

fn to_faer(array: &Array2<f64>) -> Mat<f64> {
    let (rows, cols) = array.dim();
    Mat::from_fn(rows, cols, |i, j| array[(i, j)])
}

fn column_to_faer(array: &Array1<f64>) -> Mat<f64> {
    Mat::from_fn(array.len(), 1, |i, _| array[i])
}

fn column_from_faer(mat: MatRef<'_, f64>) -> Array1<f64> {
    Array1::from_shape_fn(mat.nrows(), |i| mat[(i, 0)])
}

/// Solves `a x = b` for symmetric positive definite `a` via Cholesky (LLT).
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, FaerLinalgError> {
    let (rows, cols) = a.dim();
    if rows != cols || rows != b.len() {
        return Err(FaerLinalgError::DimensionMismatch {
            rows,
            cols,
            rhs: b.len(),
        });
    }
    let lhs = to_faer(a);
    let rhs = column_to_faer(b);
    let factor = lhs
        .as_ref()
        .llt(Side::Lower)
        .map_err(FaerLinalgError::Cholesky)?;
    let solution = factor.solve(rhs.as_ref());
    Ok(column_from_faer(solution.as_ref()))
}
