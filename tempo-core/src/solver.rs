//! Linear system solvers.
//!
//! Solves the effective system `A dx = r` assembled at every Newton iteration.
//!
//! # Solver Backends
//!
//! - [`FaerCholeskySolver`]: Sparse Cholesky factorization using the faer library.
//!   The effective dynamic matrix `K + c0 M + c1 D` is symmetric positive
//!   definite whenever the mass matrix is, which makes this the default.
//! - [`DenseLUSolver`]: nalgebra dense LU, for small or unsymmetric problems.

use crate::error::{Error, Result};
use crate::sparse::CsrMatrix;
use faer::linalg::cholesky::llt::factor::LltError;
use faer::prelude::*;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use serde::Deserialize;

/// Linear solver interface.
pub trait Solver: Send + Sync {
    /// Solve the linear system Ax = b.
    ///
    /// # Arguments
    ///
    /// * `matrix` - Effective system matrix (A)
    /// * `rhs` - Residual vector (b)
    ///
    /// # Returns
    ///
    /// Solution increment (x)
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>>;

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    /// Sparse Cholesky via faer.
    #[default]
    Direct,
    /// Dense LU via nalgebra.
    Dense,
}

fn check_system(matrix: &CsrMatrix, rhs: &[f64]) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::Solver(format!(
            "matrix must be square, got {}x{}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.nrows() != rhs.len() {
        return Err(Error::DimensionMismatch {
            expected: matrix.nrows(),
            actual: rhs.len(),
        });
    }
    Ok(())
}

/// Reject solutions containing NaN or infinite entries.
pub fn check_finite(solution: &[f64]) -> Result<()> {
    match solution.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(Error::NonFiniteSolution { index }),
        None => Ok(()),
    }
}

/// Relative tolerance of [`check_symmetric`], scaled by the largest entry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Reject matrices that are not symmetric within [`SYMMETRY_TOLERANCE`].
///
/// Entries stored on one side only are compared against zero, so explicit
/// zeros in the pattern do not matter.
pub fn check_symmetric(matrix: &CsrMatrix) -> Result<()> {
    let scale = matrix.values().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let tolerance = SYMMETRY_TOLERANCE * scale;
    let transpose = matrix.transpose();

    for (row, (lower, upper)) in matrix.row_iter().zip(transpose.row_iter()).enumerate() {
        let (a_cols, a_vals) = (lower.col_indices(), lower.values());
        let (t_cols, t_vals) = (upper.col_indices(), upper.values());
        let (mut i, mut j) = (0, 0);
        while i < a_cols.len() || j < t_cols.len() {
            let a_col = a_cols.get(i).copied().unwrap_or(usize::MAX);
            let t_col = t_cols.get(j).copied().unwrap_or(usize::MAX);
            let (col, a, t) = if a_col == t_col {
                i += 1;
                j += 1;
                (a_col, a_vals[i - 1], t_vals[j - 1])
            } else if a_col < t_col {
                i += 1;
                (a_col, a_vals[i - 1], 0.0)
            } else {
                j += 1;
                (t_col, 0.0, t_vals[j - 1])
            };
            if (a - t).abs() > tolerance {
                return Err(Error::Solver(format!(
                    "matrix is not symmetric: A[{row},{col}] = {a}, A[{col},{row}] = {t}"
                )));
            }
        }
    }
    Ok(())
}

/// Direct solver using nalgebra dense LU factorization.
///
/// Converts the system to dense storage; only suitable for small problems.
#[derive(Debug, Default)]
pub struct DenseLUSolver;

impl DenseLUSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DenseLUSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        use nalgebra::{DMatrix, DVector};

        check_system(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let dense = DMatrix::from(matrix);
        let b = DVector::from_column_slice(rhs);

        let solution = dense
            .lu()
            .solve(&b)
            .ok_or_else(|| Error::SingularMatrix("LU factorization failed".into()))?;

        let solution = solution.as_slice().to_vec();
        check_finite(&solution)?;
        Ok(solution)
    }

    fn name(&self) -> &str {
        "Dense LU"
    }
}

/// Convert nalgebra-sparse CSR matrix to faer SparseColMat (CSC format).
///
/// Each CSR row is scattered into the CSC columns, so the result is the
/// same matrix (not its transpose) with sorted row indices.
fn csr_to_faer_csc(csr: &CsrMatrix) -> SparseColMat<usize, f64> {
    let nrows = csr.nrows();
    let ncols = csr.ncols();

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    let mut col_offsets = vec![0usize; ncols + 1];
    for &col in col_indices {
        col_offsets[col + 1] += 1;
    }
    for i in 0..ncols {
        col_offsets[i + 1] += col_offsets[i];
    }

    let nnz = values.len();
    let mut csc_row_indices = vec![0usize; nnz];
    let mut csc_values = vec![0.0f64; nnz];
    let mut col_positions = col_offsets[..ncols].to_vec();

    for row in 0..nrows {
        for idx in row_offsets[row]..row_offsets[row + 1] {
            let col = col_indices[idx];
            let pos = col_positions[col];
            csc_row_indices[pos] = row;
            csc_values[pos] = values[idx];
            col_positions[col] += 1;
        }
    }

    // SAFETY: offsets are monotone and end at nnz; row indices are in range
    // and ascending within each column since rows are visited in order.
    unsafe {
        SparseColMat::new(
            SymbolicSparseColMat::new_unchecked(nrows, ncols, col_offsets, None, csc_row_indices),
            csc_values,
        )
    }
}

fn llt_error(e: SparseLltError) -> Error {
    match e {
        SparseLltError::Generic(err) => Error::Solver(format!("sparse Cholesky error: {:?}", err)),
        SparseLltError::Numeric(LltError::NonPositivePivot { index }) => Error::SingularMatrix(
            format!("matrix is not positive definite at pivot {}", index),
        ),
    }
}

/// Sparse Cholesky solver using the faer library.
///
/// Uses faer's sparse LLᵀ factorization on the lower triangle of the
/// effective matrix. An unsymmetric matrix is rejected with [`Error::Solver`]
/// before factorization; use [`DenseLUSolver`] for those. A matrix that is
/// not positive definite (for example a free DOF with neither mass nor
/// stiffness) is reported as [`Error::SingularMatrix`].
#[derive(Debug, Default)]
pub struct FaerCholeskySolver;

impl FaerCholeskySolver {
    /// Create a new sparse Cholesky solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerCholeskySolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        check_system(matrix, rhs)?;
        let n = rhs.len();
        if n == 0 {
            return Ok(vec![]);
        }
        check_symmetric(matrix)?;

        let csc = csr_to_faer_csc(matrix);
        let csc_ref = csc.as_ref();

        let symbolic = SymbolicLlt::try_new(csc_ref.symbolic(), faer::Side::Lower)
            .map_err(|_| Error::Solver("symbolic Cholesky analysis failed".into()))?;
        let llt = Llt::try_new_with_symbolic(symbolic, csc_ref, faer::Side::Lower)
            .map_err(llt_error)?;

        let mut x = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
        llt.solve_in_place(x.as_mut());

        let solution: Vec<f64> = (0..n).map(|i| x[(i, 0)]).collect();
        check_finite(&solution)?;
        Ok(solution)
    }

    fn name(&self) -> &str {
        "faer Sparse Cholesky (LLᵀ)"
    }
}

/// Create the solver for `solver_type`.
pub fn select_solver(solver_type: SolverType) -> Box<dyn Solver> {
    match solver_type {
        SolverType::Direct => Box::new(FaerCholeskySolver::new()),
        SolverType::Dense => Box::new(DenseLUSolver::new()),
    }
}
