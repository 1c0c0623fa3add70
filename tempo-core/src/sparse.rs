//! Sparse matrix operations.
//!
//! Global systems are accumulated as (row, col, value) triplets and converted
//! to CSR (Compressed Sparse Row) for the linear solvers. Only equations below
//! the free-DOF count are stored; contributions to fixed equations are dropped
//! at scatter time.

use crate::error::{Error, Result};
use crate::types::{LocalMatrix, LocalVector};
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix.
pub type CsrMatrix = NalgebraCsr<f64>;

/// Builder for assembling a sparse matrix from triplets (COO format).
///
/// Accumulates (row, col, value) triplets and converts to CSR when complete.
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    /// Create a new triplet matrix builder.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Create with estimated capacity.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz_estimate),
            cols: Vec::with_capacity(nnz_estimate),
            values: Vec::with_capacity(nnz_estimate),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Add a value at (row, col). Duplicates are summed during conversion.
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.n_rows || col >= self.n_cols {
            return Err(Error::Assembly(format!(
                "entry ({}, {}) outside {}x{} matrix",
                row, col, self.n_rows, self.n_cols
            )));
        }
        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
        Ok(())
    }

    /// Scatter a dense local matrix at the given equation ids.
    ///
    /// Rows and columns whose id is outside the matrix (fixed equations)
    /// are skipped.
    pub fn add_submatrix(&mut self, equation_ids: &[usize], local: &LocalMatrix) -> Result<()> {
        let n = equation_ids.len();
        if local.shape() != (n, n) {
            return Err(Error::Assembly(format!(
                "local matrix is {}x{} but {} equation ids were given",
                local.nrows(),
                local.ncols(),
                n
            )));
        }

        for (i, &row) in equation_ids.iter().enumerate() {
            if row >= self.n_rows {
                continue;
            }
            for (j, &col) in equation_ids.iter().enumerate() {
                if col >= self.n_cols {
                    continue;
                }
                let value = local[(i, j)];
                if value != 0.0 {
                    self.rows.push(row);
                    self.cols.push(col);
                    self.values.push(value);
                }
            }
        }
        Ok(())
    }

    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR format, summing duplicate entries.
    pub fn to_csr(self) -> Result<CsrMatrix> {
        let coo = CooMatrix::try_from_triplets(
            self.n_rows,
            self.n_cols,
            self.rows,
            self.cols,
            self.values,
        )
        .map_err(|e| Error::Assembly(format!("invalid triplet data: {}", e)))?;

        Ok(CsrMatrix::from(&coo))
    }
}

/// Dense accumulator for the global right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector {
    values: Vec<f64>,
}

impl SparseVector {
    /// Create a zero vector of given size.
    pub fn zeros(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scatter a local vector at the given equation ids, skipping ids
    /// outside the vector (fixed equations).
    pub fn add_subvector(&mut self, equation_ids: &[usize], local: &LocalVector) -> Result<()> {
        if equation_ids.len() != local.len() {
            return Err(Error::Assembly(format!(
                "local vector has length {} but {} equation ids were given",
                local.len(),
                equation_ids.len()
            )));
        }
        for (&idx, &val) in equation_ids.iter().zip(local.iter()) {
            if let Some(slot) = self.values.get_mut(idx) {
                *slot += val;
            }
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Consume and return the dense vector.
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn test_triplet_to_csr() {
        let mut triplet = TripletMatrix::new(3, 3);
        triplet.add(0, 0, 1.0).unwrap();
        triplet.add(1, 1, 2.0).unwrap();
        triplet.add(2, 2, 3.0).unwrap();
        triplet.add(0, 1, 0.5).unwrap();
        triplet.add(1, 0, 0.5).unwrap();
        triplet.add(2, 0, 0.0).unwrap();

        let csr = triplet.to_csr().unwrap();
        assert_eq!(csr.nrows(), 3);
        assert_eq!(csr.ncols(), 3);
        assert_eq!(csr.nnz(), 5);
    }

    #[test]
    fn test_out_of_range_entry() {
        let mut triplet = TripletMatrix::new(2, 2);
        assert!(triplet.add(2, 0, 1.0).is_err());
    }

    #[test]
    fn test_duplicate_summation() {
        let mut triplet = TripletMatrix::new(2, 2);
        triplet.add(0, 0, 1.0).unwrap();
        triplet.add(0, 0, 2.0).unwrap();
        triplet.add(0, 0, 3.0).unwrap();

        let dense = DMatrix::from(&triplet.to_csr().unwrap());
        assert_relative_eq!(dense[(0, 0)], 6.0);
    }

    #[test]
    fn test_submatrix_skips_fixed_equations() {
        // Equations 0..3 free, 3 and 4 fixed.
        let mut triplet = TripletMatrix::new(3, 3);
        let ids = vec![0, 3, 2, 4];
        #[rustfmt::skip]
        let local = DMatrix::from_row_slice(4, 4, &[
            1.0, 0.5, 0.1, 0.0,
            0.5, 2.0, 0.0, 0.2,
            0.1, 0.0, 1.5, 0.3,
            0.0, 0.2, 0.3, 2.5,
        ]);
        triplet.add_submatrix(&ids, &local).unwrap();
        assert_eq!(triplet.nnz(), 4);

        let dense = DMatrix::from(&triplet.to_csr().unwrap());
        assert_relative_eq!(dense[(0, 0)], 1.0);
        assert_relative_eq!(dense[(0, 2)], 0.1);
        assert_relative_eq!(dense[(2, 2)], 1.5);
        assert_relative_eq!(dense[(1, 1)], 0.0);
    }

    #[test]
    fn test_submatrix_shape_mismatch() {
        let mut triplet = TripletMatrix::new(3, 3);
        let local = DMatrix::identity(2, 2);
        assert!(triplet.add_submatrix(&[0, 1, 2], &local).is_err());
    }

    #[test]
    fn test_sparse_vector() {
        let mut vec = SparseVector::zeros(3);
        vec.add_subvector(&[0, 5, 2], &DVector::from_vec(vec![1.0, 9.0, 3.0]))
            .unwrap();
        vec.add_subvector(&[2], &DVector::from_vec(vec![1.0])).unwrap();

        assert_eq!(vec.as_slice(), &[1.0, 0.0, 4.0]);
        assert_eq!(vec.len(), 3);
        assert!(vec
            .add_subvector(&[0, 1], &DVector::from_vec(vec![1.0]))
            .is_err());
    }
}
