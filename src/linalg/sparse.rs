//! Compressed sparse row matrix.
//!
//! A deliberately small CSR type: it is assembled from triplets, supports the
//! products the deformation pipeline needs, and is handed to a
//! [`LinearSolver`](super::LinearSolver) backend for factorization.

use nalgebra::{DMatrix, DVector};

/// Compressed Sparse Row (CSR) matrix.
///
/// Column indices within each row are sorted and unique.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers: row_ptr[i] is the index in col_idx/values where row i starts.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column indices for each non-zero value.
    col_idx: Vec<usize>,
    /// Non-zero values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed. Entries that sum
    /// to exactly zero are kept, so the sparsity pattern reflects the input.
    ///
    /// # Panics
    ///
    /// Panics if a triplet lies outside `rows × cols`.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            assert!(row < rows && col < cols, "triplet ({row}, {col}) out of bounds");
            match (last, values.last_mut()) {
                (Some(prev), Some(acc)) if prev == (row, col) => *acc += val,
                _ => {
                    col_idx.push(col);
                    values.push(val);
                    row_ptr[row + 1] += 1;
                    last = Some((row, col));
                }
            }
        }

        // Per-row counts to prefix sums.
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of row `i` as `(col, value)` pairs, sorted by column.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// All stored entries as `(row, col, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }

    /// Entry at (i, j), zero if not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        match self.col_idx[range.clone()].binary_search(&j) {
            Ok(k) => self.values[range.start + k],
            Err(_) => 0.0,
        }
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| self.row(i).map(|(j, v)| v * x[j]).sum::<f64>()),
        )
    }

    /// Multiply matrix by a dense matrix: Y = A * X.
    pub fn mul_dense(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        assert_eq!(x.nrows(), self.cols, "Matrix dimension mismatch");

        let mut y = DMatrix::zeros(self.rows, x.ncols());
        for (i, j, v) in self.triplets() {
            for c in 0..x.ncols() {
                y[(i, c)] += v * x[(j, c)];
            }
        }
        y
    }

    /// Multiply the transpose by a dense matrix: Y = Aᵗ * X.
    pub fn transpose_mul_dense(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        assert_eq!(x.nrows(), self.rows, "Matrix dimension mismatch");

        let mut y = DMatrix::zeros(self.cols, x.ncols());
        for (i, j, v) in self.triplets() {
            for c in 0..x.ncols() {
                y[(j, c)] += v * x[(i, c)];
            }
        }
        y
    }

    /// Keep a subset of columns, renumbered.
    ///
    /// `column_map[j]` is the new index of column `j`, or `None` to drop it.
    /// The result has `new_cols` columns and the same rows.
    pub fn select_columns(&self, column_map: &[Option<usize>], new_cols: usize) -> CsrMatrix {
        assert_eq!(column_map.len(), self.cols, "Column map dimension mismatch");

        let triplets = self
            .triplets()
            .filter_map(|(i, j, v)| column_map[j].map(|nj| (i, nj, v)))
            .collect();
        CsrMatrix::from_triplets(self.rows, new_cols, triplets)
    }

    /// Gram matrix AᵗA.
    pub fn gram(&self) -> CsrMatrix {
        let mut triplets = Vec::new();
        for i in 0..self.rows {
            let range = self.row_ptr[i]..self.row_ptr[i + 1];
            for a in range.clone() {
                for b in range.clone() {
                    triplets.push((
                        self.col_idx[a],
                        self.col_idx[b],
                        self.values[a] * self.values[b],
                    ));
                }
            }
        }
        CsrMatrix::from_triplets(self.cols, self.cols, triplets)
    }

    /// Dense copy, for small systems and tests.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.rows, self.cols);
        for (i, j, v) in self.triplets() {
            m[(i, j)] += v;
        }
        m
    }
}
