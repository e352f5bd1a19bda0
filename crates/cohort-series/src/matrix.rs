//! Dense row-major numeric matrix, one row per series.

use std::ops::Index;

use crate::error::SeriesError;

/// Placeholder rendered for "no observation at this timestamp".
///
/// A real sample may share this value; [`ObservedMask`] records which cells
/// were actually observed.
pub const SENTINEL: f64 = -1.0;

/// Dense row-major matrix of `f64` values.
///
/// Every row has the same length. Rows correspond to series in the order the
/// matrix was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build a matrix from a vector of rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::RaggedRows`] | Rows differ in length |
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, SeriesError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != n_cols {
                return Err(SeriesError::RaggedRows {
                    row,
                    expected: n_cols,
                    got: values.len(),
                });
            }
            data.extend(values);
        }
        Ok(Self { n_rows, n_cols, data })
    }

    /// Build a matrix from flat row-major storage.
    pub(crate) fn from_raw(n_rows: usize, n_cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n_rows * n_cols);
        Self { n_rows, n_cols, data }
    }

    /// Return the number of rows (series).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Return true if the matrix has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_rows`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.n_rows, "row index {i} out of bounds for {} rows", self.n_rows);
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Return the value at `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row)[col]
    }

    /// Minimum over all cells, or `None` for an empty matrix.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::min)
    }

    /// Return a new matrix with `f` applied to every row.
    pub(crate) fn map_rows<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        let mut data = Vec::with_capacity(self.data.len());
        let mut n_cols = self.n_cols;
        for row in self.rows() {
            let mapped = f(row);
            n_cols = mapped.len();
            data.extend(mapped);
        }
        Self::from_raw(self.n_rows, n_cols, data)
    }

    /// Copy the matrix out as a vector of rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(<[f64]>::to_vec).collect()
    }
}

impl Index<(usize, usize)> for FeatureMatrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        assert!(col < self.n_cols, "column index {col} out of bounds for {} columns", self.n_cols);
        &self.row(row)[col]
    }
}

/// Which cells of a [`FeatureMatrix`] hold an observed sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedMask {
    n_rows: usize,
    n_cols: usize,
    data: Vec<bool>,
}

impl ObservedMask {
    /// Mask of the given shape with every cell observed.
    #[must_use]
    pub fn full(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            data: vec![true; n_rows * n_cols],
        }
    }

    /// Treat every cell equal to [`SENTINEL`] as missing.
    ///
    /// Only right for matrices known not to contain a real `-1.0` sample.
    #[must_use]
    pub fn from_sentinels(matrix: &FeatureMatrix) -> Self {
        Self {
            n_rows: matrix.n_rows,
            n_cols: matrix.n_cols,
            data: matrix.data.iter().map(|&v| v != SENTINEL).collect(),
        }
    }

    /// Build a mask from flat row-major storage.
    pub(crate) fn from_raw(n_rows: usize, n_cols: usize, data: Vec<bool>) -> Self {
        debug_assert_eq!(data.len(), n_rows * n_cols);
        Self { n_rows, n_cols, data }
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Borrow the flags for row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_rows`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[bool] {
        assert!(i < self.n_rows, "row index {i} out of bounds for {} rows", self.n_rows);
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Return true if cell `(row, col)` was observed.
    #[must_use]
    pub fn is_observed(&self, row: usize, col: usize) -> bool {
        self.row(row)[col]
    }

    /// Number of cells with no observation.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        self.data.iter().filter(|&&o| !o).count()
    }

    /// Return true if the mask matches the shape of `matrix`.
    #[must_use]
    pub fn fits(&self, matrix: &FeatureMatrix) -> bool {
        self.n_rows == matrix.n_rows && self.n_cols == matrix.n_cols
    }
}
