//! Label dictionary and the 0/1 design matrix built from it.

use std::collections::HashMap;

/// Bijection between informative label values and design-matrix columns.
///
/// Column indices follow the order in which values were first seen during the
/// scan. The same dictionary indexes the design matrix and any label columns
/// appended to a feature matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDictionary {
    values: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelDictionary {
    /// Build a dictionary from values in column order. Duplicates keep their
    /// first position.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dict = Self::default();
        for value in values {
            let value = value.into();
            if !dict.index.contains_key(&value) {
                dict.index.insert(value.clone(), dict.values.len());
                dict.values.push(value);
            }
        }
        dict
    }

    /// Return the column for `value`, if it is in the dictionary.
    #[must_use]
    pub fn column(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Return the value stored in column `col`.
    #[must_use]
    pub fn value(&self, col: usize) -> Option<&str> {
        self.values.get(col).map(String::as_str)
    }

    /// Return all values in column order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Return the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if no label survived filtering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(value, column)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.values.iter().enumerate().map(|(i, v)| (v.as_str(), i))
    }

    /// Return a dictionary whose column `j` holds the value of column `order[j]`.
    #[must_use]
    pub fn permuted(&self, order: &[usize]) -> Self {
        Self::from_values(order.iter().map(|&c| self.values[c].clone()))
    }
}

/// 0/1 matrix marking which series carry which dictionary label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<u8>,
}

impl DesignMatrix {
    /// Create an all-zero design matrix.
    #[must_use]
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            data: vec![0; n_rows * n_cols],
        }
    }

    /// Build a design matrix from rows of 0/1 flags. Any non-zero cell is
    /// stored as 1.
    ///
    /// # Panics
    ///
    /// Panics if rows differ in length.
    #[must_use]
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut m = Self::zeros(rows.len(), n_cols);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), n_cols, "design row {i} has the wrong length");
            for (j, &flag) in row.iter().enumerate() {
                if flag != 0 {
                    m.set(i, j);
                }
            }
        }
        m
    }

    pub(crate) fn set(&mut self, row: usize, col: usize) {
        self.data[row * self.n_cols + col] = 1;
    }

    /// Return the number of rows (series).
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the number of columns (labels).
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Borrow the flags of row `i`; this is the series' label pattern.
    #[must_use]
    pub fn row(&self, i: usize) -> &[u8] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    /// Return true if series `row` carries label `col`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.n_cols + col] != 0
    }

    /// Number of series carrying each label.
    #[must_use]
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_cols];
        for row in self.rows() {
            for (c, &flag) in counts.iter_mut().zip(row) {
                *c += usize::from(flag);
            }
        }
        counts
    }

    /// Return a matrix whose column `j` is column `order[j]` of `self`.
    #[must_use]
    pub fn permuted_columns(&self, order: &[usize]) -> Self {
        let mut out = Self::zeros(self.n_rows, order.len());
        for i in 0..self.n_rows {
            for (j, &src) in order.iter().enumerate() {
                if self.get(i, src) {
                    out.set(i, j);
                }
            }
        }
        out
    }

    /// Copy the matrix out as rows of flags.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.rows().map(<[u8]>::to_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_keeps_first_position() {
        let dict = LabelDictionary::from_values(["b", "a", "b", "c"]);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.column("b"), Some(0));
        assert_eq!(dict.column("a"), Some(1));
        assert_eq!(dict.column("c"), Some(2));
        assert_eq!(dict.column("z"), None);
        assert_eq!(dict.value(1), Some("a"));
    }

    #[test]
    fn dictionary_permutation() {
        let dict = LabelDictionary::from_values(["x", "y", "z"]);
        let p = dict.permuted(&[2, 0, 1]);
        assert_eq!(p.values(), &["z".to_string(), "x".to_string(), "y".to_string()]);
        assert_eq!(p.column("x"), Some(1));
    }

    #[test]
    fn design_from_rows_and_counts() {
        let d = DesignMatrix::from_rows(&[vec![1, 0], vec![1, 1], vec![0, 0]]);
        assert_eq!(d.n_rows(), 3);
        assert_eq!(d.n_cols(), 2);
        assert!(d.get(1, 1));
        assert!(!d.get(2, 0));
        assert_eq!(d.column_counts(), vec![2, 1]);
    }

    #[test]
    fn design_permuted_columns() {
        let d = DesignMatrix::from_rows(&[vec![1, 0, 0], vec![0, 1, 1]]);
        let p = d.permuted_columns(&[2, 0, 1]);
        assert_eq!(p.to_rows(), vec![vec![0, 1, 0], vec![1, 0, 1]]);
    }
}
