//! Error types for matrix construction and preprocessing.

/// Errors from building and transforming series matrices.
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    /// Returned when the series collection is empty.
    #[error("series collection must be non-empty")]
    EmptyCollection,

    /// Returned when a series carries zero samples.
    #[error("series {index} has no samples")]
    EmptySeries {
        /// Position of the offending series in the collection.
        index: usize,
    },

    /// Returned when a sample value is NaN or infinite.
    #[error("series {series} has a non-finite value at sample {sample}")]
    NonFiniteValue {
        /// Position of the offending series.
        series: usize,
        /// Position of the offending sample within the series.
        sample: usize,
    },

    /// Returned when matrix rows do not all have the same length.
    #[error("row {row} has {got} columns, expected {expected}")]
    RaggedRows {
        /// Zero-based index of the first mismatching row.
        row: usize,
        /// Column count of the first row.
        expected: usize,
        /// Column count of the offending row.
        got: usize,
    },

    /// Returned when two matrices that must describe the same series disagree
    /// on the number of rows.
    #[error("row count mismatch: feature matrix has {features} rows, design matrix has {design}")]
    RowCountMismatch {
        /// Rows in the feature matrix.
        features: usize,
        /// Rows in the design matrix.
        design: usize,
    },

    /// Returned when an observation mask does not match its matrix.
    #[error("observation mask is {mask_rows}x{mask_cols}, matrix is {rows}x{cols}")]
    MaskShapeMismatch {
        /// Rows in the mask.
        mask_rows: usize,
        /// Columns in the mask.
        mask_cols: usize,
        /// Rows in the matrix.
        rows: usize,
        /// Columns in the matrix.
        cols: usize,
    },

    /// Returned when a variance target lies outside `(0, 1]`.
    #[error("variance target must lie in (0, 1], got {target}")]
    InvalidVarianceTarget {
        /// The rejected target.
        target: f64,
    },

    /// Returned when a mode string is not recognised.
    #[error("unknown {kind} mode \"{value}\" (expected one of: {expected})")]
    UnknownMode {
        /// Which mode family was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Accepted spellings.
        expected: &'static str,
    },
}
