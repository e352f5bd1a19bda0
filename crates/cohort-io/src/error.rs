//! I/O error types for cohort-io.

use std::path::PathBuf;

use cohort_cluster::ClusterError;
use cohort_series::SeriesError;

/// Errors from snapshot loading and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the snapshot file does not exist or is unreadable.
    #[error("snapshot not found: {path}")]
    SnapshotNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the snapshot is not valid JSON of the expected shape.
    #[error("JSON parse error in {path} at line {line}, column {column}")]
    JsonParse {
        /// Path to the snapshot.
        path: PathBuf,
        /// One-based line of the error.
        line: usize,
        /// One-based column of the error.
        column: usize,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a point lacks its timestamp or numeric value.
    #[error("malformed point in {path}: series {series}, point {point} has no {missing}")]
    MalformedPoint {
        /// Path to the snapshot.
        path: PathBuf,
        /// Zero-based series position.
        series: usize,
        /// Zero-based point position within the series.
        point: usize,
        /// Which field is absent.
        missing: &'static str,
    },

    /// Returned when the snapshot holds zero series.
    #[error("empty snapshot (no series) in {path}")]
    EmptySnapshot {
        /// Path to the snapshot.
        path: PathBuf,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the percentage table cannot be encoded as CSV.
    #[error("CSV write error in {path}")]
    Csv {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a result artifact cannot be encoded as JSON.
    #[error("cannot encode {what} as JSON")]
    Encode {
        /// Which artifact was being encoded.
        what: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when the number of resource ids does not match the result.
    #[error("{what}: expected {expected} entries, got {got}")]
    LengthMismatch {
        /// What was being written.
        what: &'static str,
        /// Number of resource ids.
        expected: usize,
        /// Number of result entries.
        got: usize,
    },

    /// Propagated from matrix construction.
    #[error(transparent)]
    Series(#[from] SeriesError),

    /// Propagated from clustering.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}
