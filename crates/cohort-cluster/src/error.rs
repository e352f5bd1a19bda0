use cohort_series::SeriesError;

/// Errors from clustering, constraint building and post-processing.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Returned when a cluster count is zero.
    #[error("k must be at least 1, got {k}")]
    InvalidK {
        /// The invalid k value provided.
        k: usize,
    },

    /// Returned when fewer series are provided than the requested k.
    #[error("need at least {k} series to form {k} clusters, got {n_series}")]
    TooFewSeries {
        /// Number of series provided.
        n_series: usize,
        /// Requested number of clusters.
        k: usize,
    },

    /// Returned when a threshold or fraction parameter is out of its valid range.
    #[error("{name} must be {expected}, got {value}")]
    InvalidThreshold {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable description of the valid range.
        expected: &'static str,
    },

    /// Returned when a per-series input does not match the matrix height.
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Which input disagreed.
        what: &'static str,
        /// Number of series in the matrix.
        expected: usize,
        /// Number of entries supplied.
        got: usize,
    },

    /// Returned when a signed assignment holds zero, which has no cluster.
    #[error("assignment entry {index} is zero; cluster ids start at 1")]
    ZeroClusterId {
        /// Position of the offending entry.
        index: usize,
    },

    /// Returned when a mode string is not recognised.
    #[error("unknown {kind} \"{value}\" (expected one of: {expected})")]
    UnknownMode {
        /// Which mode family was being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Accepted spellings.
        expected: &'static str,
    },

    /// Returned when every constrained restart was invalid.
    #[error("no valid clustering for k = {k} after {runs} restarts")]
    NoValidClustering {
        /// Requested number of clusters.
        k: usize,
        /// Number of restarts attempted.
        runs: usize,
    },

    /// Returned when a cluster becomes empty and cannot be rescued.
    #[error("cluster {label} became empty at iteration {iteration}")]
    EmptyCluster {
        /// Zero-based index of the cluster that became empty.
        label: usize,
        /// The iteration at which the cluster became empty.
        iteration: usize,
    },

    /// Returned when the density clustering parameters are rejected.
    #[error("density clustering parameters rejected: {0}")]
    Density(#[from] linfa_clustering::DbscanParamsError),

    /// Wraps a matrix or preprocessing error.
    #[error(transparent)]
    Series(#[from] SeriesError),
}
