//! Configuration builders for plain k-means and the inertia sweep over k.

use cohort_series::FeatureMatrix;

use crate::error::ClusterError;
use crate::result::{KMeansResult, SweepResult};

/// Configuration for plain (unconstrained) k-means.
///
/// Construct via [`KMeansConfig::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `n_init`   | 10      |
/// | `max_iter` | 300     |
/// | `tol`      | 1e-4    |
/// | `seed`     | 42      |
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub(crate) k: usize,
    pub(crate) n_init: usize,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) seed: u64,
}

impl KMeansConfig {
    /// Create a new k-means configuration with the given cluster count.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidK`] | `k` is zero |
    pub fn new(k: usize) -> Result<Self, ClusterError> {
        if k == 0 {
            return Err(ClusterError::InvalidK { k });
        }
        Ok(Self {
            k,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        })
    }

    /// Set the number of independent restarts.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the maximum number of iterations per restart.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance. Iteration stops when inertia improvement
    /// falls below this threshold.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the seed from which per-restart seeds are derived.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the number of independent restarts.
    #[must_use]
    pub fn n_init(&self) -> usize {
        self.n_init
    }

    /// Return the maximum number of iterations per restart.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the convergence tolerance.
    #[must_use]
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Cluster the rows of `matrix` using this configuration.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::TooFewSeries`] | `matrix.n_rows() < k` |
    /// | [`ClusterError::EmptyCluster`] | A cluster becomes empty and cannot be rescued |
    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<KMeansResult, ClusterError> {
        let n = matrix.n_rows();
        if n < self.k {
            return Err(ClusterError::TooFewSeries { n_series: n, k: self.k });
        }
        crate::kmeans::multi_restart(matrix, self)
    }
}

/// Configuration for the inertia sweep used to choose k.
///
/// Runs plain k-means for each k in `1..=min(max_k, n)` and records the best
/// inertia per k.
///
/// # Defaults
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `n_init`   | 10      |
/// | `max_iter` | 300     |
/// | `tol`      | 1e-4    |
/// | `seed`     | 42      |
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub(crate) max_k: usize,
    pub(crate) n_init: usize,
    pub(crate) max_iter: usize,
    pub(crate) tol: f64,
    pub(crate) seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_k: 10,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }
}

impl SweepConfig {
    /// Create a sweep over `1..=max_k`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidK`] | `max_k` is zero |
    pub fn new(max_k: usize) -> Result<Self, ClusterError> {
        if max_k == 0 {
            return Err(ClusterError::InvalidK { k: max_k });
        }
        Ok(Self { max_k, ..Self::default() })
    }

    /// Set the number of restarts per k value.
    #[must_use]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set the maximum number of iterations per restart.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the largest k tried.
    #[must_use]
    pub fn max_k(&self) -> usize {
        self.max_k
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run k-means for each k and return the inertia curve.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::TooFewSeries`] | `matrix` has no rows |
    /// | [`ClusterError::EmptyCluster`] | A cluster becomes empty and cannot be rescued |
    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<SweepResult, ClusterError> {
        if matrix.is_empty() {
            return Err(ClusterError::TooFewSeries { n_series: 0, k: 1 });
        }
        crate::kmeans::sweep(matrix, self)
    }
}
