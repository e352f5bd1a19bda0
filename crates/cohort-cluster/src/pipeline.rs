//! End-to-end clustering requests: pick an engine, run it on a preprocessed
//! matrix and apply the outlier policy.

use std::fmt;
use std::str::FromStr;

use tracing::{info, instrument};

use cohort_series::{AlgorithmHint, DesignMatrix, FeatureMatrix, LabelDictionary, LabelEncoding, SimilarityMode};

use crate::config::KMeansConfig;
use crate::constrained::{ConstrainedKMeansConfig, target_cluster_count};
use crate::constraint::ConstraintConfig;
use crate::dbscan::{DbscanConfig, default_eps};
use crate::error::ClusterError;
use crate::label::ClusterAssignment;
use crate::outlier::{OutlierDetector, rehome_noise};

/// Clustering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Plain multi-init k-means.
    KMeans,
    /// Constrained k-means with label-derived must-link/cannot-link pairs.
    KMeansConstrained,
    /// Density-based clustering with noise re-homing.
    Dbscan,
}

impl Algorithm {
    /// Family of preprocessing this engine expects.
    #[must_use]
    pub fn hint(self) -> AlgorithmHint {
        match self {
            Self::KMeans | Self::KMeansConstrained => AlgorithmHint::Partition,
            Self::Dbscan => AlgorithmHint::Density,
        }
    }
}

impl FromStr for Algorithm {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "k-means" | "kmeans" => Ok(Self::KMeans),
            "k-means-constrained" | "kmeans-constrained" => Ok(Self::KMeansConstrained),
            "dbscan" => Ok(Self::Dbscan),
            _ => Err(ClusterError::UnknownMode {
                kind: "algorithm",
                value: s.to_string(),
                expected: "k-means, k-means-constrained, dbscan",
            }),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KMeans => "k-means",
            Self::KMeansConstrained => "k-means-constrained",
            Self::Dbscan => "dbscan",
        })
    }
}

/// Whether distant series are flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutlierMode {
    /// Every series is an ordinary member.
    #[default]
    None,
    /// Series beyond the detector threshold get a negated cluster id.
    Flag,
}

impl FromStr for OutlierMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "flag" => Ok(Self::Flag),
            _ => Err(ClusterError::UnknownMode {
                kind: "outlier mode",
                value: s.to_string(),
                expected: "none, flag",
            }),
        }
    }
}

impl fmt::Display for OutlierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Flag => "flag",
        })
    }
}

/// Shared settings for the three clustering requests.
///
/// # Defaults
///
/// | Parameter     | Default                          |
/// |---------------|----------------------------------|
/// | `seed`        | 42                               |
/// | `detector`    | threshold 6.75                   |
/// | `constraints` | common fraction 0.03             |
/// | `eps`         | by mode, see [`default_eps`]     |
#[derive(Debug, Clone)]
pub struct Pipeline {
    seed: u64,
    detector: OutlierDetector,
    constraints: ConstraintConfig,
    eps: Option<f64>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: 42,
            detector: OutlierDetector::default(),
            constraints: ConstraintConfig::default(),
            eps: None,
        }
    }

    /// Seed every random draw (constraint sampling and seeding).
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.constraints = self.constraints.with_seed(seed);
        self
    }

    /// Replace the outlier detector.
    #[must_use]
    pub fn with_detector(mut self, detector: OutlierDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the constraint configuration. Its seed is overridden by
    /// [`with_seed`](Self::with_seed) when that is called afterwards.
    #[must_use]
    pub fn with_constraints(mut self, constraints: ConstraintConfig) -> Self {
        self.constraints = constraints;
        self
    }

    /// Override the density radius; `None` uses the per-mode default.
    #[must_use]
    pub fn with_eps(mut self, eps: Option<f64>) -> Self {
        self.eps = eps;
        self
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the outlier detector.
    #[must_use]
    pub fn detector(&self) -> &OutlierDetector {
        &self.detector
    }

    /// Constrained k-means with `floor(n / 10) + 2` clusters and constraints
    /// derived from `design`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::LengthMismatch`] | `design` does not match `matrix` or `dictionary` |
    /// | [`ClusterError::InvalidK`] | `matrix` has no rows |
    /// | [`ClusterError::NoValidClustering`] | Every restart was invalid |
    #[instrument(skip_all, fields(n = matrix.n_rows(), outliers = %outliers))]
    pub fn constrained(
        &self,
        matrix: &FeatureMatrix,
        dictionary: &LabelDictionary,
        design: &DesignMatrix,
        outliers: OutlierMode,
    ) -> Result<ClusterAssignment, ClusterError> {
        if design.n_rows() != matrix.n_rows() {
            return Err(ClusterError::LengthMismatch {
                what: "design matrix",
                expected: matrix.n_rows(),
                got: design.n_rows(),
            });
        }
        if design.n_cols() != dictionary.len() {
            return Err(ClusterError::LengthMismatch {
                what: "design matrix columns",
                expected: dictionary.len(),
                got: design.n_cols(),
            });
        }

        let constraints = self.constraints.build(design);
        let result = ConstrainedKMeansConfig::for_series_count(matrix.n_rows())?
            .with_seed(self.seed)
            .fit(matrix, &constraints)?;
        self.finish(matrix, result.assignment, &result.centroids, outliers)
    }

    /// Plain k-means with `floor(n / 10) + 2` clusters.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidK`] | `matrix` has no rows |
    /// | [`ClusterError::EmptyCluster`] | A cluster becomes empty and cannot be rescued |
    #[instrument(skip_all, fields(n = matrix.n_rows(), outliers = %outliers))]
    pub fn plain(&self, matrix: &FeatureMatrix, outliers: OutlierMode) -> Result<ClusterAssignment, ClusterError> {
        let result = KMeansConfig::new(target_cluster_count(matrix.n_rows()))?
            .with_seed(self.seed)
            .fit(matrix)?;
        self.finish(matrix, result.assignment, &result.centroids, outliers)
    }

    /// DBSCAN with noise re-homed to the nearest cluster median.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidThreshold`] | The configured radius is not positive |
    /// | [`ClusterError::Density`] | The density parameters are rejected |
    #[instrument(skip_all, fields(
        n = matrix.n_rows(),
        similarity = %similarity,
        encoding = %encoding,
        outliers = %outliers
    ))]
    pub fn density(
        &self,
        matrix: &FeatureMatrix,
        similarity: SimilarityMode,
        encoding: LabelEncoding,
        outliers: OutlierMode,
    ) -> Result<ClusterAssignment, ClusterError> {
        let eps = self.eps.unwrap_or_else(|| default_eps(similarity, encoding));
        let density = DbscanConfig::new(eps)?.fit(matrix)?;
        let (assignment, medians) = rehome_noise(matrix, &density);
        self.finish(matrix, assignment, &medians, outliers)
    }

    fn finish(
        &self,
        matrix: &FeatureMatrix,
        assignment: ClusterAssignment,
        references: &[Vec<f64>],
        outliers: OutlierMode,
    ) -> Result<ClusterAssignment, ClusterError> {
        let assignment = match outliers {
            OutlierMode::None => assignment,
            OutlierMode::Flag => self.detector.flag(matrix, &assignment, references)?,
        };
        info!(
            n_clusters = assignment.n_clusters(),
            n_outliers = assignment.n_outliers(),
            "clustering request complete"
        );
        Ok(assignment)
    }
}

/// Constrained k-means with default settings. See [`Pipeline::constrained`].
///
/// # Errors
///
/// As [`Pipeline::constrained`].
pub fn cluster_constrained(
    matrix: &FeatureMatrix,
    dictionary: &LabelDictionary,
    design: &DesignMatrix,
    outliers: OutlierMode,
) -> Result<ClusterAssignment, ClusterError> {
    Pipeline::new().constrained(matrix, dictionary, design, outliers)
}

/// Plain k-means with default settings. See [`Pipeline::plain`].
///
/// # Errors
///
/// As [`Pipeline::plain`].
pub fn cluster_plain(matrix: &FeatureMatrix, outliers: OutlierMode) -> Result<ClusterAssignment, ClusterError> {
    Pipeline::new().plain(matrix, outliers)
}

/// DBSCAN with default settings. See [`Pipeline::density`].
///
/// # Errors
///
/// As [`Pipeline::density`].
pub fn cluster_density(
    matrix: &FeatureMatrix,
    similarity: SimilarityMode,
    encoding: LabelEncoding,
    outliers: OutlierMode,
) -> Result<ClusterAssignment, ClusterError> {
    Pipeline::new().density(matrix, similarity, encoding, outliers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_algorithm() {
        assert_eq!("k-means".parse::<Algorithm>().unwrap(), Algorithm::KMeans);
        assert_eq!("K-Means-Constrained".parse::<Algorithm>().unwrap(), Algorithm::KMeansConstrained);
        assert_eq!("dbscan".parse::<Algorithm>().unwrap(), Algorithm::Dbscan);
        assert!(matches!(
            "spectral".parse::<Algorithm>(),
            Err(ClusterError::UnknownMode { kind: "algorithm", .. })
        ));
        assert_eq!(Algorithm::Dbscan.hint(), AlgorithmHint::Density);
    }

    #[test]
    fn parse_outlier_mode() {
        assert_eq!("flag".parse::<OutlierMode>().unwrap(), OutlierMode::Flag);
        assert_eq!(OutlierMode::None.to_string(), "none");
        assert!("drop".parse::<OutlierMode>().is_err());
    }

    #[test]
    fn density_flags_far_noise() {
        let m = FeatureMatrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.5, 0.0],
            vec![0.0, 0.5],
            vec![30.0, 30.0],
        ])
        .unwrap();
        let a = cluster_density(&m, SimilarityMode::Proximity, LabelEncoding::None, OutlierMode::Flag).unwrap();
        assert_eq!(a.to_signed(), vec![1, 1, 1, -1]);
        let a = cluster_density(&m, SimilarityMode::Proximity, LabelEncoding::None, OutlierMode::None).unwrap();
        assert_eq!(a.to_signed(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn constrained_checks_design_shape() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![1.0]]).unwrap();
        let dict = LabelDictionary::from_values(["a"]);
        let design = DesignMatrix::zeros(3, 1);
        assert!(matches!(
            cluster_constrained(&m, &dict, &design, OutlierMode::None),
            Err(ClusterError::LengthMismatch { what: "design matrix", .. })
        ));
    }
}
