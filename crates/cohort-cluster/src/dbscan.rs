//! Density-based clustering (DBSCAN).

use linfa::traits::Transformer;
use linfa_clustering::Dbscan;
use ndarray::Array2;
use tracing::{info, instrument};

use cohort_series::{FeatureMatrix, LabelEncoding, SimilarityMode};

use crate::error::ClusterError;

/// Neighbourhood radius used for zero-aligned (correlation) input.
pub const CORRELATION_EPS: f64 = 2.0;
/// Neighbourhood radius used for raw (proximity) input.
pub const PROXIMITY_EPS: f64 = 3.0;
/// Added to the radius when one-hot label columns widen the space.
pub const ONE_HOT_EPS_BONUS: f64 = 1.0;

/// Default radius for a similarity mode and label encoding.
#[must_use]
pub fn default_eps(similarity: SimilarityMode, encoding: LabelEncoding) -> f64 {
    let base = match similarity {
        SimilarityMode::Correlation => CORRELATION_EPS,
        SimilarityMode::Proximity => PROXIMITY_EPS,
    };
    match encoding {
        LabelEncoding::None => base,
        LabelEncoding::OneHot => base + ONE_HOT_EPS_BONUS,
    }
}

/// Configuration for DBSCAN.
///
/// # Defaults
///
/// | Parameter    | Default |
/// |--------------|---------|
/// | `min_points` | 3       |
#[derive(Debug, Clone)]
pub struct DbscanConfig {
    eps: f64,
    min_points: usize,
}

impl DbscanConfig {
    /// Create a configuration with neighbourhood radius `eps`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidThreshold`] | `eps` is not finite and positive |
    pub fn new(eps: f64) -> Result<Self, ClusterError> {
        if !(eps.is_finite() && eps > 0.0) {
            return Err(ClusterError::InvalidThreshold {
                name: "eps",
                value: eps,
                expected: "finite and positive",
            });
        }
        Ok(Self { eps, min_points: 3 })
    }

    /// Set how many rows (the point itself included) make a neighbourhood
    /// dense. Values below two are raised to two.
    #[must_use]
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(2);
        self
    }

    /// Return the neighbourhood radius.
    #[must_use]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Return the density threshold.
    #[must_use]
    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Cluster the rows of `matrix`.
    ///
    /// Rows are visited in index order, so cluster indices follow the
    /// position of each cluster's first core row. A border row shared by two
    /// clusters stays with the first one to reach it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::Density`] | The radius or density threshold is rejected |
    #[instrument(skip(matrix), fields(n = matrix.n_rows(), eps = self.eps, min_points = self.min_points))]
    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<DbscanResult, ClusterError> {
        let n = matrix.n_rows();
        let d = matrix.n_cols();
        // Without coordinates every row sits on top of every other.
        if n == 0 || d == 0 {
            let label = (n >= self.min_points).then_some(0);
            return Ok(DbscanResult {
                labels: vec![label; n],
                n_clusters: usize::from(label.is_some()),
            });
        }

        let records = Array2::from_shape_fn((n, d), |(r, c)| matrix.get(r, c));
        let memberships = Dbscan::params(self.min_points)
            .tolerance(self.eps)
            .transform(&records)?;

        let labels: Vec<Option<usize>> = memberships.iter().copied().collect();
        let n_clusters = labels.iter().flatten().max().map_or(0, |&c| c + 1);
        let n_noise = labels.iter().filter(|l| l.is_none()).count();
        info!(n_clusters, n_noise, "density clustering complete");
        Ok(DbscanResult { labels, n_clusters })
    }
}

/// Result of a DBSCAN fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbscanResult {
    /// Zero-based cluster index per row, or `None` for noise.
    pub labels: Vec<Option<usize>>,
    /// Number of clusters found.
    pub n_clusters: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs_and_a_straggler() -> FeatureMatrix {
        FeatureMatrix::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.5, 0.0],
            vec![0.0, 0.5],
            vec![20.0, 20.0],
            vec![20.5, 20.0],
            vec![20.0, 20.5],
            vec![50.0, 50.0],
        ])
        .unwrap()
    }

    #[test]
    fn finds_two_clusters_and_noise() {
        let result = DbscanConfig::new(1.0).unwrap().fit(&two_blobs_and_a_straggler()).unwrap();
        assert_eq!(result.n_clusters, 2);
        assert_eq!(
            result.labels,
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1), None]
        );
    }

    #[test]
    fn border_rows_join_their_core() {
        // Row 3 is within eps of row 2 only; it is not dense itself.
        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![0.5], vec![1.0], vec![1.9]]).unwrap();
        let result = DbscanConfig::new(1.0).unwrap().fit(&m).unwrap();
        assert_eq!(result.labels, vec![Some(0); 4]);
    }

    #[test]
    fn sparse_input_is_all_noise() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![10.0], vec![20.0]]).unwrap();
        let result = DbscanConfig::new(1.0).unwrap().fit(&m).unwrap();
        assert_eq!(result.n_clusters, 0);
        assert!(result.labels.iter().all(Option::is_none));
    }

    #[test]
    fn min_points_floor_is_two() {
        let cfg = DbscanConfig::new(1.0).unwrap().with_min_points(0);
        assert_eq!(cfg.min_points(), 2);
        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![0.5], vec![9.0]]).unwrap();
        let result = cfg.fit(&m).unwrap();
        assert_eq!(result.labels, vec![Some(0), Some(0), None]);
    }

    #[test]
    fn default_eps_by_mode() {
        assert_eq!(default_eps(SimilarityMode::Correlation, LabelEncoding::None), 2.0);
        assert_eq!(default_eps(SimilarityMode::Proximity, LabelEncoding::None), 3.0);
        assert_eq!(default_eps(SimilarityMode::Proximity, LabelEncoding::OneHot), 4.0);
    }

    #[test]
    fn rejects_bad_eps() {
        assert!(DbscanConfig::new(0.0).is_err());
        assert!(DbscanConfig::new(f64::NAN).is_err());
    }
}
