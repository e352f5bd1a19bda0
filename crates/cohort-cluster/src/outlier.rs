//! Post-hoc outlier flagging and re-homing of density-clustering noise.

use tracing::{debug, info, instrument};

use cohort_series::{FeatureMatrix, coordinate_median, euclidean};

use crate::dbscan::DbscanResult;
use crate::error::ClusterError;
use crate::label::ClusterAssignment;

/// Flags series that lie farther than a fixed distance from their cluster's
/// reference point (centroid or median).
///
/// # Defaults
///
/// | Parameter   | Default |
/// |-------------|---------|
/// | `threshold` | 6.75    |
#[derive(Debug, Clone)]
pub struct OutlierDetector {
    threshold: f64,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self { threshold: 6.75 }
    }
}

impl OutlierDetector {
    /// Create a detector that flags distances strictly greater than `threshold`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidThreshold`] | `threshold` is negative or not finite |
    pub fn new(threshold: f64) -> Result<Self, ClusterError> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ClusterError::InvalidThreshold {
                name: "outlier threshold",
                value: threshold,
                expected: "finite and non-negative",
            });
        }
        Ok(Self { threshold })
    }

    /// Return the distance threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Recompute the outlier flag of every series from its distance to
    /// `references[cluster]`.
    ///
    /// Flags depend only on cluster magnitudes, so applying the detector to
    /// its own output changes nothing.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::LengthMismatch`] | `assignment` and `matrix` disagree on the series count, or a cluster has no reference |
    #[instrument(skip_all, fields(n = matrix.n_rows(), threshold = self.threshold))]
    pub fn flag(
        &self,
        matrix: &FeatureMatrix,
        assignment: &ClusterAssignment,
        references: &[Vec<f64>],
    ) -> Result<ClusterAssignment, ClusterError> {
        if assignment.len() != matrix.n_rows() {
            return Err(ClusterError::LengthMismatch {
                what: "assignment",
                expected: matrix.n_rows(),
                got: assignment.len(),
            });
        }
        if assignment.n_clusters() > references.len() {
            return Err(ClusterError::LengthMismatch {
                what: "reference points",
                expected: assignment.n_clusters(),
                got: references.len(),
            });
        }

        let flags: Vec<bool> = assignment
            .iter()
            .enumerate()
            .map(|(i, m)| euclidean(matrix.row(i), &references[m.cluster.index()]) > self.threshold)
            .collect();
        let flagged = assignment.with_outlier_flags(flags);
        info!(n_outliers = flagged.n_outliers(), "outliers flagged");
        Ok(flagged)
    }
}

/// Coordinate-wise median of each cluster's members (outliers included),
/// indexed by zero-based cluster index. A cluster without members gets an
/// empty vector.
#[must_use]
pub fn cluster_medians(matrix: &FeatureMatrix, assignment: &ClusterAssignment) -> Vec<Vec<f64>> {
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); assignment.n_clusters()];
    for (i, m) in assignment.iter().enumerate() {
        groups[m.cluster.index()].push(i);
    }
    groups
        .iter()
        .map(|g| coordinate_median(g.iter().map(|&i| matrix.row(i))).unwrap_or_default())
        .collect()
}

/// Give every noise row of a density clustering a home, returning the
/// complete assignment and the per-cluster medians.
///
/// Medians are taken over the clustered rows only. Each noise row joins the
/// cluster whose median is nearest, ties going to the lowest id. When no
/// cluster was found every row joins cluster 1, whose median is that of all
/// rows.
#[instrument(skip_all, fields(n = matrix.n_rows(), n_clusters = density.n_clusters))]
pub fn rehome_noise(matrix: &FeatureMatrix, density: &DbscanResult) -> (ClusterAssignment, Vec<Vec<f64>>) {
    if density.n_clusters == 0 {
        let median = coordinate_median(matrix.rows()).unwrap_or_default();
        info!("no dense cluster found; all series placed in cluster 1");
        return (ClusterAssignment::from_indices(&vec![0; matrix.n_rows()]), vec![median]);
    }

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); density.n_clusters];
    for (i, label) in density.labels.iter().enumerate() {
        if let Some(c) = label {
            groups[*c].push(i);
        }
    }
    let medians: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| coordinate_median(g.iter().map(|&i| matrix.row(i))).unwrap_or_default())
        .collect();

    let mut n_rehomed = 0usize;
    let indices: Vec<usize> = density
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            label.unwrap_or_else(|| {
                n_rehomed += 1;
                let row = matrix.row(i);
                let mut best = (0usize, f64::INFINITY);
                for (c, median) in medians.iter().enumerate() {
                    let d = euclidean(row, median);
                    if d < best.1 {
                        best = (c, d);
                    }
                }
                best.0
            })
        })
        .collect();

    debug!(n_rehomed, "noise re-homed");
    (ClusterAssignment::from_indices(&indices), medians)
}
