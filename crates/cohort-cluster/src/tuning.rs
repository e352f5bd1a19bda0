//! Diagnostics for choosing k and eps.

use tracing::{info, instrument};

use cohort_series::FeatureMatrix;

use crate::config::SweepConfig;
use crate::error::ClusterError;
use crate::neighbors::nearest_neighbor_distances;

/// Best plain k-means inertia for each k in `1..=min(10, n)`, seeded with `seed`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::TooFewSeries`] | `matrix` has no rows |
/// | [`ClusterError::EmptyCluster`] | A cluster becomes empty and cannot be rescued |
pub fn tune_k(matrix: &FeatureMatrix, seed: u64) -> Result<Vec<f64>, ClusterError> {
    Ok(SweepConfig::default().with_seed(seed).fit(matrix)?.inertias())
}

/// Distance from every row to its nearest other row, sorted ascending.
///
/// The knee of this curve is a reasonable DBSCAN radius.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::TooFewSeries`] | `matrix` has fewer than two rows |
#[instrument(skip_all, fields(n = matrix.n_rows()))]
pub fn tune_eps(matrix: &FeatureMatrix) -> Result<Vec<f64>, ClusterError> {
    let mut distances = nearest_neighbor_distances(matrix, 1)?;
    distances.sort_by(f64::total_cmp);
    info!(
        min = ?distances.first(),
        max = ?distances.last(),
        "nearest-neighbour curve computed"
    );
    Ok(distances)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eps_curve_is_sorted() {
        let m = FeatureMatrix::from_rows(vec![vec![7.0], vec![0.0], vec![3.0], vec![1.0]]).unwrap();
        assert_eq!(tune_eps(&m).unwrap(), vec![1.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn eps_needs_two_rows() {
        let m = FeatureMatrix::from_rows(vec![vec![7.0]]).unwrap();
        assert!(matches!(tune_eps(&m), Err(ClusterError::TooFewSeries { .. })));
    }

    #[test]
    fn k_curve_length_is_capped() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0], vec![1.0], vec![5.0], vec![6.0]]).unwrap();
        let curve = tune_k(&m, 42).unwrap();
        assert_eq!(curve.len(), 4);
        assert!(curve[0] > curve[1]);
        assert!(curve[3].abs() < 1e-12);
    }
}
