//! Brute-force neighbour queries over matrix rows.

use rayon::prelude::*;

use cohort_series::{FeatureMatrix, euclidean};

use crate::error::ClusterError;

/// Distance from every row to its `k`-th nearest other row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::InvalidK`] | `k` is zero |
/// | [`ClusterError::TooFewSeries`] | The matrix has `k` rows or fewer |
pub fn nearest_neighbor_distances(matrix: &FeatureMatrix, k: usize) -> Result<Vec<f64>, ClusterError> {
    if k == 0 {
        return Err(ClusterError::InvalidK { k });
    }
    let n = matrix.n_rows();
    if n <= k {
        return Err(ClusterError::TooFewSeries { n_series: n, k: k + 1 });
    }
    Ok((0..n)
        .into_par_iter()
        .map(|i| {
            let row = matrix.row(i);
            let mut dists: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .map(|j| euclidean(row, matrix.row(j)))
                .collect();
            dists.select_nth_unstable_by(k - 1, f64::total_cmp);
            dists[k - 1]
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> FeatureMatrix {
        FeatureMatrix::from_rows(vec![vec![0.0], vec![1.0], vec![3.0], vec![7.0]]).unwrap()
    }

    #[test]
    fn first_neighbour_distances() {
        assert_eq!(nearest_neighbor_distances(&line(), 1).unwrap(), vec![1.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn second_neighbour_distances() {
        assert_eq!(nearest_neighbor_distances(&line(), 2).unwrap(), vec![3.0, 2.0, 3.0, 6.0]);
    }

    #[test]
    fn rejects_degenerate_k() {
        assert!(matches!(nearest_neighbor_distances(&line(), 0), Err(ClusterError::InvalidK { k: 0 })));
        assert!(matches!(
            nearest_neighbor_distances(&line(), 4),
            Err(ClusterError::TooFewSeries { n_series: 4, k: 5 })
        ));
    }
}
