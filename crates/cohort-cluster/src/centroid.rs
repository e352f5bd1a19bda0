//! Shared centroid arithmetic for the partition engines (private module).

use rayon::prelude::*;

use cohort_series::{FeatureMatrix, euclidean};

/// Euclidean distance from every row to every centroid, one inner vector per
/// row. Rows are processed in parallel.
pub(crate) fn distances_to(matrix: &FeatureMatrix, centroids: &[Vec<f64>]) -> Vec<Vec<f64>> {
    (0..matrix.n_rows())
        .into_par_iter()
        .map(|i| {
            let row = matrix.row(i);
            centroids.iter().map(|c| euclidean(row, c)).collect()
        })
        .collect()
}

/// Index and distance of the closest entry in `distances`. Ties go to the
/// lower index.
pub(crate) fn nearest(distances: &[f64]) -> (usize, f64) {
    let mut best = (0usize, f64::INFINITY);
    for (c, &d) in distances.iter().enumerate() {
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

/// Member indices of each of the `k` clusters.
pub(crate) fn group_members(labels: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); k];
    for (i, &c) in labels.iter().enumerate() {
        groups[c].push(i);
    }
    groups
}

/// Coordinate-wise mean of the rows listed in `members`.
pub(crate) fn mean_of(matrix: &FeatureMatrix, members: &[usize]) -> Vec<f64> {
    let mut sum = vec![0.0; matrix.n_cols()];
    for &i in members {
        for (s, v) in sum.iter_mut().zip(matrix.row(i)) {
            *s += v;
        }
    }
    let count = members.len().max(1) as f64;
    sum.into_iter().map(|s| s / count).collect()
}
