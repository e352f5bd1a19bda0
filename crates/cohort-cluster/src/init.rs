//! K-means++ seeding (private module).
//!
//! Each centroid after the first is drawn with probability proportional to
//! the squared Euclidean distance from a candidate row to its nearest
//! already-chosen centroid.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use cohort_series::{FeatureMatrix, squared_euclidean};

/// How the first centroid is picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FirstCentroid {
    /// The row at position `floor(fraction * n)`.
    Percentile(f64),
    /// A uniformly random row.
    Random,
}

/// Select `k` distinct row indices of `matrix` as initial centroids.
///
/// The per-row distance computation is parallelized with rayon. The weighted
/// draw is sequential because it needs the mutable `rng`. When every
/// remaining row coincides with a chosen centroid the lowest unchosen index
/// is taken.
///
/// # Panics
///
/// Panics in debug mode if `k == 0` or `k > matrix.n_rows()`.
#[must_use]
pub(crate) fn kmeans_plus_plus(
    matrix: &FeatureMatrix,
    k: usize,
    first: FirstCentroid,
    rng: &mut ChaCha8Rng,
) -> Vec<usize> {
    let n = matrix.n_rows();
    debug_assert!(k > 0, "k must be at least 1");
    debug_assert!(k <= n, "k must not exceed the number of rows");

    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    let first_index = match first {
        FirstCentroid::Percentile(fraction) => ((fraction * n as f64).floor() as usize).min(n - 1),
        FirstCentroid::Random => rng.gen_range(0..n),
    };
    chosen.push(first_index);

    // Squared distance from each row to its nearest chosen centroid, updated
    // incrementally as centroids are added.
    let mut nearest_sq: Vec<f64> = vec![f64::INFINITY; n];

    while chosen.len() < k {
        let newest = matrix.row(chosen[chosen.len() - 1]);
        nearest_sq
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, d)| *d = d.min(squared_euclidean(matrix.row(i), newest)));

        let weights: Vec<f64> = nearest_sq
            .iter()
            .enumerate()
            .map(|(i, &d)| if chosen.contains(&i) { 0.0 } else { d })
            .collect();
        let total_weight: f64 = weights.iter().sum();

        let selected = if total_weight > 0.0 {
            let threshold: f64 = rng.gen_range(0.0..total_weight);
            let mut cumsum = 0.0;
            let mut pick = None;
            for (i, &w) in weights.iter().enumerate() {
                cumsum += w;
                if w > 0.0 && cumsum > threshold {
                    pick = Some(i);
                    break;
                }
            }
            // Rounding can leave the walk short of the threshold.
            pick.or_else(|| weights.iter().rposition(|&w| w > 0.0))
        } else {
            None
        };

        let selected = selected.or_else(|| (0..n).find(|i| !chosen.contains(i)));
        match selected {
            Some(i) => chosen.push(i),
            None => break,
        }
    }

    chosen
}
