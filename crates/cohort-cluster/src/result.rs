//! Result types for plain k-means and the inertia sweep.

use crate::inertia::Inertia;
use crate::label::ClusterAssignment;

/// Result of a plain k-means fit.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster of every series; no outliers are flagged yet.
    pub assignment: ClusterAssignment,
    /// Centroid of each cluster, indexed by zero-based cluster index.
    pub centroids: Vec<Vec<f64>>,
    /// Total inertia (sum of squared distances to assigned centroids).
    pub inertia: Inertia,
    /// Whether the best run converged within the tolerance.
    pub converged: bool,
    /// Number of iterations performed in the best run.
    pub iterations: usize,
    /// Number of restarts actually executed.
    pub n_init_used: usize,
}

impl KMeansResult {
    /// Return the number of series assigned to each cluster.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = self.assignment.cluster_sizes();
        sizes.resize(self.centroids.len(), 0);
        sizes
    }
}

/// Inertia result for a single k value.
#[derive(Debug, Clone)]
pub struct KResult {
    /// The number of clusters.
    pub k: usize,
    /// The best inertia achieved for this k.
    pub inertia: Inertia,
}

/// Inertia curve over ascending k.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Results for each k value tested, ordered by ascending k.
    pub results: Vec<KResult>,
}

impl SweepResult {
    /// Raw inertia values in ascending k order.
    #[must_use]
    pub fn inertias(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.inertia.value()).collect()
    }

    /// Return the elbow of the curve: the interior k with the largest
    /// discrete second derivative `inertia[i-1] - 2 * inertia[i] + inertia[i+1]`.
    ///
    /// Returns `None` for an empty curve and the first k when there are fewer
    /// than three points.
    #[must_use]
    pub fn elbow(&self) -> Option<usize> {
        match self.results.len() {
            0 => None,
            1 | 2 => Some(self.results[0].k),
            n => {
                let inertias = self.inertias();
                let d2 = |i: usize| inertias[i - 1] - 2.0 * inertias[i] + inertias[i + 1];
                (1..n - 1)
                    .max_by(|&i, &j| d2(i).total_cmp(&d2(j)))
                    .map(|i| self.results[i].k)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(values: &[f64]) -> SweepResult {
        SweepResult {
            results: values
                .iter()
                .enumerate()
                .map(|(i, &v)| KResult { k: i + 1, inertia: Inertia::new(v) })
                .collect(),
        }
    }

    #[test]
    fn elbow_at_sharpest_bend() {
        // Drop 100 -> 20 then flat: bend at k = 2.
        assert_eq!(sweep(&[100.0, 20.0, 15.0, 12.0]).elbow(), Some(2));
    }

    #[test]
    fn elbow_short_curves() {
        assert_eq!(sweep(&[]).elbow(), None);
        assert_eq!(sweep(&[3.0, 1.0]).elbow(), Some(1));
    }

    #[test]
    fn sizes_pad_to_centroid_count() {
        let result = KMeansResult {
            assignment: ClusterAssignment::from_indices(&[0, 0, 1]),
            centroids: vec![vec![0.0]; 3],
            inertia: Inertia::new(0.0),
            converged: true,
            iterations: 1,
            n_init_used: 1,
        };
        assert_eq!(result.cluster_sizes(), vec![2, 1, 0]);
    }
}
