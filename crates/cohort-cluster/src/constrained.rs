//! Constrained k-means: seeded restarts of a greedy, constraint-respecting
//! Lloyd iteration.
//!
//! Each restart seeds with k-means++ (first centroid at a fixed percentile
//! position), then alternates a greedy assignment that never breaks a
//! must-link or cannot-link constraint with a mean update. A restart is
//! invalid when a series has no admissible cluster, when a cluster empties or
//! when the iteration cap is hit. The best valid restart wins.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use cohort_series::FeatureMatrix;

use crate::centroid::{distances_to, group_members, mean_of};
use crate::constraint::ConstraintSet;
use crate::error::ClusterError;
use crate::init::{FirstCentroid, kmeans_plus_plus};
use crate::label::ClusterAssignment;

/// One cluster per this many series, on top of [`MIN_CLUSTERS`].
pub const SERIES_PER_CLUSTER: usize = 10;
/// Clusters added regardless of collection size.
pub const MIN_CLUSTERS: usize = 2;

/// Default cluster count for `n` series: `floor(n / 10) + 2`, clamped to `n`.
#[must_use]
pub fn target_cluster_count(n: usize) -> usize {
    (n / SERIES_PER_CLUSTER + MIN_CLUSTERS).min(n)
}

/// Configuration for constrained k-means.
///
/// # Defaults
///
/// | Parameter             | Default |
/// |-----------------------|---------|
/// | `n_runs`              | 10      |
/// | `max_iter`            | 300     |
/// | `seed`                | 42      |
/// | `first_percentile`    | 0.2     |
#[derive(Debug, Clone)]
pub struct ConstrainedKMeansConfig {
    k: usize,
    n_runs: usize,
    max_iter: usize,
    seed: u64,
    first_percentile: f64,
}

impl ConstrainedKMeansConfig {
    /// Create a configuration for `k` clusters.
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
            n_runs: 10,
            max_iter: 300,
            seed: 42,
            first_percentile: 0.2,
        })
    }

    /// Create a configuration with k from [`target_cluster_count`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidK`] | `n_series` is zero |
    pub fn for_series_count(n_series: usize) -> Result<Self, ClusterError> {
        Self::new(target_cluster_count(n_series))
    }

    /// Set the number of restarts.
    #[must_use]
    pub fn with_n_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    /// Set the iteration cap per restart. Hitting it invalidates the restart.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the base seed. Restart `r` seeds its generator with `seed + r`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the input position, as a fraction of `n`, of the first centroid.
    ///
    /// A position past the end is clamped to the last row.
    #[must_use]
    pub fn with_first_percentile(mut self, first_percentile: f64) -> Self {
        self.first_percentile = first_percentile;
        self
    }

    /// Return the number of clusters.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Return the number of restarts.
    #[must_use]
    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    /// Return the iteration cap per restart.
    #[must_use]
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Return the base seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the first-centroid percentile.
    #[must_use]
    pub fn first_percentile(&self) -> f64 {
        self.first_percentile
    }

    /// Cluster the rows of `matrix` under `constraints`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::TooFewSeries`] | `matrix.n_rows() < k` |
    /// | [`ClusterError::NoValidClustering`] | Every restart was invalid |
    pub fn fit(
        &self,
        matrix: &FeatureMatrix,
        constraints: &ConstraintSet,
    ) -> Result<ConstrainedResult, ClusterError> {
        let n = matrix.n_rows();
        if n < self.k {
            return Err(ClusterError::TooFewSeries { n_series: n, k: self.k });
        }
        multi_run(matrix, constraints, self)
    }
}

/// Result of a constrained k-means fit.
#[derive(Debug, Clone)]
pub struct ConstrainedResult {
    /// Cluster of every series; no outliers are flagged yet.
    pub assignment: ClusterAssignment,
    /// Mean of each cluster's members, indexed by zero-based cluster index.
    pub centroids: Vec<Vec<f64>>,
    /// Sum of (unsquared) distances from each series to its centroid.
    pub total_distance: f64,
    /// Index of the winning restart.
    pub best_run: usize,
    /// Number of restarts that converged.
    pub n_valid: usize,
    /// Iterations used by the winning restart.
    pub iterations: usize,
}

// ── single restart ────────────────────────────────────────────────────────────

/// Why a restart was discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Invalid {
    NoAdmissibleCluster { series: usize },
    EmptyCluster { cluster: usize },
    IterationCap,
}

struct Converged {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    total_distance: f64,
    iterations: usize,
}

/// Greedily place every series, in index order, in its nearest cluster that
/// breaks no constraint against series already placed in this pass.
fn constrained_assign(
    distances: &[Vec<f64>],
    constraints: &ConstraintSet,
) -> Result<Vec<usize>, Invalid> {
    let mut placed: Vec<Option<usize>> = vec![None; distances.len()];
    for (i, row) in distances.iter().enumerate() {
        let mut candidates: Vec<usize> = (0..row.len()).collect();
        // Stable sort keeps lower clusters first on ties.
        candidates.sort_by(|&a, &b| row[a].total_cmp(&row[b]));
        let cluster = candidates
            .into_iter()
            .find(|&c| !constraints.violates(i, c, &placed))
            .ok_or(Invalid::NoAdmissibleCluster { series: i })?;
        placed[i] = Some(cluster);
    }
    Ok(placed.into_iter().flatten().collect())
}

#[instrument(skip(matrix, constraints, config), fields(k = config.k, run))]
fn run_once(
    matrix: &FeatureMatrix,
    constraints: &ConstraintSet,
    config: &ConstrainedKMeansConfig,
    run: usize,
) -> Result<Converged, Invalid> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(run as u64));
    let init = kmeans_plus_plus(
        matrix,
        config.k,
        FirstCentroid::Percentile(config.first_percentile),
        &mut rng,
    );
    let mut centroids: Vec<Vec<f64>> = init.iter().map(|&i| matrix.row(i).to_vec()).collect();

    for iteration in 0..config.max_iter {
        let distances = distances_to(matrix, &centroids);
        let labels = constrained_assign(&distances, constraints)?;

        let groups = group_members(&labels, config.k);
        if let Some(cluster) = groups.iter().position(Vec::is_empty) {
            return Err(Invalid::EmptyCluster { cluster });
        }
        let updated: Vec<Vec<f64>> = groups.iter().map(|g| mean_of(matrix, g)).collect();

        if updated == centroids {
            let total_distance = labels
                .iter()
                .zip(&distances)
                .map(|(&c, row)| row[c])
                .sum();
            return Ok(Converged {
                labels,
                centroids,
                total_distance,
                iterations: iteration + 1,
            });
        }
        centroids = updated;
        debug!(iteration, "centroids moved");
    }
    Err(Invalid::IterationCap)
}

// ── multi_run ─────────────────────────────────────────────────────────────────

/// Run every restart in parallel and keep the lowest total distance, ties
/// going to the lowest restart index.
#[instrument(skip(matrix, constraints, config), fields(
    n = matrix.n_rows(),
    k = config.k,
    n_runs = config.n_runs,
    must_link = constraints.n_must_link(),
    cannot_link = constraints.n_cannot_link()
))]
fn multi_run(
    matrix: &FeatureMatrix,
    constraints: &ConstraintSet,
    config: &ConstrainedKMeansConfig,
) -> Result<ConstrainedResult, ClusterError> {
    let outcomes: Vec<Result<Converged, Invalid>> = (0..config.n_runs)
        .into_par_iter()
        .map(|run| run_once(matrix, constraints, config, run))
        .collect();

    let mut best: Option<(usize, Converged)> = None;
    let mut n_valid = 0usize;
    for (run, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(converged) => {
                n_valid += 1;
                debug!(
                    run,
                    total_distance = converged.total_distance,
                    iterations = converged.iterations,
                    "restart converged"
                );
                let better = best
                    .as_ref()
                    .is_none_or(|(_, b)| converged.total_distance < b.total_distance);
                if better {
                    best = Some((run, converged));
                }
            }
            Err(reason) => debug!(run, ?reason, "restart invalid"),
        }
    }

    let Some((best_run, best)) = best else {
        warn!(k = config.k, runs = config.n_runs, "no restart produced a valid clustering");
        return Err(ClusterError::NoValidClustering { k: config.k, runs: config.n_runs });
    };

    info!(
        k = config.k,
        n_valid,
        best_run,
        total_distance = best.total_distance,
        "constrained multi-restart complete"
    );

    Ok(ConstrainedResult {
        assignment: ClusterAssignment::from_indices(&best.labels),
        centroids: best.centroids,
        total_distance: best.total_distance,
        best_run,
        n_valid,
        iterations: best.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archetype() -> FeatureMatrix {
        FeatureMatrix::from_rows(vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.1, 0.0, 0.0, 0.0],
            vec![0.0, 0.1, 0.0, 0.0],
            vec![5.0, 5.0, 5.0, 5.0],
            vec![5.1, 5.0, 5.0, 5.0],
            vec![5.0, 5.1, 5.0, 5.0],
            vec![10.0, 10.0, 10.0, 10.0],
            vec![10.1, 10.0, 10.0, 10.0],
            vec![10.0, 10.1, 10.0, 10.0],
        ])
        .unwrap()
    }

    #[test]
    fn target_count_formula() {
        assert_eq!(target_cluster_count(1), 1);
        assert_eq!(target_cluster_count(4), 2);
        assert_eq!(target_cluster_count(9), 2);
        assert_eq!(target_cluster_count(10), 3);
        assert_eq!(target_cluster_count(55), 7);
    }

    #[test]
    fn greedy_assignment_skips_violating_cluster() {
        let distances = vec![vec![0.0, 5.0], vec![0.1, 4.0]];
        let mut c = ConstraintSet::new();
        c.add_cannot_link(0, 1);
        assert_eq!(constrained_assign(&distances, &c), Ok(vec![0, 1]));
    }

    #[test]
    fn greedy_assignment_follows_must_link() {
        // Series 1 is nearer cluster 1 but must join series 0 in cluster 0.
        let distances = vec![vec![0.0, 5.0], vec![4.0, 0.1]];
        let mut c = ConstraintSet::new();
        c.add_must_link(0, 1);
        assert_eq!(constrained_assign(&distances, &c), Ok(vec![0, 0]));
    }

    #[test]
    fn greedy_assignment_ties_go_to_lower_cluster() {
        let distances = vec![vec![2.0, 2.0, 1.0], vec![3.0, 3.0, 9.0]];
        assert_eq!(constrained_assign(&distances, &ConstraintSet::new()), Ok(vec![2, 0]));
    }

    #[test]
    fn greedy_assignment_reports_dead_end() {
        // Series 2 must join 0 but may not join 1, which already share a cluster.
        let distances = vec![vec![0.0], vec![0.0], vec![0.0]];
        let mut c = ConstraintSet::new();
        c.add_must_link(0, 2);
        c.add_cannot_link(1, 2);
        assert_eq!(
            constrained_assign(&distances, &c),
            Err(Invalid::NoAdmissibleCluster { series: 2 })
        );
    }

    #[test]
    fn unconstrained_recovers_groups() {
        let m = archetype();
        let result = ConstrainedKMeansConfig::new(3)
            .unwrap()
            .fit(&m, &ConstraintSet::new())
            .unwrap();
        let signed = result.assignment.to_signed();
        for group in signed.chunks(3) {
            assert!(group.iter().all(|&c| c == group[0]), "group split: {signed:?}");
        }
        assert_eq!(result.assignment.cluster_sizes(), vec![3, 3, 3]);
        assert!(result.total_distance < 1.0);
    }

    #[test]
    fn cannot_link_splits_a_natural_group() {
        let m = archetype();
        let mut c = ConstraintSet::new();
        c.add_cannot_link(0, 1);
        let result = ConstrainedKMeansConfig::new(3).unwrap().fit(&m, &c).unwrap();
        assert_ne!(result.assignment.get(0).cluster, result.assignment.get(1).cluster);
    }

    #[test]
    fn must_link_joins_distant_series() {
        let m = archetype();
        let mut c = ConstraintSet::new();
        c.add_must_link(0, 8);
        let result = ConstrainedKMeansConfig::new(3).unwrap().fit(&m, &c).unwrap();
        assert_eq!(result.assignment.get(0).cluster, result.assignment.get(8).cluster);
        assert_eq!(result.n_valid, 10);
        assert_eq!(result.assignment.cluster_sizes().iter().sum::<usize>(), 9);
    }

    #[test]
    fn impossible_constraints_fail() {
        let m = archetype();
        let mut c = ConstraintSet::new();
        c.add_must_link(0, 8);
        c.add_must_link(8, 4);
        c.add_cannot_link(0, 4);
        let err = ConstrainedKMeansConfig::new(3).unwrap().fit(&m, &c).unwrap_err();
        assert!(matches!(err, ClusterError::NoValidClustering { k: 3, runs: 10 }));
    }

    #[test]
    fn iteration_cap_invalidates() {
        let m = archetype();
        let err = ConstrainedKMeansConfig::new(3)
            .unwrap()
            .with_max_iter(0)
            .fit(&m, &ConstraintSet::new())
            .unwrap_err();
        assert!(matches!(err, ClusterError::NoValidClustering { .. }));
    }

    #[test]
    fn rejects_too_few_series() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0], vec![2.0]]).unwrap();
        let err = ConstrainedKMeansConfig::new(3)
            .unwrap()
            .fit(&m, &ConstraintSet::new())
            .unwrap_err();
        assert!(matches!(err, ClusterError::TooFewSeries { n_series: 2, k: 3 }));
    }

    #[test]
    fn same_seed_same_result() {
        let m = archetype();
        let cfg = ConstrainedKMeansConfig::new(4).unwrap().with_seed(11);
        let a = cfg.fit(&m, &ConstraintSet::new()).unwrap();
        let b = cfg.fit(&m, &ConstraintSet::new()).unwrap();
        assert_eq!(a.assignment, b.assignment);
        assert_eq!(a.best_run, b.best_run);
    }
}
