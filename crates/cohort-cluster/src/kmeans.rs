//! Plain k-means: the assign/update loop, multi-restart orchestration and the
//! inertia sweep over k.

use std::cmp::Ordering;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use cohort_series::{FeatureMatrix, euclidean};

use crate::centroid::{distances_to, group_members, mean_of, nearest};
use crate::config::{KMeansConfig, SweepConfig};
use crate::error::ClusterError;
use crate::inertia::Inertia;
use crate::init::{FirstCentroid, kmeans_plus_plus};
use crate::label::ClusterAssignment;
use crate::result::{KMeansResult, KResult, SweepResult};

// ── Internal run result ───────────────────────────────────────────────────────

struct SingleRun {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: Inertia,
    converged: bool,
    iterations: usize,
}

// ── assign ────────────────────────────────────────────────────────────────────

/// Assign each row to its nearest centroid and compute total inertia.
#[instrument(skip_all, fields(n = matrix.n_rows(), k = centroids.len()))]
pub(crate) fn assign(matrix: &FeatureMatrix, centroids: &[Vec<f64>]) -> (Vec<usize>, Inertia) {
    let (labels, dists): (Vec<usize>, Vec<f64>) = distances_to(matrix, centroids)
        .par_iter()
        .map(|row| nearest(row))
        .unzip();
    let inertia_value: f64 = dists.iter().map(|d| d * d).sum();
    debug!(inertia = inertia_value, "assignment step complete");
    (labels, Inertia::new(inertia_value))
}

// ── update ────────────────────────────────────────────────────────────────────

/// Recompute centroids as member means, rescuing any empty cluster by stealing
/// the row farthest from its centroid in the largest cluster.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::EmptyCluster`] | The largest cluster is a singleton |
pub(crate) fn update(
    matrix: &FeatureMatrix,
    labels: &mut [usize],
    prev_centroids: &[Vec<f64>],
    iteration: usize,
) -> Result<Vec<Vec<f64>>, ClusterError> {
    let k = prev_centroids.len();
    let mut groups = group_members(labels, k);

    while let Some(empty_label) = groups.iter().position(Vec::is_empty) {
        let largest_label = groups
            .iter()
            .enumerate()
            .max_by_key(|(_, g)| g.len())
            .map_or(0, |(c, _)| c);

        if groups[largest_label].len() <= 1 {
            return Err(ClusterError::EmptyCluster { label: empty_label, iteration });
        }

        let centroid = &prev_centroids[largest_label];
        let farthest_pos = groups[largest_label]
            .iter()
            .enumerate()
            .max_by(|&(_, &a), &(_, &b)| {
                euclidean(matrix.row(a), centroid).total_cmp(&euclidean(matrix.row(b), centroid))
            })
            .map_or(0, |(pos, _)| pos);

        let stolen = groups[largest_label].swap_remove(farthest_pos);
        groups[empty_label].push(stolen);
        labels[stolen] = empty_label;

        debug!(
            empty_cluster = empty_label,
            donor_cluster = largest_label,
            stolen_series = stolen,
            "rescued empty cluster"
        );
    }

    Ok(groups.iter().map(|g| mean_of(matrix, g)).collect())
}

// ── run_once ──────────────────────────────────────────────────────────────────

#[instrument(skip(matrix, config), fields(k = config.k, seed))]
fn run_once(matrix: &FeatureMatrix, config: &KMeansConfig, seed: u64) -> Result<SingleRun, ClusterError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let init = kmeans_plus_plus(matrix, config.k, FirstCentroid::Random, &mut rng);
    let mut centroids: Vec<Vec<f64>> = init.iter().map(|&i| matrix.row(i).to_vec()).collect();

    let mut labels: Vec<usize> = Vec::new();
    let mut inertia = Inertia::new(f64::INFINITY);
    let mut prev_inertia: Option<f64> = None;
    let mut converged = false;
    let mut iterations = 0usize;

    for iteration in 0..config.max_iter {
        iterations = iteration + 1;

        let (new_labels, new_inertia) = assign(matrix, &centroids);
        labels = new_labels;
        inertia = new_inertia;

        if let Some(prev) = prev_inertia
            && (prev - new_inertia.value()).abs() < config.tol
        {
            converged = true;
            debug!(iteration, "converged");
            break;
        }
        prev_inertia = Some(new_inertia.value());

        centroids = update(matrix, &mut labels, &centroids, iteration)?;
        debug!(iteration, inertia = inertia.value(), "iteration complete");
    }

    if !converged {
        // Report labels that match the final centroids.
        (labels, inertia) = assign(matrix, &centroids);
    }

    info!(seed, iterations, inertia = inertia.value(), converged, "single restart complete");

    Ok(SingleRun { labels, centroids, inertia, converged, iterations })
}

// ── multi_restart ─────────────────────────────────────────────────────────────

/// Run `config.n_init` independent restarts in parallel and return the one
/// with the lowest inertia. Sub-seeds are derived from `config.seed`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::EmptyCluster`] | A cluster becomes empty and cannot be rescued |
#[instrument(skip(matrix, config), fields(k = config.k, n_init = config.n_init))]
pub(crate) fn multi_restart(matrix: &FeatureMatrix, config: &KMeansConfig) -> Result<KMeansResult, ClusterError> {
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.n_init.max(1)).map(|_| master_rng.r#gen()).collect();

    let results: Vec<Result<SingleRun, ClusterError>> = seeds
        .into_par_iter()
        .map(|seed| run_once(matrix, config, seed))
        .collect();

    let mut best: Option<SingleRun> = None;
    let mut n_ok = 0usize;
    for result in results {
        let run = result?;
        n_ok += 1;
        best = Some(match best {
            Some(prev) if run.inertia.total_cmp(&prev.inertia) != Ordering::Less => prev,
            _ => run,
        });
    }
    let Some(best) = best else {
        return Err(ClusterError::InvalidK { k: config.k });
    };

    info!(
        k = config.k,
        n_init = n_ok,
        best_inertia = best.inertia.value(),
        "multi-restart complete"
    );

    Ok(KMeansResult {
        assignment: ClusterAssignment::from_indices(&best.labels),
        centroids: best.centroids,
        inertia: best.inertia,
        converged: best.converged,
        iterations: best.iterations,
        n_init_used: n_ok,
    })
}

// ── sweep ─────────────────────────────────────────────────────────────────────

/// Run k-means for each k in `1..=min(max_k, n)` and collect the inertia curve.
///
/// # Errors
///
/// Propagates the first [`ClusterError`] from any k value.
#[instrument(skip(matrix, config), fields(n = matrix.n_rows(), max_k = config.max_k))]
pub(crate) fn sweep(matrix: &FeatureMatrix, config: &SweepConfig) -> Result<SweepResult, ClusterError> {
    let top = config.max_k.min(matrix.n_rows());
    let mut results = Vec::with_capacity(top);

    for k in 1..=top {
        let k_config = KMeansConfig {
            k,
            n_init: config.n_init,
            max_iter: config.max_iter,
            tol: config.tol,
            seed: config.seed,
        };
        let km = multi_restart(matrix, &k_config)?;
        debug!(k, inertia = km.inertia.value(), "k complete");
        results.push(KResult { k, inertia: km.inertia });
    }

    info!(n_k = results.len(), "sweep complete");
    Ok(SweepResult { results })
}
