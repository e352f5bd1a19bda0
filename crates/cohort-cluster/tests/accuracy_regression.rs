//! Accuracy regression tests for cohort-cluster.
//!
//! Thirty series in three tight groups around 0, 5 and 10, each group
//! carrying its own label pattern. Changes to seeding, assignment or
//! constraint derivation must keep these properties.

use cohort_cluster::{
    ClusterAssignment, ConstrainedKMeansConfig, ConstraintConfig, ConstraintSet, DbscanConfig, OutlierDetector,
    OutlierMode, Pipeline, rehome_noise, summarize, target_cluster_count, tune_eps,
};
use cohort_series::{DesignMatrix, FeatureMatrix, LabelDictionary, euclidean};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn grouped_matrix() -> FeatureMatrix {
    let mut rows = Vec::new();
    for offset in [0.0, 5.0, 10.0] {
        for j in 0..10 {
            rows.push(vec![offset + j as f64 * 0.01, offset, offset, offset]);
        }
    }
    FeatureMatrix::from_rows(rows).unwrap()
}

fn grouped_design() -> (LabelDictionary, DesignMatrix) {
    let dict = LabelDictionary::from_values(["web", "db", "batch"]);
    let mut rows = Vec::new();
    for g in 0..3 {
        for _ in 0..10 {
            let mut row = vec![0u8; 3];
            row[g] = 1;
            rows.push(row);
        }
    }
    (dict, DesignMatrix::from_rows(&rows))
}

fn assert_constraints_honored(assignment: &ClusterAssignment, constraints: &ConstraintSet) {
    for i in 0..assignment.len() {
        let ci = assignment.get(i).cluster;
        for j in constraints.must_link(i) {
            assert_eq!(ci, assignment.get(j).cluster, "must-link {i}-{j} broken");
        }
        for j in constraints.cannot_link(i) {
            assert_ne!(ci, assignment.get(j).cluster, "cannot-link {i}-{j} broken");
        }
    }
}

// ---------------------------------------------------------------------------
// a) constraints derived from labels are honored
// ---------------------------------------------------------------------------

#[test]
fn derived_constraints_are_honored() {
    let m = grouped_matrix();
    let (_, design) = grouped_design();
    let constraints = ConstraintConfig::default().build(&design);
    assert!(!constraints.is_empty(), "three common patterns must yield constraints");

    let result = ConstrainedKMeansConfig::for_series_count(m.n_rows())
        .unwrap()
        .fit(&m, &constraints)
        .unwrap();
    assert_constraints_honored(&result.assignment, &constraints);
}

// ---------------------------------------------------------------------------
// b) every series lands in exactly one cluster in 1..=k
// ---------------------------------------------------------------------------

#[test]
fn assignment_is_a_partition() {
    let m = grouped_matrix();
    let (dict, design) = grouped_design();
    let k = target_cluster_count(m.n_rows());
    assert_eq!(k, 5);

    let a = Pipeline::new().constrained(&m, &dict, &design, OutlierMode::None).unwrap();
    assert_eq!(a.len(), 30);
    assert!(a.iter().all(|mem| (1..=k).contains(&mem.cluster.get())));
    assert_eq!(a.cluster_sizes().iter().sum::<usize>(), 30);
    assert_eq!(a.n_outliers(), 0);
}

// ---------------------------------------------------------------------------
// c) natural groups are never merged
// ---------------------------------------------------------------------------

#[test]
fn groups_are_not_merged() {
    let m = grouped_matrix();
    let a = Pipeline::new().plain(&m, OutlierMode::None).unwrap();
    for x in [0usize, 10, 20] {
        for y in [0usize, 10, 20] {
            if x != y {
                assert_ne!(a.get(x).cluster, a.get(y).cluster, "series {x} and {y} share a cluster");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// d) seeded runs are reproducible
// ---------------------------------------------------------------------------

#[test]
fn same_seed_same_assignment() {
    let m = grouped_matrix();
    let (dict, design) = grouped_design();
    let p = Pipeline::new().with_seed(7);
    let first = p.constrained(&m, &dict, &design, OutlierMode::Flag).unwrap();
    let second = p.constrained(&m, &dict, &design, OutlierMode::Flag).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// e) outlier flags agree with the threshold
// ---------------------------------------------------------------------------

#[test]
fn outlier_flags_match_distances() {
    let m = grouped_matrix();
    let result = ConstrainedKMeansConfig::new(3)
        .unwrap()
        .fit(&m, &ConstraintSet::new())
        .unwrap();
    let detector = OutlierDetector::new(0.03).unwrap();
    let flagged = detector.flag(&m, &result.assignment, &result.centroids).unwrap();

    assert!(flagged.n_outliers() > 0);
    for (i, mem) in flagged.iter().enumerate() {
        let d = euclidean(m.row(i), &result.centroids[mem.cluster.index()]);
        assert_eq!(mem.outlier, d > 0.03, "series {i} at distance {d}");
    }
}

// ---------------------------------------------------------------------------
// f) density clustering and label summary
// ---------------------------------------------------------------------------

#[test]
fn density_finds_the_three_groups() {
    let m = grouped_matrix();
    let eps = tune_eps(&m).unwrap();
    assert!(eps.iter().all(|&d| (d - 0.01).abs() < 1e-9));

    let density = DbscanConfig::new(1.0).unwrap().fit(&m).unwrap();
    assert_eq!(density.n_clusters, 3);
    let (a, medians) = rehome_noise(&m, &density);
    assert_eq!(medians.len(), 3);

    let (_, design) = grouped_design();
    let summary = summarize(&a, &design).unwrap();
    assert_eq!(summary.sizes, vec![10, 10, 10]);
    for (r, row) in summary.percentages.iter().enumerate() {
        assert_eq!(row.iter().filter(|&&p| p == 1.0).count(), 1, "cluster row {r}");
        assert_eq!(row.iter().filter(|&&p| p == 0.0).count(), 2, "cluster row {r}");
    }
}
