//! Criterion benchmarks for cohort-cluster: constrained fit, plain fit, DBSCAN and the k sweep.

use criterion::{Criterion, criterion_group, criterion_main};

use cohort_cluster::{ConstrainedKMeansConfig, ConstraintConfig, DbscanConfig, KMeansConfig, SweepConfig};
use cohort_series::{DesignMatrix, FeatureMatrix};

fn make_cluster_data() -> (FeatureMatrix, DesignMatrix) {
    let offsets = [0.0, 5.0, 10.0, 15.0, 20.0];
    let mut rows = Vec::new();
    let mut design = Vec::new();
    for (g, &offset) in offsets.iter().enumerate() {
        for j in 0..20 {
            rows.push(
                (0..64)
                    .map(|i| (i as f64 * 0.1).sin() + offset + j as f64 * 0.01)
                    .collect(),
            );
            let mut flags = vec![0u8; offsets.len()];
            flags[g] = 1;
            design.push(flags);
        }
    }
    (FeatureMatrix::from_rows(rows).unwrap(), DesignMatrix::from_rows(&design))
}

fn bench_constrained_fit(c: &mut Criterion) {
    let (matrix, design) = make_cluster_data();
    let constraints = ConstraintConfig::default().build(&design);
    let cfg = ConstrainedKMeansConfig::for_series_count(matrix.n_rows()).unwrap();

    c.bench_function("constrained_fit_100x64_k12", |b| {
        b.iter(|| cfg.fit(&matrix, &constraints).unwrap());
    });
}

fn bench_kmeans_fit(c: &mut Criterion) {
    let (matrix, _) = make_cluster_data();
    let cfg = KMeansConfig::new(5).unwrap().with_n_init(3).with_seed(42);

    c.bench_function("kmeans_fit_100x64_k5_ninit3", |b| {
        b.iter(|| cfg.fit(&matrix).unwrap());
    });
}

fn bench_dbscan(c: &mut Criterion) {
    let (matrix, _) = make_cluster_data();
    let cfg = DbscanConfig::new(2.0).unwrap();

    c.bench_function("dbscan_100x64_eps2", |b| {
        b.iter(|| cfg.fit(&matrix).unwrap());
    });
}

fn bench_sweep(c: &mut Criterion) {
    let (matrix, _) = make_cluster_data();
    let cfg = SweepConfig::default().with_n_init(2).with_max_iter(20);

    c.bench_function("sweep_100x64_k1to10", |b| {
        b.iter(|| cfg.fit(&matrix).unwrap());
    });
}

criterion_group!(benches, bench_constrained_fit, bench_kmeans_fit, bench_dbscan, bench_sweep);
criterion_main!(benches);
