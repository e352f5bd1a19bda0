//! End-to-end integration tests: JSON snapshot -> matrix -> cluster -> artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use cohort_cluster::{Algorithm, OutlierMode, Pipeline, summarize, tune_eps};
use cohort_io::{ExperimentName, IoError, ResultWriter, RunSettings, SnapshotReader};
use cohort_series::{
    LabelEncoding, MatrixBuilder, Preprocessor, SENTINEL, SimilarityMode, fill_with_median,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn four_by_two_keeps_only_the_informative_label() {
    let snapshot = SnapshotReader::new(&fixture_path("four_by_two.json"))
        .read()
        .expect("fixture should parse");
    assert_eq!(snapshot.len(), 4);
    assert_eq!(snapshot.resource_ids[0].as_str(), "1000");

    let built = MatrixBuilder::new().build(&snapshot.series).unwrap();
    assert_eq!(built.matrix.to_rows(), vec![vec![0.0, 10.0]; 4]);
    assert_eq!(built.dictionary.values(), &["eu-west".to_string()]);
    assert_eq!(built.dictionary.column("eu-west"), Some(0));
    assert_eq!(built.design.to_rows(), vec![vec![0], vec![1], vec![1], vec![1]]);

    let processed = Preprocessor::new()
        .apply(&built.matrix, &built.observed, &built.design)
        .unwrap();
    assert_eq!(processed, built.matrix, "proximity partition preprocessing leaves clean input alone");
}

#[test]
fn ragged_slot_is_sentinel_then_row_median() {
    let snapshot = SnapshotReader::new(&fixture_path("ragged.json")).read().unwrap();
    let built = MatrixBuilder::new().build(&snapshot.series).unwrap();

    assert_eq!(built.timestamps.len(), 3);
    assert_eq!(built.matrix.row(1), &[2.0, SENTINEL, 6.0]);
    assert!(built.dictionary.is_empty(), "a label held by every series is not informative");

    assert_eq!(built.observed.row(1), &[true, false, true]);
    let filled = fill_with_median(&built.matrix, &built.observed).unwrap();
    assert_eq!(filled.row(1), &[2.0, 4.0, 6.0]);
    assert_eq!(filled.row(0), built.matrix.row(0));
}

#[test]
fn constrained_round_trip() {
    // 1. Read and build
    let snapshot = SnapshotReader::new(&fixture_path("two_zones.json")).read().unwrap();
    let built = MatrixBuilder::new().build(&snapshot.series).unwrap();
    assert_eq!(built.dictionary.len(), 2);

    // 2. Preprocess and cluster
    let settings = RunSettings {
        algorithm: Algorithm::KMeansConstrained,
        similarity: SimilarityMode::Proximity,
        encoding: LabelEncoding::None,
        outliers: OutlierMode::Flag,
        seed: 42,
    };
    let processed = Preprocessor::new()
        .with_similarity(settings.similarity)
        .with_encoding(settings.encoding)
        .with_algorithm_hint(settings.algorithm.hint())
        .apply(&built.matrix, &built.observed, &built.design)
        .unwrap();
    let assignment = Pipeline::new()
        .with_seed(settings.seed)
        .constrained(&processed, &built.dictionary, &built.design, settings.outliers)
        .unwrap();

    let signed = assignment.to_signed();
    assert_eq!(signed[0], signed[1]);
    assert_eq!(signed[1], signed[2]);
    assert_eq!(signed[3], signed[4]);
    assert_eq!(signed[4], signed[5]);
    assert_ne!(signed[0], signed[3]);
    assert_eq!(assignment.n_outliers(), 0);

    // 3. Write artifacts
    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("zones".into()).unwrap()).unwrap();
    let cluster_path = writer
        .write_cluster(&snapshot.resource_ids, &assignment, &settings)
        .unwrap();
    let summary = summarize(&assignment, &built.design).unwrap();
    let (freq_json, freq_csv) = writer
        .write_frequency(&snapshot.resource_ids, &built.dictionary, &summary)
        .unwrap();

    // 4. Read back
    let content = read_json(&cluster_path);
    assert_eq!(content["experiment"], "zones");
    assert_eq!(content["algorithm"], "k-means-constrained");
    assert_eq!(content["similarity"], "proximity");
    assert_eq!(content["cluster_sizes"], serde_json::json!([3, 3]));
    let entries = content["assignments"].as_array().unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e["resource_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["3000", "3001", "3002", "3100", "3101", "3102"]);

    let freq = read_json(&freq_json);
    assert_eq!(freq["labels"], serde_json::json!(["eu-west", "us-east"]));
    for cluster in freq["clusters"].as_array().unwrap() {
        let mut p: Vec<f64> = cluster["percentages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        p.sort_by(f64::total_cmp);
        assert_eq!(p, vec![0.0, 1.0]);
    }
    let csv = fs::read_to_string(&freq_csv).unwrap();
    assert_eq!(csv.lines().next(), Some("cluster,size,eu-west,us-east"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn tuning_round_trip() {
    let snapshot = SnapshotReader::new(&fixture_path("two_zones.json")).read().unwrap();
    let built = MatrixBuilder::new().build(&snapshot.series).unwrap();
    let curve = tune_eps(&built.matrix).unwrap();
    assert_eq!(curve.len(), 6);

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("eps".into()).unwrap()).unwrap();
    let path = writer.write_tuning(Algorithm::Dbscan, snapshot.len(), &curve).unwrap();
    let content = read_json(&path);
    assert_eq!(content["n_series"], 6);
    assert_eq!(content["distances"].as_array().unwrap().len(), 6);
}

#[test]
fn reader_errors_surface() {
    let result = SnapshotReader::new(&fixture_path("missing.json")).read();
    assert!(matches!(result, Err(IoError::SnapshotNotFound { .. })), "got: {result:?}");
}
