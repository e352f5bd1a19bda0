//! JSON and CSV result writer for clustering, tuning and label-frequency outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use cohort_cluster::{Algorithm, ClusterAssignment, LabelSummary, OutlierMode};
use cohort_series::{LabelDictionary, LabelEncoding, SimilarityMode};

use crate::IoError;
use crate::domain::{ExperimentName, ResourceId};

/// Settings a clustering run was made with, recorded in its artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Clustering engine.
    pub algorithm: Algorithm,
    /// Similarity mode used in preprocessing.
    pub similarity: SimilarityMode,
    /// Label encoding used in preprocessing.
    pub encoding: LabelEncoding,
    /// Outlier policy.
    pub outliers: OutlierMode,
    /// Seed for every random draw.
    pub seed: u64,
}

/// Writes result artifacts under one output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_cluster.json`,
/// `{experiment}_tuning.json`, `{experiment}_frequency.json` and
/// `{experiment}_frequency.csv`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a clustering result to `{experiment}_cluster.json`, returning the path.
    ///
    /// Clusters are reported 1-based; outliers carry the negated id.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | `resource_ids` and `assignment` differ in length |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n = assignment.len()))]
    pub fn write_cluster(
        &self,
        resource_ids: &[ResourceId],
        assignment: &ClusterAssignment,
        settings: &RunSettings,
    ) -> Result<PathBuf, IoError> {
        check_len("cluster assignment", resource_ids.len(), assignment.len())?;

        let assignments = resource_ids
            .iter()
            .zip(assignment.iter())
            .map(|(id, m)| AssignmentEntry {
                resource_id: id.as_str(),
                cluster: m.signed(),
            })
            .collect();

        let artifact = ClusterArtifact {
            experiment: self.experiment.as_str(),
            algorithm: settings.algorithm.to_string(),
            similarity: settings.similarity.to_string(),
            encoding: settings.encoding.to_string(),
            outliers: settings.outliers.to_string(),
            seed: settings.seed,
            n_series: assignment.len(),
            n_clusters: assignment.n_clusters(),
            n_outliers: assignment.n_outliers(),
            cluster_sizes: assignment.cluster_sizes(),
            assignments,
        };
        self.write_json("cluster", "cluster result", &artifact)
    }

    /// Write a tuning curve to `{experiment}_tuning.json`, returning the path.
    ///
    /// For partition algorithms `values[i]` is the inertia at `k = i + 1`;
    /// for DBSCAN it is the `i`-th smallest nearest-neighbour distance.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(algorithm = %algorithm, n_values = values.len()))]
    pub fn write_tuning(&self, algorithm: Algorithm, n_series: usize, values: &[f64]) -> Result<PathBuf, IoError> {
        let (curve, inertia, distances) = match algorithm {
            Algorithm::Dbscan => ("nearest_neighbor_distance", None, Some(values)),
            Algorithm::KMeans | Algorithm::KMeansConstrained => {
                let entries = values
                    .iter()
                    .enumerate()
                    .map(|(i, &inertia)| KEntry { k: i + 1, inertia })
                    .collect();
                ("inertia", Some(entries), None)
            }
        };
        let artifact = TuningArtifact {
            experiment: self.experiment.as_str(),
            algorithm: algorithm.to_string(),
            curve,
            n_series,
            inertia,
            distances,
        };
        self.write_json("tuning", "tuning curve", &artifact)
    }

    /// Write a label summary to `{experiment}_frequency.json` and
    /// `{experiment}_frequency.csv`, returning both paths.
    ///
    /// The CSV holds one row per cluster: id, size, then one percentage
    /// column per label in summary order. The JSON additionally carries the
    /// per-series design matrix in the same column order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | `resource_ids` and the design matrix differ in length |
    /// | [`IoError::WriteFile`] | A file cannot be written |
    /// | [`IoError::Csv`] | The CSV encoder fails |
    #[instrument(skip_all, fields(n_clusters = summary.clusters.len(), n_labels = summary.columns.len()))]
    pub fn write_frequency(
        &self,
        resource_ids: &[ResourceId],
        dictionary: &LabelDictionary,
        summary: &LabelSummary,
    ) -> Result<(PathBuf, PathBuf), IoError> {
        check_len("design matrix", resource_ids.len(), summary.design.n_rows())?;
        let labels = summary.label_values(dictionary);

        let clusters = summary
            .clusters
            .iter()
            .zip(&summary.sizes)
            .zip(&summary.percentages)
            .map(|((id, &size), percentages)| FrequencyRow {
                cluster: id.get(),
                size,
                percentages,
            })
            .collect();
        let design = resource_ids
            .iter()
            .enumerate()
            .map(|(i, id)| DesignEntry {
                resource_id: id.as_str(),
                labels: summary.design.row(i),
            })
            .collect();
        let artifact = FrequencyArtifact {
            experiment: self.experiment.as_str(),
            labels: &labels,
            clusters,
            design,
        };
        let json_path = self.write_json("frequency", "label frequency", &artifact)?;

        let csv_path = self.artifact_path("frequency", "csv");
        let csv_err = |source| IoError::Csv {
            path: csv_path.clone(),
            source,
        };
        let mut wtr = csv::Writer::from_path(&csv_path).map_err(csv_err)?;
        let mut header = vec!["cluster", "size"];
        header.extend(labels.iter().copied());
        wtr.write_record(&header).map_err(csv_err)?;
        for ((id, size), row) in summary.clusters.iter().zip(&summary.sizes).zip(&summary.percentages) {
            let mut record = vec![id.get().to_string(), size.to_string()];
            record.extend(row.iter().map(f64::to_string));
            wtr.write_record(&record).map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: csv_path.clone(),
            source: e,
        })?;
        info!(path = %csv_path.display(), "frequency table written");

        Ok((json_path, csv_path))
    }

    fn artifact_path(&self, suffix: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}.{extension}", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, suffix: &str, what: &'static str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self.artifact_path(suffix, "json");
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Encode { what, source: e })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "{what} written");
        Ok(path)
    }
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<(), IoError> {
    if expected != got {
        return Err(IoError::LengthMismatch { what, expected, got });
    }
    Ok(())
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ClusterArtifact<'a> {
    experiment: &'a str,
    algorithm: String,
    similarity: String,
    encoding: String,
    outliers: String,
    seed: u64,
    n_series: usize,
    n_clusters: usize,
    n_outliers: usize,
    cluster_sizes: Vec<usize>,
    assignments: Vec<AssignmentEntry<'a>>,
}

#[derive(Serialize)]
struct AssignmentEntry<'a> {
    resource_id: &'a str,
    cluster: i64,
}

#[derive(Serialize)]
struct TuningArtifact<'a> {
    experiment: &'a str,
    algorithm: String,
    curve: &'static str,
    n_series: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    inertia: Option<Vec<KEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distances: Option<&'a [f64]>,
}

#[derive(Serialize)]
struct KEntry {
    k: usize,
    inertia: f64,
}

#[derive(Serialize)]
struct FrequencyArtifact<'a> {
    experiment: &'a str,
    labels: &'a [&'a str],
    clusters: Vec<FrequencyRow<'a>>,
    design: Vec<DesignEntry<'a>>,
}

#[derive(Serialize)]
struct FrequencyRow<'a> {
    cluster: usize,
    size: usize,
    percentages: &'a [f64],
}

#[derive(Serialize)]
struct DesignEntry<'a> {
    resource_id: &'a str,
    labels: &'a [u8],
}
