use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use cohort_cluster::{
    Algorithm, ClusterAssignment, ConstraintConfig, LabelOrder, OutlierDetector, OutlierMode, Pipeline, summarize,
    tune_eps, tune_k,
};
use cohort_io::{ExperimentName, ResultWriter, RunSettings, Snapshot, SnapshotReader};
use cohort_series::{BuiltMatrix, FeatureMatrix, LabelEncoding, MatrixBuilder, Preprocessor, SimilarityMode};

#[derive(Parser)]
#[command(name = "cohort")]
#[command(about = "Semi-supervised clustering of labeled telemetry time series")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Where the snapshot comes from and where artifacts go.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the JSON snapshot
    #[arg(long)]
    data: PathBuf,

    /// Only build the label dictionary from values under this label key
    #[arg(long)]
    label_key: Option<String>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Preprocessing switches.
#[derive(Args, Debug, Clone)]
struct ModeArgs {
    /// Similarity mode: "correlation" (zero-aligned shapes) or "proximity" (raw levels)
    #[arg(long, default_value = "correlation")]
    similarity: SimilarityMode,

    /// Label encoding: "none" or "one-hot"
    #[arg(long, default_value = "none")]
    encoding: LabelEncoding,

    /// Rescale every sample into [0, 10] using the global value range
    #[arg(long, default_value_t = false)]
    compress_range: bool,
}

/// Clustering parameters shared by `cluster` and `frequency`.
#[derive(Args, Debug, Clone)]
struct ClusterArgs {
    /// Clustering algorithm: "k-means", "k-means-constrained" or "dbscan"
    #[arg(long, default_value = "k-means-constrained")]
    algorithm: Algorithm,

    /// Outlier policy: "none" or "flag"
    #[arg(long, default_value = "none")]
    outliers: OutlierMode,

    /// Distance beyond which a series is flagged as an outlier
    #[arg(long, default_value_t = 6.75)]
    outlier_threshold: f64,

    /// Share of series a label pattern must exceed to seed constraints
    #[arg(long, default_value_t = 0.03)]
    common_fraction: f64,

    /// DBSCAN neighbourhood radius (defaults by similarity and encoding)
    #[arg(long)]
    eps: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Cluster series and write the signed assignment
    Cluster {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        modes: ModeArgs,

        #[command(flatten)]
        clustering: ClusterArgs,
    },

    /// Compute a diagnostic curve for choosing k (k-means) or eps (dbscan)
    Tune {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        modes: ModeArgs,

        /// Algorithm to tune: "k-means" or "dbscan"
        #[arg(long, default_value = "k-means")]
        algorithm: Algorithm,
    },

    /// Cluster series and report the share of each cluster carrying each label
    Frequency {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        modes: ModeArgs,

        #[command(flatten)]
        clustering: ClusterArgs,

        /// Label column order: "dictionary", "frequency" or "alphabetical"
        #[arg(long, default_value = "dictionary")]
        sort_labels: LabelOrder,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ClusterOutput {
    experiment: String,
    algorithm: String,
    n_series: usize,
    n_clusters: usize,
    n_outliers: usize,
    cluster_sizes: Vec<usize>,
    artifact: PathBuf,
}

#[derive(Serialize)]
struct TuneOutput {
    experiment: String,
    algorithm: String,
    n_series: usize,
    curve: Vec<f64>,
    artifact: PathBuf,
}

#[derive(Serialize)]
struct FrequencyOutput {
    experiment: String,
    n_series: usize,
    n_clusters: usize,
    labels: Vec<String>,
    artifacts: Vec<PathBuf>,
}

fn load(input: &InputArgs) -> Result<(Snapshot, BuiltMatrix)> {
    let snapshot = SnapshotReader::new(&input.data)
        .read()
        .context("failed to read snapshot")?;
    let built = MatrixBuilder::new()
        .with_restrict_key(input.label_key.clone())
        .build(&snapshot.series)
        .context("failed to build series matrix")?;
    Ok((snapshot, built))
}

fn preprocess(built: &BuiltMatrix, modes: &ModeArgs, algorithm: Algorithm) -> Result<FeatureMatrix> {
    Preprocessor::new()
        .with_similarity(modes.similarity)
        .with_encoding(modes.encoding)
        .with_algorithm_hint(algorithm.hint())
        .with_range_compression(modes.compress_range.then_some(built.range))
        .apply(&built.matrix, &built.observed, &built.design)
        .context("preprocessing failed")
}

fn run_clustering(
    seed: u64,
    built: &BuiltMatrix,
    matrix: &FeatureMatrix,
    modes: &ModeArgs,
    args: &ClusterArgs,
) -> Result<ClusterAssignment> {
    let pipeline = Pipeline::new()
        .with_constraints(ConstraintConfig::new(args.common_fraction)?)
        .with_detector(OutlierDetector::new(args.outlier_threshold)?)
        .with_eps(args.eps)
        .with_seed(seed);

    let assignment = match args.algorithm {
        Algorithm::KMeansConstrained => {
            pipeline.constrained(matrix, &built.dictionary, &built.design, args.outliers)
        }
        Algorithm::KMeans => pipeline.plain(matrix, args.outliers),
        Algorithm::Dbscan => pipeline.density(matrix, modes.similarity, modes.encoding, args.outliers),
    }
    .with_context(|| format!("{} clustering failed", args.algorithm))?;
    Ok(assignment)
}

fn settings(seed: u64, modes: &ModeArgs, args: &ClusterArgs) -> RunSettings {
    RunSettings {
        algorithm: args.algorithm,
        similarity: modes.similarity,
        encoding: modes.encoding,
        outliers: args.outliers,
        seed,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Cluster {
            input,
            modes,
            clustering,
        } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let (snapshot, built) = load(&input)?;
            let matrix = preprocess(&built, &modes, clustering.algorithm)?;
            let assignment = run_clustering(cli.seed, &built, &matrix, &modes, &clustering)?;

            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            let artifact = writer.write_cluster(
                &snapshot.resource_ids,
                &assignment,
                &settings(cli.seed, &modes, &clustering),
            )?;

            let output = ClusterOutput {
                experiment: input.experiment,
                algorithm: clustering.algorithm.to_string(),
                n_series: assignment.len(),
                n_clusters: assignment.n_clusters(),
                n_outliers: assignment.n_outliers(),
                cluster_sizes: assignment.cluster_sizes(),
                artifact,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Tune {
            input,
            modes,
            algorithm,
        } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let (snapshot, built) = load(&input)?;
            let matrix = preprocess(&built, &modes, algorithm)?;

            let curve = match algorithm {
                Algorithm::KMeans | Algorithm::KMeansConstrained => tune_k(&matrix, cli.seed),
                Algorithm::Dbscan => tune_eps(&matrix),
            }
            .with_context(|| format!("{algorithm} tuning failed"))?;

            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            let artifact = writer.write_tuning(algorithm, snapshot.len(), &curve)?;

            let output = TuneOutput {
                experiment: input.experiment,
                algorithm: algorithm.to_string(),
                n_series: snapshot.len(),
                curve,
                artifact,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Frequency {
            input,
            modes,
            clustering,
            sort_labels,
        } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let (snapshot, built) = load(&input)?;
            let matrix = preprocess(&built, &modes, clustering.algorithm)?;
            let assignment = run_clustering(cli.seed, &built, &matrix, &modes, &clustering)?;

            let summary = summarize(&assignment, &built.design)
                .context("label summary failed")?
                .sorted(sort_labels, &built.dictionary);
            info!(order = %sort_labels, n_clusters = summary.clusters.len(), "labels summarised");

            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            let cluster_artifact = writer.write_cluster(
                &snapshot.resource_ids,
                &assignment,
                &settings(cli.seed, &modes, &clustering),
            )?;
            let (json_artifact, csv_artifact) =
                writer.write_frequency(&snapshot.resource_ids, &built.dictionary, &summary)?;

            let output = FrequencyOutput {
                experiment: input.experiment,
                n_series: assignment.len(),
                n_clusters: summary.clusters.len(),
                labels: summary
                    .label_values(&built.dictionary)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                artifacts: vec![cluster_artifact, json_artifact, csv_artifact],
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
