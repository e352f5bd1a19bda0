//! Clustering of series feature matrices.
//!
//! Provides label-constrained k-means (must-link/cannot-link pairs derived
//! from the design matrix), plain multi-init k-means with an inertia sweep,
//! DBSCAN with noise re-homing, distance-threshold outlier flagging and
//! per-cluster label summaries.

mod centroid;
mod config;
mod constrained;
mod constraint;
mod dbscan;
mod error;
mod inertia;
mod init;
mod kmeans;
mod label;
mod neighbors;
mod outlier;
mod pipeline;
mod result;
mod summary;
mod tuning;

pub use config::{KMeansConfig, SweepConfig};
pub use constrained::{
    ConstrainedKMeansConfig, ConstrainedResult, MIN_CLUSTERS, SERIES_PER_CLUSTER, target_cluster_count,
};
pub use constraint::{ConstraintConfig, ConstraintSet};
pub use dbscan::{CORRELATION_EPS, DbscanConfig, DbscanResult, ONE_HOT_EPS_BONUS, PROXIMITY_EPS, default_eps};
pub use error::ClusterError;
pub use inertia::Inertia;
pub use label::{ClusterAssignment, ClusterId, Membership};
pub use neighbors::nearest_neighbor_distances;
pub use outlier::{OutlierDetector, cluster_medians, rehome_noise};
pub use pipeline::{Algorithm, OutlierMode, Pipeline, cluster_constrained, cluster_density, cluster_plain};
pub use result::{KMeansResult, KResult, SweepResult};
pub use summary::{LabelOrder, LabelSummary, summarize};
pub use tuning::{tune_eps, tune_k};
