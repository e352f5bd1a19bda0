//! Snapshot loading, validation and result serialization for the cohort pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, ResourceId, Snapshot};
pub use error::IoError;
pub use reader::SnapshotReader;
pub use writer::{ResultWriter, RunSettings};
