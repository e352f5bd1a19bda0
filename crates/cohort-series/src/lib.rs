//! Labeled telemetry series and the matrices built from them.
//!
//! Pure math library with no I/O. Aligns ragged series onto a shared
//! timestamp axis, extracts the informative label dictionary and design
//! matrix, and provides the preprocessing pipeline (sentinel repair, range
//! compression, zero-alignment, variance-driven reduction, label
//! concatenation) that feeds clustering.

mod builder;
mod distance;
mod error;
mod labels;
mod matrix;
mod mode;
mod pca;
mod preprocess;
mod series;
mod stats;

pub use builder::{BuiltMatrix, MatrixBuilder, ValueRange};
pub use distance::{euclidean, squared_euclidean};
pub use error::SeriesError;
pub use labels::{DesignMatrix, LabelDictionary};
pub use matrix::{FeatureMatrix, ObservedMask, SENTINEL};
pub use mode::{AlgorithmHint, LabelEncoding, SimilarityMode};
pub use pca::reduce_to_variance;
pub use preprocess::{
    ALIGNED_VARIANCE_TARGET, Preprocessor, RAW_VARIANCE_TARGET, append_labels, compress_range,
    fill_with_median, zero_align,
};
pub use series::{Sample, Series};
pub use stats::{coordinate_median, median};
