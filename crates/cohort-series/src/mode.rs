//! Request modes that select preprocessing transforms.

use std::fmt;
use std::str::FromStr;

use crate::error::SeriesError;

/// How series are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimilarityMode {
    /// Compare shapes: every row is shifted so its minimum is zero.
    Correlation,
    /// Compare absolute levels: rows are left as they are.
    Proximity,
}

impl FromStr for SimilarityMode {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "correlation" => Ok(Self::Correlation),
            "proximity" => Ok(Self::Proximity),
            _ => Err(SeriesError::UnknownMode {
                kind: "similarity",
                value: s.to_string(),
                expected: "correlation, proximity",
            }),
        }
    }
}

impl fmt::Display for SimilarityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Correlation => "correlation",
            Self::Proximity => "proximity",
        })
    }
}

/// Whether label context enters the feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelEncoding {
    /// Numeric columns only.
    None,
    /// Design-matrix columns are appended to the numeric columns.
    OneHot,
}

impl FromStr for LabelEncoding {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "one-hot" | "onehot" => Ok(Self::OneHot),
            _ => Err(SeriesError::UnknownMode {
                kind: "label encoding",
                value: s.to_string(),
                expected: "none, one-hot",
            }),
        }
    }
}

impl fmt::Display for LabelEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::OneHot => "one-hot",
        })
    }
}

/// Family of the clustering algorithm the matrix is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmHint {
    /// Centroid-based clustering (plain or constrained k-means).
    Partition,
    /// Neighbourhood-density clustering; enables variance-driven reduction.
    Density,
}
