//! Per-cluster label composition.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use cohort_series::{DesignMatrix, LabelDictionary};

use crate::error::ClusterError;
use crate::label::{ClusterAssignment, ClusterId};

/// Order of label columns in a [`LabelSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LabelOrder {
    /// Dictionary (first-seen) order.
    #[default]
    Dictionary,
    /// Descending number of series carrying the label; ties keep dictionary order.
    Frequency,
    /// Ascending by label value.
    Alphabetical,
}

impl FromStr for LabelOrder {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dictionary" => Ok(Self::Dictionary),
            "frequency" => Ok(Self::Frequency),
            "alphabetical" => Ok(Self::Alphabetical),
            _ => Err(ClusterError::UnknownMode {
                kind: "label order",
                value: s.to_string(),
                expected: "dictionary, frequency, alphabetical",
            }),
        }
    }
}

impl fmt::Display for LabelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dictionary => "dictionary",
            Self::Frequency => "frequency",
            Self::Alphabetical => "alphabetical",
        })
    }
}

/// Fraction of each cluster's members carrying each label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    /// Clusters in ascending id order, one per percentage row.
    pub clusters: Vec<ClusterId>,
    /// Member count per cluster, outliers included.
    pub sizes: Vec<usize>,
    /// Dictionary column shown in each percentage column.
    pub columns: Vec<usize>,
    /// `percentages[r][c]`: share of cluster `clusters[r]` carrying label `columns[c]`.
    pub percentages: Vec<Vec<f64>>,
    /// Design matrix with columns in the same order as `percentages`.
    pub design: DesignMatrix,
}

impl LabelSummary {
    /// Label values for each percentage column.
    #[must_use]
    pub fn label_values<'a>(&self, dictionary: &'a LabelDictionary) -> Vec<&'a str> {
        self.columns
            .iter()
            .map(|&c| dictionary.value(c).unwrap_or_default())
            .collect()
    }

    /// Reorder label columns, applying the same permutation to the
    /// percentages and the design matrix.
    #[must_use]
    pub fn sorted(&self, order: LabelOrder, dictionary: &LabelDictionary) -> Self {
        let mut perm: Vec<usize> = (0..self.columns.len()).collect();
        match order {
            LabelOrder::Dictionary => perm.sort_by_key(|&p| self.columns[p]),
            LabelOrder::Frequency => {
                let counts = self.design.column_counts();
                perm.sort_by(|&a, &b| {
                    counts[b]
                        .cmp(&counts[a])
                        .then(self.columns[a].cmp(&self.columns[b]))
                });
            }
            LabelOrder::Alphabetical => {
                perm.sort_by_key(|&p| dictionary.value(self.columns[p]).unwrap_or_default());
            }
        }
        Self {
            clusters: self.clusters.clone(),
            sizes: self.sizes.clone(),
            columns: perm.iter().map(|&p| self.columns[p]).collect(),
            percentages: self
                .percentages
                .iter()
                .map(|row| perm.iter().map(|&p| row[p]).collect())
                .collect(),
            design: self.design.permuted_columns(&perm),
        }
    }
}

/// Compute, per cluster and label, the fraction of the cluster's members
/// (outliers included) that carry the label.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::LengthMismatch`] | `design` has a different number of rows than `assignment` |
#[instrument(skip_all, fields(n = assignment.len(), n_labels = design.n_cols()))]
pub fn summarize(assignment: &ClusterAssignment, design: &DesignMatrix) -> Result<LabelSummary, ClusterError> {
    if design.n_rows() != assignment.len() {
        return Err(ClusterError::LengthMismatch {
            what: "design matrix",
            expected: assignment.len(),
            got: design.n_rows(),
        });
    }

    let n_labels = design.n_cols();
    let all_sizes = assignment.cluster_sizes();
    let mut counts = vec![vec![0usize; n_labels]; all_sizes.len()];
    for (i, m) in assignment.iter().enumerate() {
        for (c, &flag) in counts[m.cluster.index()].iter_mut().zip(design.row(i)) {
            *c += usize::from(flag);
        }
    }

    let mut clusters = Vec::new();
    let mut sizes = Vec::new();
    let mut percentages = Vec::new();
    for (idx, (&size, row)) in all_sizes.iter().zip(&counts).enumerate() {
        if size == 0 {
            continue;
        }
        clusters.push(ClusterId::from_index(idx));
        sizes.push(size);
        percentages.push(row.iter().map(|&c| c as f64 / size as f64).collect());
    }
    debug!(n_clusters = clusters.len(), "label summary computed");

    Ok(LabelSummary {
        clusters,
        sizes,
        columns: (0..n_labels).collect(),
        percentages,
        design: design.clone(),
    })
}
