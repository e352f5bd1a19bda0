use std::fmt;

use crate::error::ClusterError;

/// A cluster identifier. Ids start at 1; zero is never a cluster because a
/// negated zero could not carry the outlier flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(usize);

impl ClusterId {
    /// Create an id from a zero-based cluster index.
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index + 1)
    }

    /// Create an id from its 1-based value, or `None` for zero.
    #[must_use]
    pub fn new(id: usize) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Return the 1-based id.
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }

    /// Return the zero-based cluster index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One series' place in a clustering: its cluster and whether it was flagged
/// as an outlier of that cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Membership {
    /// Cluster the series belongs to.
    pub cluster: ClusterId,
    /// True if the series lies beyond the outlier threshold.
    pub outlier: bool,
}

impl Membership {
    /// Signed encoding: the cluster id, negated for outliers.
    #[must_use]
    pub fn signed(self) -> i64 {
        let id = self.cluster.get() as i64;
        if self.outlier { -id } else { id }
    }
}

/// Cluster membership of every series, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    members: Vec<Membership>,
}

impl ClusterAssignment {
    /// Build an assignment with no outliers from zero-based cluster indices.
    #[must_use]
    pub fn from_indices(indices: &[usize]) -> Self {
        Self {
            members: indices
                .iter()
                .map(|&c| Membership { cluster: ClusterId::from_index(c), outlier: false })
                .collect(),
        }
    }

    /// Decode a signed assignment vector.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::ZeroClusterId`] | An entry is zero |
    pub fn from_signed(signed: &[i64]) -> Result<Self, ClusterError> {
        let members = signed
            .iter()
            .enumerate()
            .map(|(index, &s)| {
                let cluster = ClusterId::new(s.unsigned_abs() as usize)
                    .ok_or(ClusterError::ZeroClusterId { index })?;
                Ok(Membership { cluster, outlier: s < 0 })
            })
            .collect::<Result<_, ClusterError>>()?;
        Ok(Self { members })
    }

    /// Return the number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Return true if no series are assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Return the membership of series `i`.
    #[must_use]
    pub fn get(&self, i: usize) -> Membership {
        self.members[i]
    }

    /// Iterate over memberships in series order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Membership> + '_ {
        self.members.iter()
    }

    /// Encode as signed ids: positive for members, negated for outliers.
    #[must_use]
    pub fn to_signed(&self) -> Vec<i64> {
        self.members.iter().map(|m| m.signed()).collect()
    }

    /// Return the largest cluster id, or 0 when empty.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.members.iter().map(|m| m.cluster.get()).max().unwrap_or(0)
    }

    /// Return the number of series in each cluster, indexed by zero-based
    /// cluster index. Outliers count toward their cluster.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_clusters()];
        for m in &self.members {
            sizes[m.cluster.index()] += 1;
        }
        sizes
    }

    /// Return the number of flagged outliers.
    #[must_use]
    pub fn n_outliers(&self) -> usize {
        self.members.iter().filter(|m| m.outlier).count()
    }

    /// Return the indices of all series in `cluster`, outliers included.
    #[must_use]
    pub fn members_of(&self, cluster: ClusterId) -> Vec<usize> {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(i, m)| (m.cluster == cluster).then_some(i))
            .collect()
    }

    /// Return a copy with the outlier flag of every series set from `flags`.
    pub(crate) fn with_outlier_flags(&self, flags: impl IntoIterator<Item = bool>) -> Self {
        Self {
            members: self
                .members
                .iter()
                .zip(flags)
                .map(|(m, outlier)| Membership { cluster: m.cluster, outlier })
                .collect(),
        }
    }
}
