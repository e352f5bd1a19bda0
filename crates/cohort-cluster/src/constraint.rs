//! Pairwise must-link / cannot-link constraints derived from label patterns.
//!
//! Series are grouped by their exact design-matrix row. For every distinct
//! pattern one random representative is paired with a random member of a
//! randomly chosen common pattern: same pattern gives a must-link edge,
//! different patterns give a cannot-link edge. Most series stay
//! unconstrained.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use cohort_series::DesignMatrix;

use crate::error::ClusterError;

/// Symmetric, self-loop free must-link and cannot-link relations over series
/// indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    must_link: BTreeMap<usize, BTreeSet<usize>>,
    cannot_link: BTreeMap<usize, BTreeSet<usize>>,
}

fn link(map: &mut BTreeMap<usize, BTreeSet<usize>>, a: usize, b: usize) {
    if a == b {
        return;
    }
    map.entry(a).or_default().insert(b);
    map.entry(b).or_default().insert(a);
}

fn pair_count(map: &BTreeMap<usize, BTreeSet<usize>>) -> usize {
    map.values().map(BTreeSet::len).sum::<usize>() / 2
}

impl ConstraintSet {
    /// Create an empty constraint set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `a` and `b` to share a cluster. Self-pairs are ignored.
    pub fn add_must_link(&mut self, a: usize, b: usize) {
        link(&mut self.must_link, a, b);
    }

    /// Forbid `a` and `b` from sharing a cluster. Self-pairs are ignored.
    pub fn add_cannot_link(&mut self, a: usize, b: usize) {
        link(&mut self.cannot_link, a, b);
    }

    /// Series that must share a cluster with `i`.
    pub fn must_link(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.must_link.get(&i).into_iter().flatten().copied()
    }

    /// Series that must not share a cluster with `i`.
    pub fn cannot_link(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.cannot_link.get(&i).into_iter().flatten().copied()
    }

    /// Return the number of distinct must-link pairs.
    #[must_use]
    pub fn n_must_link(&self) -> usize {
        pair_count(&self.must_link)
    }

    /// Return the number of distinct cannot-link pairs.
    #[must_use]
    pub fn n_cannot_link(&self) -> usize {
        pair_count(&self.cannot_link)
    }

    /// Return true if there are no constraints at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must_link.is_empty() && self.cannot_link.is_empty()
    }

    /// Return true if placing series `i` in `cluster` breaks a constraint
    /// against a series already placed in `placed`.
    pub(crate) fn violates(&self, i: usize, cluster: usize, placed: &[Option<usize>]) -> bool {
        self.must_link(i)
            .any(|j| placed[j].is_some_and(|c| c != cluster))
            || self.cannot_link(i).any(|j| placed[j] == Some(cluster))
    }
}

/// Configuration for deriving constraints from a design matrix.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `common_fraction` | 0.03    |
/// | `seed`            | 42      |
#[derive(Debug, Clone)]
pub struct ConstraintConfig {
    common_fraction: f64,
    seed: u64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self { common_fraction: 0.03, seed: 42 }
    }
}

impl ConstraintConfig {
    /// Create a configuration where a pattern is common once more than
    /// `common_fraction` of all series carry it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidThreshold`] | `common_fraction` is not in `[0, 1)` |
    pub fn new(common_fraction: f64) -> Result<Self, ClusterError> {
        if !(0.0..1.0).contains(&common_fraction) {
            return Err(ClusterError::InvalidThreshold {
                name: "common_fraction",
                value: common_fraction,
                expected: "in [0, 1)",
            });
        }
        Ok(Self { common_fraction, ..Self::default() })
    }

    /// Set the seed for representative sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the common-pattern fraction.
    #[must_use]
    pub fn common_fraction(&self) -> f64 {
        self.common_fraction
    }

    /// Return the sampling seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Derive constraints from `design` with a generator seeded from
    /// [`seed`](Self::seed).
    #[must_use]
    pub fn build(&self, design: &DesignMatrix) -> ConstraintSet {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.build_with_rng(design, &mut rng)
    }

    /// Derive constraints from `design`, drawing from `rng`.
    #[instrument(skip_all, fields(n = design.n_rows(), common_fraction = self.common_fraction))]
    pub fn build_with_rng(&self, design: &DesignMatrix, rng: &mut ChaCha8Rng) -> ConstraintSet {
        // Patterns in first-seen order, each with its member indices.
        let mut pattern_index: HashMap<&[u8], usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, row) in design.rows().enumerate() {
            let g = *pattern_index.entry(row).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(i);
        }

        let cutoff = self.common_fraction * design.n_rows() as f64;
        let common: Vec<usize> = (0..groups.len())
            .filter(|&g| groups[g].len() as f64 > cutoff)
            .collect();
        debug!(n_patterns = groups.len(), n_common = common.len(), "patterns grouped");

        let mut constraints = ConstraintSet::new();
        if common.is_empty() {
            info!("no common label pattern; no constraints derived");
            return constraints;
        }

        for (g, members) in groups.iter().enumerate() {
            let a = members[rng.gen_range(0..members.len())];
            let other = common[rng.gen_range(0..common.len())];
            let b = groups[other][rng.gen_range(0..groups[other].len())];
            if g == other {
                constraints.add_must_link(a, b);
            } else {
                constraints.add_cannot_link(a, b);
            }
        }

        info!(
            must_link = constraints.n_must_link(),
            cannot_link = constraints.n_cannot_link(),
            "constraints derived"
        );
        constraints
    }
}
