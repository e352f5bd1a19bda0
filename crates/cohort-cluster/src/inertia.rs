use std::cmp::Ordering;
use std::fmt;

/// Sum of squared Euclidean distances from each row to its assigned centroid.
///
/// Lower inertia indicates tighter clusters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Inertia(f64);

impl Inertia {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw inertia value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Inertia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
