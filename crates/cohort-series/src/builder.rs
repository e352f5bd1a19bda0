//! Turns ragged, differently-dated series into an aligned numeric matrix plus
//! the label dictionary and design matrix describing their context.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument};

use crate::error::SeriesError;
use crate::labels::{DesignMatrix, LabelDictionary};
use crate::matrix::{FeatureMatrix, ObservedMask, SENTINEL};
use crate::series::Series;

/// Labels held by this many series or fewer carry no grouping signal.
const MIN_LABEL_SERIES: usize = 2;

/// Global minimum and maximum sample value seen during the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Smallest observed sample.
    pub min: f64,
    /// Largest observed sample.
    pub max: f64,
}

impl ValueRange {
    fn including(self, value: f64) -> Self {
        Self {
            min: self.min.min(value),
            max: self.max.max(value),
        }
    }

    /// Rescale `value` linearly from `[min, max]` into `[0, 10]`.
    ///
    /// A degenerate range (`min == max`) maps every value to 0.
    #[must_use]
    pub fn scale_to_ten(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.0;
        }
        (value - self.min) * 10.0 / span
    }
}

/// Output of [`MatrixBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltMatrix {
    /// One row per series, one column per distinct timestamp. Missing samples
    /// hold [`SENTINEL`].
    pub matrix: FeatureMatrix,
    /// Which cells of `matrix` hold a real sample.
    pub observed: ObservedMask,
    /// Informative label values and their column positions.
    pub dictionary: LabelDictionary,
    /// Which series carry which dictionary label.
    pub design: DesignMatrix,
    /// Timestamp for each matrix column, in first-seen order.
    pub timestamps: Vec<String>,
    /// Global sample range, used by range compression.
    pub range: ValueRange,
}

/// Immutable summary produced by folding over every series once.
#[derive(Debug, Default)]
struct Scan {
    timestamps: Vec<String>,
    timestamp_index: HashMap<String, usize>,
    label_order: Vec<String>,
    label_series: HashMap<String, usize>,
    range: Option<ValueRange>,
}

impl Scan {
    /// Fold one series into the summary, returning the extended summary.
    fn absorb(mut self, index: usize, series: &Series, key: Option<&str>) -> Result<Self, SeriesError> {
        if series.samples().is_empty() {
            return Err(SeriesError::EmptySeries { index });
        }
        for (pos, sample) in series.samples().iter().enumerate() {
            if !sample.value.is_finite() {
                return Err(SeriesError::NonFiniteValue { series: index, sample: pos });
            }
            if !self.timestamp_index.contains_key(&sample.timestamp) {
                self.timestamp_index
                    .insert(sample.timestamp.clone(), self.timestamps.len());
                self.timestamps.push(sample.timestamp.clone());
            }
            self.range = Some(match self.range {
                None => ValueRange { min: sample.value, max: sample.value },
                Some(r) => r.including(sample.value),
            });
        }

        // Count each value once per series, whatever key it sits under.
        let mut seen_here: HashSet<&str> = HashSet::new();
        for value in series.label_values(key) {
            if !seen_here.insert(value) {
                continue;
            }
            match self.label_series.get_mut(value) {
                Some(count) => *count += 1,
                None => {
                    self.label_series.insert(value.to_string(), 1);
                    self.label_order.push(value.to_string());
                }
            }
        }
        Ok(self)
    }
}

/// Builds the aligned matrix, label dictionary and design matrix for one request.
///
/// By default only label values held by more than two series and fewer than
/// all series enter the dictionary. Restricting to a single label key keeps
/// every value stored under that key instead.
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    restrict_key: Option<String>,
}

impl MatrixBuilder {
    /// Create a builder that considers labels under every key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only consider label values stored under `key`, and drop the cardinality
    /// filter.
    #[must_use]
    pub fn with_restrict_key(mut self, key: Option<String>) -> Self {
        self.restrict_key = key;
        self
    }

    /// Return the label key the dictionary is restricted to, if any.
    #[must_use]
    pub fn restrict_key(&self) -> Option<&str> {
        self.restrict_key.as_deref()
    }

    /// Build the matrix for `series`.
    ///
    /// Column positions follow the first appearance of each timestamp across a
    /// single pass over the collection. Missing cells render as [`SENTINEL`]
    /// and are recorded in [`BuiltMatrix::observed`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::EmptyCollection`] | `series` is empty |
    /// | [`SeriesError::EmptySeries`] | A series has zero samples |
    /// | [`SeriesError::NonFiniteValue`] | A sample is NaN or infinite |
    #[instrument(skip_all, fields(n_series = series.len(), restrict_key = ?self.restrict_key))]
    pub fn build(&self, series: &[Series]) -> Result<BuiltMatrix, SeriesError> {
        if series.is_empty() {
            return Err(SeriesError::EmptyCollection);
        }
        let key = self.restrict_key.as_deref();

        let scan = series
            .iter()
            .enumerate()
            .try_fold(Scan::default(), |scan, (i, s)| scan.absorb(i, s, key))?;
        debug!(
            n_timestamps = scan.timestamps.len(),
            n_label_values = scan.label_order.len(),
            "scan complete"
        );

        let n = series.len();
        let informative = scan.label_order.iter().filter(|value| {
            let count = scan.label_series[value.as_str()];
            key.is_some() || (count > MIN_LABEL_SERIES && count < n)
        });
        let dictionary = LabelDictionary::from_values(informative.cloned());

        let n_cols = scan.timestamps.len();
        let mut data = Vec::with_capacity(n * n_cols);
        let mut observed = vec![false; n * n_cols];
        let mut design = DesignMatrix::zeros(n, dictionary.len());
        for (i, s) in series.iter().enumerate() {
            let mut row = vec![SENTINEL; n_cols];
            for sample in s.samples() {
                let col = scan.timestamp_index[&sample.timestamp];
                row[col] = sample.value;
                observed[i * n_cols + col] = true;
            }
            data.extend(row);

            for value in s.label_values(key) {
                if let Some(col) = dictionary.column(value) {
                    design.set(i, col);
                }
            }
        }

        // Non-empty series guarantee at least one sample was seen.
        let range = scan.range.unwrap_or(ValueRange { min: 0.0, max: 0.0 });

        let observed = ObservedMask::from_raw(n, n_cols, observed);
        info!(
            n_series = n,
            n_timestamps = n_cols,
            n_missing = observed.n_missing(),
            n_labels = dictionary.len(),
            "matrix built"
        );

        Ok(BuiltMatrix {
            matrix: FeatureMatrix::from_raw(n, n_cols, data),
            observed,
            dictionary,
            design,
            timestamps: scan.timestamps,
            range,
        })
    }
}
