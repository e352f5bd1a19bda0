//! Matrix preprocessing: sentinel repair, range compression, zero-alignment,
//! variance-driven reduction and label concatenation.

use tracing::{debug, info, instrument};

use crate::builder::ValueRange;
use crate::error::SeriesError;
use crate::labels::DesignMatrix;
use crate::matrix::{FeatureMatrix, ObservedMask};
use crate::mode::{AlgorithmHint, LabelEncoding, SimilarityMode};
use crate::pca::reduce_to_variance;
use crate::stats::median;

/// Variance retained ahead of density clustering when rows are zero-aligned.
pub const ALIGNED_VARIANCE_TARGET: f64 = 0.75;
/// Variance retained ahead of density clustering otherwise.
pub const RAW_VARIANCE_TARGET: f64 = 0.85;

/// Replace every unobserved cell with the median of the observed values in
/// its row.
///
/// Observed cells are never touched, whatever their value. A row with no
/// observed cells has nothing to repair from and is left as is.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SeriesError::MaskShapeMismatch`] | `observed` has a different shape than `matrix` |
pub fn fill_with_median(matrix: &FeatureMatrix, observed: &ObservedMask) -> Result<FeatureMatrix, SeriesError> {
    if !observed.fits(matrix) {
        return Err(SeriesError::MaskShapeMismatch {
            mask_rows: observed.n_rows(),
            mask_cols: observed.n_cols(),
            rows: matrix.n_rows(),
            cols: matrix.n_cols(),
        });
    }
    let mut i = 0usize;
    Ok(matrix.map_rows(|row| {
        let flags = observed.row(i);
        i += 1;
        let present: Vec<f64> = row
            .iter()
            .zip(flags)
            .filter_map(|(&v, &seen)| seen.then_some(v))
            .collect();
        match median(&present) {
            Some(m) if present.len() < row.len() => row
                .iter()
                .zip(flags)
                .map(|(&v, &seen)| if seen { v } else { m })
                .collect(),
            _ => row.to_vec(),
        }
    }))
}

/// Rescale every cell linearly from `range` into `[0, 10]`.
#[must_use = "returns a new matrix; the input is unchanged"]
pub fn compress_range(matrix: &FeatureMatrix, range: ValueRange) -> FeatureMatrix {
    matrix.map_rows(|row| row.iter().map(|&v| range.scale_to_ten(v)).collect())
}

/// Shift every row so its minimum becomes zero.
///
/// Removes absolute-level differences while preserving shape. Applying it to
/// a matrix whose rows already bottom out at zero changes nothing.
#[must_use = "returns a new matrix; the input is unchanged"]
pub fn zero_align(matrix: &FeatureMatrix) -> FeatureMatrix {
    matrix.map_rows(|row| {
        let row_min = row.iter().copied().fold(f64::INFINITY, f64::min);
        row.iter().map(|&v| v - row_min).collect()
    })
}

/// Append the design-matrix columns to `matrix`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SeriesError::RowCountMismatch`] | The matrices describe different numbers of series |
pub fn append_labels(matrix: &FeatureMatrix, design: &DesignMatrix) -> Result<FeatureMatrix, SeriesError> {
    if matrix.n_rows() != design.n_rows() {
        return Err(SeriesError::RowCountMismatch {
            features: matrix.n_rows(),
            design: design.n_rows(),
        });
    }
    let mut i = 0usize;
    Ok(matrix.map_rows(|row| {
        let mut out = Vec::with_capacity(row.len() + design.n_cols());
        out.extend_from_slice(row);
        out.extend(design.row(i).iter().map(|&f| f64::from(f)));
        i += 1;
        out
    }))
}

/// Configurable preprocessing pipeline.
///
/// Steps run in a fixed order: sentinel repair, range compression (when a
/// range is supplied), zero-alignment (correlation mode), variance-driven
/// reduction (density clustering only) and label concatenation (one-hot
/// encoding). The input matrix is never modified.
///
/// # Defaults
///
/// | Parameter        | Default                     |
/// |------------------|-----------------------------|
/// | `similarity`     | `SimilarityMode::Proximity` |
/// | `encoding`       | `LabelEncoding::None`       |
/// | `hint`           | `AlgorithmHint::Partition`  |
/// | `compress_range` | `None`                      |
#[derive(Debug, Clone)]
pub struct Preprocessor {
    similarity: SimilarityMode,
    encoding: LabelEncoding,
    hint: AlgorithmHint,
    compress_range: Option<ValueRange>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Create a preprocessor with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            similarity: SimilarityMode::Proximity,
            encoding: LabelEncoding::None,
            hint: AlgorithmHint::Partition,
            compress_range: None,
        }
    }

    /// Set the similarity mode.
    #[must_use]
    pub fn with_similarity(mut self, similarity: SimilarityMode) -> Self {
        self.similarity = similarity;
        self
    }

    /// Set the label encoding.
    #[must_use]
    pub fn with_encoding(mut self, encoding: LabelEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Set the family of algorithm the output feeds.
    #[must_use]
    pub fn with_algorithm_hint(mut self, hint: AlgorithmHint) -> Self {
        self.hint = hint;
        self
    }

    /// Rescale samples into `[0, 10]` using the scan's global range.
    #[must_use]
    pub fn with_range_compression(mut self, range: Option<ValueRange>) -> Self {
        self.compress_range = range;
        self
    }

    /// Return the similarity mode.
    #[must_use]
    pub fn similarity(&self) -> SimilarityMode {
        self.similarity
    }

    /// Return the label encoding.
    #[must_use]
    pub fn encoding(&self) -> LabelEncoding {
        self.encoding
    }

    /// Return the algorithm hint.
    #[must_use]
    pub fn algorithm_hint(&self) -> AlgorithmHint {
        self.hint
    }

    /// Variance fraction kept by reduction, or `None` when reduction is off.
    #[must_use]
    pub fn variance_target(&self) -> Option<f64> {
        match (self.hint, self.similarity) {
            (AlgorithmHint::Partition, _) => None,
            (AlgorithmHint::Density, SimilarityMode::Correlation) => Some(ALIGNED_VARIANCE_TARGET),
            (AlgorithmHint::Density, SimilarityMode::Proximity) => Some(RAW_VARIANCE_TARGET),
        }
    }

    /// Run the pipeline on `matrix`, repairing the cells `observed` marks as
    /// missing and taking label columns from `design`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SeriesError::MaskShapeMismatch`] | `observed` has a different shape than `matrix` |
    /// | [`SeriesError::RowCountMismatch`] | One-hot encoding with a design matrix of the wrong height |
    #[instrument(skip_all, fields(
        similarity = %self.similarity,
        encoding = %self.encoding,
        hint = ?self.hint,
        n = matrix.n_rows()
    ))]
    pub fn apply(
        &self,
        matrix: &FeatureMatrix,
        observed: &ObservedMask,
        design: &DesignMatrix,
    ) -> Result<FeatureMatrix, SeriesError> {
        let mut out = fill_with_median(matrix, observed)?;
        debug!(n_missing = observed.n_missing(), "missing samples repaired");

        if let Some(range) = self.compress_range {
            out = compress_range(&out, range);
            debug!(min = range.min, max = range.max, "range compressed");
        }

        if self.similarity == SimilarityMode::Correlation {
            out = zero_align(&out);
            debug!("rows zero-aligned");
        }

        if let Some(target) = self.variance_target() {
            out = reduce_to_variance(&out, target)?;
            debug!(target, n_components = out.n_cols(), "variance reduction applied");
        }

        if self.encoding == LabelEncoding::OneHot {
            out = append_labels(&out, design)?;
            debug!(n_labels = design.n_cols(), "label columns appended");
        }

        info!(n_rows = out.n_rows(), n_cols = out.n_cols(), "preprocessing complete");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn median_fill_replaces_sentinels() {
        let data = m(vec![
            vec![1.883, 2.9374874, 3.927837, -1.0],
            vec![5.282929, -1.0, 4.28983738, 3.98198],
            vec![8.982978738, 5.9289227, 0.0, 3.938383],
            vec![-1.0, 3.9998, 4.929278, 4.9389],
        ]);
        let filled = fill_with_median(&data, &ObservedMask::from_sentinels(&data)).unwrap();
        assert_eq!(
            filled.to_rows(),
            vec![
                vec![1.883, 2.9374874, 3.927837, 2.9374874],
                vec![5.282929, 4.28983738, 4.28983738, 3.98198],
                vec![8.982978738, 5.9289227, 0.0, 3.938383],
                vec![4.929278, 3.9998, 4.929278, 4.9389],
            ]
        );
    }

    #[test]
    fn median_fill_keeps_observed_minus_one() {
        let data = m(vec![vec![-1.0, 4.0, 8.0], vec![2.0, -1.0, 6.0]]);
        let observed = ObservedMask::from_raw(2, 3, vec![true, true, true, true, false, true]);
        let filled = fill_with_median(&data, &observed).unwrap();
        assert_eq!(filled.row(0), &[-1.0, 4.0, 8.0]);
        assert_eq!(filled.row(1), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn median_fill_rejects_mask_of_wrong_shape() {
        let data = m(vec![vec![1.0, 2.0]]);
        assert!(matches!(
            fill_with_median(&data, &ObservedMask::full(1, 3)),
            Err(SeriesError::MaskShapeMismatch { mask_cols: 3, cols: 2, .. })
        ));
    }

    #[test]
    fn zero_align_shifts_rows_to_zero_floor() {
        let data = m(vec![
            vec![1.0, 3.0, -1.0],
            vec![5.0, 1.0, 4.0],
            vec![8.0, 5.0, 0.0],
        ]);
        let aligned = zero_align(&data);
        assert_eq!(
            aligned.to_rows(),
            vec![vec![2.0, 4.0, 0.0], vec![4.0, 0.0, 3.0], vec![8.0, 5.0, 0.0]]
        );
    }

    #[test]
    fn zero_align_idempotent_on_zero_floor() {
        let data = m(vec![vec![1.883, 2.9374874, 3.927837, 0.0], vec![0.0, 3.9998, 4.929278, 4.9389]]);
        assert_eq!(zero_align(&data), data);
        assert_eq!(zero_align(&zero_align(&data)), data);
    }

    #[test]
    fn append_labels_widens() {
        let data = m(vec![vec![1.0, -1.0], vec![5.0, 3.0]]);
        let design = DesignMatrix::from_rows(&[vec![0, 1], vec![1, 0]]);
        let out = append_labels(&data, &design).unwrap();
        assert_eq!(out.to_rows(), vec![vec![1.0, -1.0, 0.0, 1.0], vec![5.0, 3.0, 1.0, 0.0]]);
    }

    #[test]
    fn append_labels_rejects_height_mismatch() {
        let data = m(vec![vec![1.0]]);
        let design = DesignMatrix::from_rows(&[vec![0], vec![1]]);
        assert!(matches!(
            append_labels(&data, &design),
            Err(SeriesError::RowCountMismatch { features: 1, design: 2 })
        ));
    }

    #[test]
    fn compress_range_maps_into_ten() {
        let data = m(vec![vec![5.0, 100.0], vec![9.0, 52.5]]);
        let out = compress_range(&data, ValueRange { min: 5.0, max: 100.0 });
        assert_eq!(out.row(0), &[0.0, 10.0]);
        assert!((out.get(1, 0) - 40.0 / 95.0).abs() < 1e-12);
        assert!((out.get(1, 1) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn one_hot_correlation_pipeline() {
        let data = m(vec![vec![0.0, -1.0], vec![0.0, 10.0], vec![0.0, 10.0], vec![0.0, 10.0]]);
        let design = DesignMatrix::from_rows(&[vec![0], vec![1], vec![1], vec![1]]);
        let out = Preprocessor::new()
            .with_similarity(SimilarityMode::Correlation)
            .with_encoding(LabelEncoding::OneHot)
            .apply(&data, &ObservedMask::from_sentinels(&data), &design)
            .unwrap();
        // The lone sentinel is repaired to the row median (0) before alignment.
        assert_eq!(
            out.to_rows(),
            vec![vec![0.0, 0.0, 0.0], vec![0.0, 10.0, 1.0], vec![0.0, 10.0, 1.0], vec![0.0, 10.0, 1.0]]
        );
    }

    #[test]
    fn proximity_none_only_repairs() {
        let data = m(vec![vec![2.0, 4.0], vec![6.0, 8.0]]);
        let design = DesignMatrix::zeros(2, 0);
        let out = Preprocessor::new()
            .apply(&data, &ObservedMask::full(2, 2), &design)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn reduction_only_for_density() {
        let p = Preprocessor::new().with_similarity(SimilarityMode::Correlation);
        assert_eq!(p.variance_target(), None);
        let p = p.with_algorithm_hint(AlgorithmHint::Density);
        assert_eq!(p.variance_target(), Some(ALIGNED_VARIANCE_TARGET));
        let p = p.with_similarity(SimilarityMode::Proximity);
        assert_eq!(p.variance_target(), Some(RAW_VARIANCE_TARGET));
    }

    #[test]
    fn density_reduction_never_sees_labels() {
        let data = m(vec![
            vec![0.0, 0.0, 0.0],
            vec![1.0, 2.0, 3.0],
            vec![2.0, 4.0, 6.0],
            vec![3.0, 6.0, 9.0],
        ]);
        let design = DesignMatrix::from_rows(&[vec![1, 0], vec![1, 0], vec![0, 1], vec![0, 1]]);
        let out = Preprocessor::new()
            .with_algorithm_hint(AlgorithmHint::Density)
            .with_encoding(LabelEncoding::OneHot)
            .apply(&data, &ObservedMask::full(4, 3), &design)
            .unwrap();
        // One principal component plus the two untouched label columns.
        assert_eq!(out.n_cols(), 3);
        assert_eq!(out.get(0, 1), 1.0);
        assert_eq!(out.get(3, 2), 1.0);
    }
}
