//! Variance-driven principal component projection.
//!
//! The centred matrix is decomposed through whichever of the covariance
//! (`d x d`) or Gram (`n x n`) matrix is smaller. Both routes give the same
//! component scores up to sign.

use nalgebra::{DMatrix, SymmetricEigen};
use tracing::{debug, instrument};

use crate::error::SeriesError;
use crate::matrix::FeatureMatrix;

/// Eigen-decompose a symmetric matrix.
///
/// Returns eigenvalues (negative round-off clamped to zero) and the matching
/// eigenvectors as columns, sorted by descending eigenvalue.
fn sorted_eigen(a: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let eigen = SymmetricEigen::new(a);
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));
    let values = order.iter().map(|&i| eigen.eigenvalues[i].max(0.0)).collect();
    let vectors = DMatrix::from_fn(eigen.eigenvectors.nrows(), order.len(), |r, c| {
        eigen.eigenvectors[(r, order[c])]
    });
    (values, vectors)
}

/// Smallest component count whose cumulative variance reaches `target`.
fn components_for(values: &[f64], target: f64) -> usize {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 1;
    }
    let mut cumulative = 0.0;
    for (i, v) in values.iter().enumerate() {
        cumulative += v;
        if cumulative / total >= target - 1e-12 {
            return i + 1;
        }
    }
    values.len().max(1)
}

/// Project `matrix` onto the fewest principal components that retain at
/// least `target` of its variance.
///
/// The output has one row per input row and between 1 and
/// `min(n_rows, n_cols)` columns. A matrix with no variance collapses to a
/// single all-zero column.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SeriesError::InvalidVarianceTarget`] | `target` is not in `(0, 1]` |
#[instrument(skip(matrix), fields(n = matrix.n_rows(), d = matrix.n_cols()))]
pub fn reduce_to_variance(matrix: &FeatureMatrix, target: f64) -> Result<FeatureMatrix, SeriesError> {
    if !(target > 0.0 && target <= 1.0) {
        return Err(SeriesError::InvalidVarianceTarget { target });
    }
    let n = matrix.n_rows();
    let d = matrix.n_cols();
    if n == 0 || d == 0 {
        return Ok(matrix.clone());
    }

    let means: Vec<f64> = (0..d)
        .map(|c| matrix.rows().map(|r| r[c]).sum::<f64>() / n as f64)
        .collect();
    let centred: Vec<f64> = matrix
        .rows()
        .flat_map(|r| r.iter().zip(&means).map(|(x, m)| x - m))
        .collect();
    let x = DMatrix::from_row_slice(n, d, &centred);

    let scores = if d <= n {
        let (values, vectors) = sorted_eigen(x.transpose() * &x);
        let kept = components_for(&values, target);
        debug!(kept, route = "covariance", "components selected");
        &x * vectors.columns(0, kept)
    } else {
        let (values, vectors) = sorted_eigen(&x * x.transpose());
        let kept = components_for(&values, target);
        debug!(kept, route = "gram", "components selected");
        let mut scores = vectors.columns(0, kept).into_owned();
        for (c, lambda) in values[..kept].iter().enumerate() {
            scores.column_mut(c).scale_mut(lambda.sqrt());
        }
        scores
    };

    FeatureMatrix::from_rows(
        scores
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect(),
    )
}
