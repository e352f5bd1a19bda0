//! Robust summary statistics.

/// Median of `values`, or `None` when empty.
///
/// Even-length input averages the two middle values.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Coordinate-wise median of a set of equal-length rows.
///
/// Returns `None` when `rows` is empty.
#[must_use]
pub fn coordinate_median<'a, I>(rows: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let rows: Vec<&[f64]> = rows.into_iter().collect();
    let n_cols = rows.first()?.len();
    let mut column = Vec::with_capacity(rows.len());
    let mut out = Vec::with_capacity(n_cols);
    for c in 0..n_cols {
        column.clear();
        column.extend(rows.iter().map(|r| r[c]));
        out.push(median(&column)?);
    }
    Some(out)
}
