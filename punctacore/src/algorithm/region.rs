use crate::data::image::{IntensityImage, RowRange};
use crate::error::ProfileError;

/// Column-wise arithmetic mean over the union of rows spanned by the given
/// inclusive row ranges.
///
/// Rows from all ranges are pooled into a single set before averaging, so for
/// the background band the result is a mean over the union of pixels, not a
/// mean of two per-range means. The two conventions only agree when the
/// ranges hold equal row counts.
///
/// # Arguments
///
/// * `image` - The intensity image to sample.
/// * `ranges` - Disjoint inclusive row ranges to pool.
///
/// # Example
///
/// ```rust
/// # use punctacore::data::image::{IntensityImage, RowRange};
/// # use punctacore::algorithm::region::column_means;
/// let image = IntensityImage::from_row_major(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let means = column_means(&image, &[RowRange::new(0, 1)]).unwrap();
/// assert_eq!(means, vec![2.0, 3.0]);
/// ```
pub fn column_means(
    image: &IntensityImage,
    ranges: &[RowRange],
) -> Result<Vec<f64>, ProfileError> {
    for range in ranges {
        if range.is_empty() {
            return Err(ProfileError::InvalidRange(format!(
                "range {}..={} is empty",
                range.start, range.end
            )));
        }
        if range.end >= image.nrows() {
            return Err(ProfileError::InvalidRange(format!(
                "range {}..={} does not fit an image with {} rows",
                range.start,
                range.end,
                image.nrows()
            )));
        }
    }
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if a.overlaps(b) {
                return Err(ProfileError::InvalidRange(format!(
                    "ranges {}..={} and {}..={} overlap",
                    a.start, a.end, b.start, b.end
                )));
            }
        }
    }

    let row_count: usize = ranges.iter().map(|r| r.len()).sum();
    if row_count == 0 {
        return Err(ProfileError::InvalidRange(
            "no rows selected".to_string(),
        ));
    }

    let mut sums = vec![0.0; image.ncols()];
    for range in ranges {
        for row in range.start..=range.end {
            for (col, sum) in sums.iter_mut().enumerate() {
                *sum += image.data[(row, col)];
            }
        }
    }
    Ok(sums.into_iter().map(|s| s / row_count as f64).collect())
}

/// Background-subtracted column difference, `neurite[i] - background[i]`,
/// without clamping. The zero-clamped signal is derived from this by the
/// profile builder; the unclamped difference is what the normalized profiles
/// are computed from.
pub fn subtract_background(
    neurite: &[f64],
    background: &[f64],
) -> Result<Vec<f64>, ProfileError> {
    if neurite.len() != background.len() {
        return Err(ProfileError::DimensionMismatch {
            left: neurite.len(),
            right: background.len(),
        });
    }
    Ok(neurite
        .iter()
        .zip(background.iter())
        .map(|(n, b)| n - b)
        .collect())
}
