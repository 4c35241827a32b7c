use nalgebra::DMatrix;

use crate::error::ProfileError;

/// Inclusive row-index range `[start, end]` into an intensity image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        RowRange { start, end }
    }

    /// Number of rows spanned by the range.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn overlaps(&self, other: &RowRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Spatial band configuration for one neurite image: exactly two background
/// ranges flanking one neurite range.
///
/// Validated on construction: the ranges must be well formed, pairwise
/// disjoint, and ordered so that the neurite range lies strictly between the
/// two background ranges. Bounds against a concrete image are checked when
/// rows are extracted, since the band layout is fixed per run while images
/// may vary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandSpec {
    pub background: [RowRange; 2],
    pub neurite: RowRange,
}

impl BandSpec {
    pub fn new(background: [RowRange; 2], neurite: RowRange) -> Result<Self, ProfileError> {
        for range in background.iter().chain(std::iter::once(&neurite)) {
            if range.is_empty() {
                return Err(ProfileError::InvalidRange(format!(
                    "range {}..={} is empty",
                    range.start, range.end
                )));
            }
        }
        if background[0].overlaps(&neurite)
            || background[1].overlaps(&neurite)
            || background[0].overlaps(&background[1])
        {
            return Err(ProfileError::InvalidRange(
                "band ranges overlap".to_string(),
            ));
        }
        if !(background[0].end < neurite.start && neurite.end < background[1].start) {
            return Err(ProfileError::InvalidRange(
                "neurite range must lie strictly between the two background ranges".to_string(),
            ));
        }
        Ok(BandSpec { background, neurite })
    }

    /// Highest row index touched by any band.
    pub fn max_row(&self) -> usize {
        self.background[1].end
    }
}

/// Immutable 2D intensity image: rows are spatial positions across the bands,
/// columns are distance along the neurite axis.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityImage {
    pub data: DMatrix<f64>,
}

impl IntensityImage {
    /// Builds an image from row-major samples.
    ///
    /// # Arguments
    ///
    /// * `rows` - Number of image rows.
    /// * `cols` - Number of image columns.
    /// * `samples` - Row-major pixel intensities, `rows * cols` values.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use punctacore::data::image::IntensityImage;
    /// let image = IntensityImage::from_row_major(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    /// assert_eq!(image.nrows(), 2);
    /// assert_eq!(image.ncols(), 3);
    /// assert_eq!(image.data[(1, 2)], 5.0);
    /// ```
    pub fn from_row_major(
        rows: usize,
        cols: usize,
        samples: Vec<f64>,
    ) -> Result<Self, ProfileError> {
        if samples.len() != rows * cols {
            return Err(ProfileError::DimensionMismatch {
                left: rows * cols,
                right: samples.len(),
            });
        }
        Ok(IntensityImage {
            data: DMatrix::from_row_slice(rows, cols, &samples),
        })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }
}
