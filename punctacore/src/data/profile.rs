use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::algorithm::region::subtract_background;
use crate::error::ProfileError;

/// Per-column profiles derived from one neurite image.
///
/// `signal` is the background-subtracted neurite profile clamped at zero and
/// is the sole input to peak detection. The normalized profiles are computed
/// from the unclamped difference, matching the reporting convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct NeuriteProfile {
    /// Mean raw neurite intensity per column.
    pub raw: Vec<f64>,
    /// Mean pooled background intensity per column.
    pub background: Vec<f64>,
    /// Background-subtracted neurite intensity, floored at zero.
    pub signal: Vec<f64>,
    /// Unclamped difference divided by its mean.
    pub mean_normalized: Vec<f64>,
    /// Unclamped difference divided by its maximum.
    pub max_normalized: Vec<f64>,
}

impl NeuriteProfile {
    /// Combines the neurite and background column means into the full
    /// per-column profile set.
    ///
    /// # Arguments
    ///
    /// * `raw` - Mean neurite intensity per column.
    /// * `background` - Mean pooled background intensity per column.
    pub fn from_band_means(
        raw: Vec<f64>,
        background: Vec<f64>,
    ) -> Result<Self, ProfileError> {
        let diff = subtract_background(&raw, &background)?;
        let mean = diff.iter().mean();
        let max = diff.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean_normalized = diff.iter().map(|v| v / mean).collect();
        let max_normalized = diff.iter().map(|v| v / max).collect();
        let signal = diff.into_iter().map(|v| v.max(0.0)).collect();
        Ok(NeuriteProfile {
            raw,
            background,
            signal,
            mean_normalized,
            max_normalized,
        })
    }

    /// Number of image columns covered by the profile.
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }
}

/// Physical distance per column, `index * calibration`, where `calibration`
/// is the units-per-sample conversion factor supplied by the caller.
pub fn distance_axis(columns: usize, calibration: f64) -> Vec<f64> {
    (0..columns).map(|i| i as f64 * calibration).collect()
}

/// Positions along the image rescaled to 0..1.
pub fn normalized_axis(distance: &[f64]) -> Vec<f64> {
    let last = distance.last().copied().unwrap_or(0.0);
    distance.iter().map(|d| d / last).collect()
}
