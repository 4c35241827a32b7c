use bincode::{Decode, Encode};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::algorithm::interval::inter_peak_intervals;
use crate::algorithm::peaks::{find_peaks, DEFAULT_REL_HEIGHT};
use crate::algorithm::region::column_means;
use crate::algorithm::threshold::{estimate_threshold, quantile_linear, ThresholdEstimate};
use crate::data::image::{BandSpec, IntensityImage};
use crate::data::peak::{InterPeakInterval, Peak};
use crate::data::profile::{distance_axis, normalized_axis, NeuriteProfile};
use crate::error::ProfileError;

/// One accepted punctum in physical distance units, ready for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PunctumRecord {
    /// Physical position along the neurite.
    pub distance: f64,
    /// Position rescaled to 0..1 over the neurite length.
    pub normalized_distance: f64,
    /// Signal value at the punctum.
    pub max_intensity: f64,
    /// Max-normalized signal value at the punctum.
    pub normalized_max_intensity: f64,
    /// Half-prominence width in physical units.
    pub width: f64,
}

/// Per-image aggregate statistics over signal, puncta and intervals.
///
/// The punctum and interval means are `None` when no punctum (or no pair of
/// puncta) was found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct AnalysisSummary {
    pub image_columns: usize,
    /// Physical length of the measured axis.
    pub neurite_length: f64,
    pub mean_signal: f64,
    pub total_peaks: usize,
    pub peaks_per_micron: f64,
    pub mean_peak_intensity: Option<f64>,
    pub mean_peak_width: Option<f64>,
    pub mean_ipd: Option<f64>,
    pub median_ipd: Option<f64>,
}

/// Immutable result record for one image. Aggregation across images is the
/// caller's responsibility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ProfileAnalysis {
    pub distance: Vec<f64>,
    pub normalized_distance: Vec<f64>,
    pub profile: NeuriteProfile,
    pub threshold: ThresholdEstimate,
    /// Accepted peaks in sample-index space.
    pub peaks: Vec<Peak>,
    /// Accepted peaks converted to physical units.
    pub puncta: Vec<PunctumRecord>,
    /// Inter-punctum intervals in physical units.
    pub intervals: Vec<InterPeakInterval>,
    pub summary: AnalysisSummary,
}

/// Runs the full single-image pipeline: band extraction, background
/// subtraction, adaptive threshold estimation, peak detection and interval
/// calculation.
///
/// The function is pure over its inputs and holds no state, so callers may
/// invoke it concurrently for independent images.
///
/// # Arguments
///
/// * `image` - The intensity image, rows across bands, columns along the
///   neurite.
/// * `bands` - Validated band configuration.
/// * `calibration` - Physical distance per column (units-per-sample).
pub fn analyze_image(
    image: &IntensityImage,
    bands: &BandSpec,
    calibration: f64,
) -> Result<ProfileAnalysis, ProfileError> {
    let neurite = column_means(image, &[bands.neurite])?;
    let background = column_means(image, &bands.background)?;
    let profile = NeuriteProfile::from_band_means(neurite, background)?;

    let threshold = estimate_threshold(&profile.signal)?;
    let peaks = find_peaks(
        &profile.signal,
        threshold.min_height,
        threshold.prominence_cutoff,
        DEFAULT_REL_HEIGHT,
    );

    let distance = distance_axis(profile.len(), calibration);
    let normalized_distance = normalized_axis(&distance);
    let neurite_length = distance.last().copied().unwrap_or(0.0);

    let puncta: Vec<PunctumRecord> = peaks
        .iter()
        .map(|peak| PunctumRecord {
            distance: distance[peak.index],
            normalized_distance: normalized_distance[peak.index],
            max_intensity: peak.height,
            normalized_max_intensity: profile.max_normalized[peak.index],
            width: peak.width * calibration,
        })
        .collect();

    let positions: Vec<f64> = puncta.iter().map(|p| p.distance).collect();
    let intervals = inter_peak_intervals(&positions);

    let ipd_values: Vec<f64> = intervals.iter().map(|i| i.value).collect();
    let summary = AnalysisSummary {
        image_columns: profile.len(),
        neurite_length,
        mean_signal: profile.signal.iter().mean(),
        total_peaks: peaks.len(),
        peaks_per_micron: peaks.len() as f64 / neurite_length,
        mean_peak_intensity: mean_of(puncta.iter().map(|p| p.max_intensity)),
        mean_peak_width: mean_of(puncta.iter().map(|p| p.width)),
        mean_ipd: mean_of(ipd_values.iter().copied()),
        median_ipd: if ipd_values.is_empty() {
            None
        } else {
            Some(quantile_linear(&ipd_values, 0.5))
        },
    };

    Ok(ProfileAnalysis {
        distance,
        normalized_distance,
        profile,
        threshold,
        peaks,
        puncta,
        intervals,
        summary,
    })
}

fn mean_of(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    if values.len() == 0 {
        None
    } else {
        Some(values.mean())
    }
}

/// Maps the single-image pipeline over a batch of images on a dedicated
/// thread pool. Each entry carries its own result so callers can skip failed
/// images and keep the rest.
pub fn analyze_images(
    images: &[IntensityImage],
    bands: &BandSpec,
    calibration: f64,
    num_threads: usize,
) -> Vec<Result<ProfileAnalysis, ProfileError>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .unwrap();

    pool.install(|| {
        images
            .par_iter()
            .map(|image| analyze_image(image, bands, calibration))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::image::RowRange;

    /// 7-row image, 12 columns: rows 0-1 and 5-6 are background at 10, rows
    /// 2-4 are neurite with two puncta riding on a gently varying baseline.
    fn synthetic_image() -> (IntensityImage, BandSpec) {
        let columns = 12;
        let background_row = vec![10.0; columns];
        let mut neurite_row: Vec<f64> = (0..columns).map(|c| 20.0 + (c % 4) as f64).collect();
        neurite_row[3] = 120.0;
        neurite_row[8] = 100.0;

        let mut samples = Vec::new();
        for _ in 0..2 {
            samples.extend_from_slice(&background_row);
        }
        for _ in 0..3 {
            samples.extend_from_slice(&neurite_row);
        }
        for _ in 0..2 {
            samples.extend_from_slice(&background_row);
        }
        let image = IntensityImage::from_row_major(7, columns, samples).unwrap();
        let bands = BandSpec::new(
            [RowRange::new(0, 1), RowRange::new(5, 6)],
            RowRange::new(2, 4),
        )
        .unwrap();
        (image, bands)
    }

    #[test]
    fn test_analyze_image_finds_both_puncta() {
        let (image, bands) = synthetic_image();
        let analysis = analyze_image(&image, &bands, 0.126).unwrap();

        // Signal is the 10..13 baseline except 110 and 90 at the puncta
        assert!((analysis.profile.signal[0] - 10.0).abs() < 1e-12);
        assert!((analysis.profile.signal[3] - 110.0).abs() < 1e-12);
        assert!((analysis.profile.signal[8] - 90.0).abs() < 1e-12);

        assert_eq!(analysis.summary.total_peaks, 2);
        assert_eq!(analysis.peaks[0].index, 3);
        assert_eq!(analysis.peaks[1].index, 8);

        assert_eq!(analysis.intervals.len(), 1);
        assert!((analysis.intervals[0].value - 5.0 * 0.126).abs() < 1e-12);
        // Interval midpoint sits between the two puncta
        assert!((analysis.intervals[0].position - 5.5 * 0.126).abs() < 1e-12);

        assert_eq!(analysis.summary.image_columns, 12);
        assert!((analysis.summary.neurite_length - 11.0 * 0.126).abs() < 1e-12);
        assert_eq!(analysis.summary.mean_ipd, analysis.summary.median_ipd);
    }

    #[test]
    fn test_analyze_image_is_idempotent() {
        let (image, bands) = synthetic_image();
        let first = analyze_image(&image, &bands, 0.126).unwrap();
        let second = analyze_image(&image, &bands, 0.126).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_analyze_image_flat_signal_fails() {
        let image = IntensityImage::from_row_major(3, 8, vec![10.0; 24]).unwrap();
        let bands = BandSpec::new(
            [RowRange::new(0, 0), RowRange::new(2, 2)],
            RowRange::new(1, 1),
        )
        .unwrap();
        let result = analyze_image(&image, &bands, 0.126);
        assert!(matches!(
            result,
            Err(ProfileError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_analyze_images_batch_keeps_per_image_results() {
        let (image, bands) = synthetic_image();
        let flat = IntensityImage::from_row_major(7, 12, vec![10.0; 84]).unwrap();
        let results = analyze_images(&[image.clone(), flat, image], &bands, 0.126, 2);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ProfileError::InsufficientData { .. })
        ));
        assert!(results[2].is_ok());
        assert_eq!(
            results[0].as_ref().unwrap(),
            results[2].as_ref().unwrap()
        );
    }
}
