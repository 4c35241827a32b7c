use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::ProfileError;

/// Peak detection cutoffs derived from a signal's own distribution, plus the
/// descriptive statistics of the sub-quartile subset for audit and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ThresholdEstimate {
    /// Minimum peak height, `subset_mean + 2 * subset_std`.
    pub min_height: f64,
    /// Minimum required prominence, the sample std of the entire signal.
    pub prominence_cutoff: f64,
    /// Third quartile of the signal, linear-interpolation convention.
    pub q3: f64,
    pub subset_mean: f64,
    pub subset_median: f64,
    pub subset_std: f64,
    pub subset_n: usize,
}

/// Quantile by the linear-interpolation convention (the numpy/pandas
/// default): with `h = (n - 1) * q`, interpolates between the samples at
/// `floor(h)` and `ceil(h)` of the sorted data. Used for both `q3` and the
/// subset median so the convention stays consistent.
pub fn quantile_linear(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Derives adaptive height and prominence cutoffs for one signal.
///
/// The third quartile splits off the top of the distribution, which is
/// expected to contain the true peaks; the remaining sub-quartile subset
/// approximates the noise floor. `min_height = mean + 2 * std` of that subset
/// then guarantees a signal-to-noise ratio of at least 1 against the noise
/// band, while the prominence cutoff is the sample std of the full signal.
///
/// # Arguments
///
/// * `signal` - Background-subtracted, zero-clamped neurite signal.
///
/// # Example
///
/// ```rust
/// # use punctacore::algorithm::threshold::estimate_threshold;
/// let signal = vec![0.0, 1.0, 2.0, 3.0, 100.0];
/// let estimate = estimate_threshold(&signal).unwrap();
/// assert_eq!(estimate.q3, 3.0);
/// assert_eq!(estimate.subset_n, 3);
/// assert_eq!(estimate.subset_mean, 1.0);
/// ```
pub fn estimate_threshold(signal: &[f64]) -> Result<ThresholdEstimate, ProfileError> {
    let q3 = quantile_linear(signal, 0.75);
    let subset: Vec<f64> = signal.iter().copied().filter(|v| *v < q3).collect();
    if subset.len() < 2 {
        return Err(ProfileError::InsufficientData { n: subset.len() });
    }
    let subset_mean = subset.iter().mean();
    let subset_std = subset.iter().std_dev();
    let subset_median = quantile_linear(&subset, 0.5);
    Ok(ThresholdEstimate {
        min_height: subset_mean + 2.0 * subset_std,
        prominence_cutoff: signal.iter().std_dev(),
        q3,
        subset_mean,
        subset_median,
        subset_std,
        subset_n: subset.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_linear_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        // h = 3 * 0.75 = 2.25 -> 3 + 0.25 * (4 - 3)
        assert!((quantile_linear(&values, 0.75) - 3.25).abs() < 1e-12);
        assert!((quantile_linear(&values, 0.5) - 2.5).abs() < 1e-12);
        assert_eq!(quantile_linear(&values, 0.0), 1.0);
        assert_eq!(quantile_linear(&values, 1.0), 4.0);
    }

    #[test]
    fn test_quantile_linear_unsorted_input() {
        let values = vec![4.0, 1.0, 3.0, 2.0];
        assert!((quantile_linear(&values, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_threshold_known_values() {
        // q3 of [0..=7] is 5.25, subset = [0, 1, 2, 3, 4, 5]
        let signal: Vec<f64> = (0..8).map(|v| v as f64).collect();
        let estimate = estimate_threshold(&signal).unwrap();
        assert!((estimate.q3 - 5.25).abs() < 1e-12);
        assert_eq!(estimate.subset_n, 6);
        assert!((estimate.subset_mean - 2.5).abs() < 1e-12);
        assert!((estimate.subset_median - 2.5).abs() < 1e-12);
        // Sample std of [0..=5] is sqrt(17.5 / 5)
        assert!((estimate.subset_std - (3.5f64).sqrt()).abs() < 1e-12);
        assert!((estimate.min_height - (2.5 + 2.0 * (3.5f64).sqrt())).abs() < 1e-12);
        // Prominence cutoff is the sample std of the full signal
        assert!((estimate.prominence_cutoff - (6.0f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_threshold_degenerate_signal() {
        // All-equal signal: q3 equals every value, the strict subset is empty
        let signal = vec![0.0; 10];
        let result = estimate_threshold(&signal);
        assert!(matches!(
            result,
            Err(ProfileError::InsufficientData { n: 0 })
        ));
    }

    #[test]
    fn test_estimate_threshold_empty_signal() {
        let result = estimate_threshold(&[]);
        assert!(matches!(
            result,
            Err(ProfileError::InsufficientData { n: 0 })
        ));
    }
}
