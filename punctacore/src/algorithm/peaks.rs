use crate::data::peak::Peak;

/// Fraction of the prominence, measured down from the peak, at which width is
/// evaluated. 0.5 gives the half-prominence width, the analogue of
/// full-width-half-max.
pub const DEFAULT_REL_HEIGHT: f64 = 0.5;

/// A candidate local maximum: plateau midpoint plus the plateau edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct LocalMaximum {
    midpoint: usize,
    left_edge: usize,
    right_edge: usize,
}

/// Scans a signal for local maxima, filters candidates by height and
/// prominence, and measures each surviving peak's width at
/// `rel_height * prominence` below the peak with linear sub-sample
/// interpolation of the crossings.
///
/// Signals with fewer than 3 samples hold no interior local maximum and
/// yield an empty sequence. Accepted peaks are returned in ascending index
/// order.
///
/// # Arguments
///
/// * `signal` - Background-subtracted, zero-clamped neurite signal.
/// * `min_height` - Minimum signal value at the peak.
/// * `prominence_cutoff` - Minimum required prominence.
/// * `rel_height` - Width reference level as a fraction of the prominence.
///
/// # Example
///
/// ```rust
/// # use punctacore::algorithm::peaks::{find_peaks, DEFAULT_REL_HEIGHT};
/// let signal = vec![0.0, 0.0, 5.0, 0.0, 0.0];
/// let peaks = find_peaks(&signal, 1.0, 1.0, DEFAULT_REL_HEIGHT);
/// assert_eq!(peaks.len(), 1);
/// assert_eq!(peaks[0].index, 2);
/// assert_eq!(peaks[0].prominence, 5.0);
/// ```
pub fn find_peaks(
    signal: &[f64],
    min_height: f64,
    prominence_cutoff: f64,
    rel_height: f64,
) -> Vec<Peak> {
    if signal.len() < 3 {
        return Vec::new();
    }
    let mut peaks = Vec::new();
    for candidate in local_maxima(signal) {
        let height = signal[candidate.midpoint];
        if height < min_height {
            continue;
        }
        let (prominence, left_base, right_base) = peak_prominence(signal, &candidate);
        if prominence < prominence_cutoff {
            continue;
        }
        let (width, left_ip, right_ip) = peak_width(
            signal,
            candidate.midpoint,
            prominence,
            left_base,
            right_base,
            rel_height,
        );
        peaks.push(Peak {
            index: candidate.midpoint,
            height,
            prominence,
            left_base,
            right_base,
            width,
            left_ip,
            right_ip,
        });
    }
    peaks
}

/// Interior local maxima with plateau handling: a candidate rises strictly
/// from the left, may stay flat, and falls strictly to the right; the
/// midpoint index of the plateau represents the peak. Boundary samples are
/// never candidates.
fn local_maxima(signal: &[f64]) -> Vec<LocalMaximum> {
    let mut maxima = Vec::new();
    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let left_edge = i;
                let right_edge = ahead - 1;
                maxima.push(LocalMaximum {
                    midpoint: (left_edge + right_edge) / 2,
                    left_edge,
                    right_edge,
                });
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Prominence of one candidate: extend outward from each plateau edge until
/// the signal boundary or a sample at least as high as the peak; the minimum
/// seen along each excursion is that side's base level, and
/// `prominence = height - max(left_level, right_level)`.
///
/// Stopping at equal height means a neighboring peak of the same height
/// terminates the excursion, so twin peaks sharing an elevated valley are
/// isolated by that valley rather than by the signal ends.
fn peak_prominence(signal: &[f64], candidate: &LocalMaximum) -> (f64, usize, usize) {
    let height = signal[candidate.midpoint];

    let mut left_level = f64::INFINITY;
    let mut left_base = candidate.left_edge;
    let mut i = candidate.left_edge;
    while i > 0 {
        i -= 1;
        if signal[i] >= height {
            break;
        }
        if signal[i] < left_level {
            left_level = signal[i];
            left_base = i;
        }
    }

    let mut right_level = f64::INFINITY;
    let mut right_base = candidate.right_edge;
    let mut j = candidate.right_edge;
    while j < signal.len() - 1 {
        j += 1;
        if signal[j] >= height {
            break;
        }
        if signal[j] < right_level {
            right_level = signal[j];
            right_base = j;
        }
    }

    (height - left_level.max(right_level), left_base, right_base)
}

/// Width of one accepted peak at `height - rel_height * prominence`: walk
/// outward from the peak, bounded by its bases, to the first sample below the
/// reference height, then interpolate the exact crossing between that sample
/// and its inward neighbor.
fn peak_width(
    signal: &[f64],
    peak: usize,
    prominence: f64,
    left_base: usize,
    right_base: usize,
    rel_height: f64,
) -> (f64, f64, f64) {
    let ref_height = signal[peak] - rel_height * prominence;

    let mut i = peak;
    while i > left_base && signal[i] > ref_height {
        i -= 1;
    }
    let mut left_ip = i as f64;
    if signal[i] < ref_height {
        left_ip += (ref_height - signal[i]) / (signal[i + 1] - signal[i]);
    }

    let mut j = peak;
    while j < right_base && signal[j] > ref_height {
        j += 1;
    }
    let mut right_ip = j as f64;
    if signal[j] < ref_height {
        right_ip -= (ref_height - signal[j]) / (signal[j - 1] - signal[j]);
    }

    (right_ip - left_ip, left_ip, right_ip)
}
