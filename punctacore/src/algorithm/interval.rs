use itertools::Itertools;

use crate::data::peak::InterPeakInterval;

/// Consecutive differences between accepted peak positions, each reported at
/// the midpoint between its pair.
///
/// Positions are expected in ascending order, already converted to physical
/// distance units by the caller. With fewer than two peaks there is no
/// interval and the result is empty.
///
/// # Example
///
/// ```rust
/// # use punctacore::algorithm::interval::inter_peak_intervals;
/// let intervals = inter_peak_intervals(&[1.0, 3.0, 7.0]);
/// assert_eq!(intervals.len(), 2);
/// assert_eq!(intervals[0].value, 2.0);
/// assert_eq!(intervals[0].position, 2.0);
/// assert_eq!(intervals[1].value, 4.0);
/// assert_eq!(intervals[1].position, 5.0);
/// ```
pub fn inter_peak_intervals(positions: &[f64]) -> Vec<InterPeakInterval> {
    positions
        .iter()
        .tuple_windows()
        .map(|(left, right)| InterPeakInterval {
            position: left + (right - left) / 2.0,
            value: right - left,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_require_two_peaks() {
        assert!(inter_peak_intervals(&[]).is_empty());
        assert!(inter_peak_intervals(&[4.2]).is_empty());
    }

    #[test]
    fn test_interval_positions_are_midpoints() {
        let intervals = inter_peak_intervals(&[0.5, 1.5, 4.5]);
        assert_eq!(intervals.len(), 2);
        assert!((intervals[0].position - 1.0).abs() < 1e-12);
        assert!((intervals[0].value - 1.0).abs() < 1e-12);
        assert!((intervals[1].position - 3.0).abs() < 1e-12);
        assert!((intervals[1].value - 3.0).abs() < 1e-12);
    }
}
