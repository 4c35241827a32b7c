use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A detected punctum in a background-subtracted neurite signal.
///
/// Indices are positions into the signal; `left_ip`/`right_ip` are the
/// interpolated crossings of the half-prominence reference height, so they
/// carry sub-sample precision. Never mutated after detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Peak {
    /// Sample index of the peak (plateau midpoint for flat tops).
    pub index: usize,
    /// Signal value at the peak.
    pub height: f64,
    /// Height above the higher of the two base levels.
    pub prominence: f64,
    /// Index of the minimum along the left excursion.
    pub left_base: usize,
    /// Index of the minimum along the right excursion.
    pub right_base: usize,
    /// `right_ip - left_ip`, measured at half prominence.
    pub width: f64,
    /// Interpolated left crossing of the reference height.
    pub left_ip: f64,
    /// Interpolated right crossing of the reference height.
    pub right_ip: f64,
}

/// Spacing between two consecutive accepted puncta.
///
/// `position` is the midpoint between the pair, in the same units as the peak
/// positions the interval was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct InterPeakInterval {
    pub position: f64,
    pub value: f64,
}
