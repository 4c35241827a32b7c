use thiserror::Error;

/// Errors surfaced by the profile analysis core.
///
/// All variants are local, recoverable-by-caller conditions. The core performs
/// no I/O and therefore has no transient failures of its own; a caller working
/// through a batch of images should catch per-image errors and continue with
/// the remaining images.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// Band configuration outside image bounds, or row ranges overlap.
    #[error("invalid row range configuration: {0}")]
    InvalidRange(String),

    /// Profiles of unequal length were combined.
    #[error("profile length mismatch: {left} columns vs {right} columns")]
    DimensionMismatch { left: usize, right: usize },

    /// The sub-quartile subset is too small to compute a standard deviation.
    #[error("threshold subset holds {n} values, at least 2 are required")]
    InsufficientData { n: usize },
}
