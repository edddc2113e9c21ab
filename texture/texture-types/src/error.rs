//! Error types for texture matching.
//!
//! This module defines the [`TextureError`] enum. Every variant describes a
//! precondition that is checked when a state is built; once construction
//! succeeds, the Monte Carlo step functions cannot fail.

use crate::GrainId;

/// Errors that can occur while setting up a texture-matching or
/// volume-adjustment run.
///
/// # Example
///
/// ```
/// use texture_types::{GrainId, TextureError};
///
/// let error = TextureError::InvalidGrainId {
///     id: GrainId::new(12),
///     num_grains: 10,
/// };
///
/// assert!(error.to_string().contains("out of range"));
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TextureError {
    /// A grain id is zero where a real grain is required, or is past the end
    /// of the grain list.
    #[error("grain id {id} is out of range for {num_grains} grains")]
    InvalidGrainId {
        /// The offending id.
        id: GrainId,
        /// Number of grain slots, including the unused slot 0.
        num_grains: usize,
    },

    /// The number of ODF bins does not describe a grid for this symmetry.
    #[error("{bins} ODF bins is not a valid grid for {symmetry} symmetry")]
    UnsupportedBinCount {
        /// Requested bin count.
        bins: usize,
        /// Symmetry name.
        symmetry: &'static str,
    },

    /// A target or simulated histogram has the wrong number of bins.
    #[error("{name} histogram has {actual} bins, expected {expected}")]
    HistogramLength {
        /// Which histogram.
        name: &'static str,
        /// Expected number of bins.
        expected: usize,
        /// Provided number of bins.
        actual: usize,
    },

    /// Grain `a` lists `b` as a neighbor but `b` does not list `a`.
    #[error("{a} lists {b} as a neighbor, but {b} does not list {a}")]
    AsymmetricNeighbors {
        /// Grain holding the one-sided entry.
        a: GrainId,
        /// Neighbor missing the reverse entry.
        b: GrainId,
    },

    /// Per-grain neighbor sequences have different lengths.
    #[error("neighbor lists of {grain} have mismatched lengths ({ids} ids, {areas} areas)")]
    NeighborListMismatch {
        /// Grain whose lists disagree.
        grain: GrainId,
        /// Length of the id list.
        ids: usize,
        /// Length of the shared-area list.
        areas: usize,
    },

    /// Fewer than two interior grains exist, so no swap can be proposed.
    #[error("at least two interior grains are required, found {found}")]
    InsufficientInteriorGrains {
        /// Number of interior grains found.
        found: usize,
    },

    /// The voxel grid has no voxels.
    #[error("voxel grid is empty")]
    EmptyGrid,

    /// The voxel id buffer does not match the grid dimensions.
    #[error("grid of {dims:?} needs {expected} voxels, got {actual}")]
    GridSizeMismatch {
        /// Grid dimensions.
        dims: [usize; 3],
        /// Expected voxel count.
        expected: usize,
        /// Provided voxel count.
        actual: usize,
    },

    /// A voxel resolution component is not positive and finite.
    #[error("voxel resolution must be positive and finite, got {0:?}")]
    InvalidResolution([f64; 3]),

    /// An invalid configuration parameter was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data violates a documented precondition.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TextureError {
    /// Creates an invalid configuration error with the given message.
    ///
    /// # Example
    ///
    /// ```
    /// use texture_types::TextureError;
    ///
    /// let error = TextureError::invalid_config("max_bad_tries must be positive");
    /// assert!(error.to_string().contains("max_bad_tries"));
    /// ```
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Creates an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` if this error comes from a bad configuration value.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }

    /// Returns `true` if this error reports a malformed neighbor graph.
    #[must_use]
    pub const fn is_neighbor_error(&self) -> bool {
        matches!(
            self,
            Self::AsymmetricNeighbors { .. } | Self::NeighborListMismatch { .. }
        )
    }
}

/// Result type for texture operations.
pub type Result<T> = std::result::Result<T, TextureError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grain_id_display() {
        let error = TextureError::InvalidGrainId {
            id: GrainId::new(7),
            num_grains: 5,
        };
        let msg = error.to_string();
        assert!(msg.contains("Grain(7)"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_asymmetric_neighbors_display() {
        let error = TextureError::AsymmetricNeighbors {
            a: GrainId::new(1),
            b: GrainId::new(2),
        };
        assert!(error.to_string().contains("does not list"));
        assert!(error.is_neighbor_error());
        assert!(!error.is_config());
    }

    #[test]
    fn test_histogram_length_display() {
        let error = TextureError::HistogramLength {
            name: "actual ODF",
            expected: 5832,
            actual: 10,
        };
        let msg = error.to_string();
        assert!(msg.contains("actual ODF"));
        assert!(msg.contains("5832"));
    }

    #[test]
    fn test_config_helper() {
        let error = TextureError::invalid_config("bad value");
        assert!(error.is_config());
        assert!(matches!(error, TextureError::InvalidConfig(msg) if msg == "bad value"));
    }

    #[test]
    fn test_input_helper() {
        let error = TextureError::invalid_input("no voxels for grain");
        assert!(error.to_string().starts_with("invalid input"));
    }

    #[test]
    fn test_interior_grains_display() {
        let error = TextureError::InsufficientInteriorGrains { found: 1 };
        assert!(error.to_string().contains("found 1"));
    }
}
