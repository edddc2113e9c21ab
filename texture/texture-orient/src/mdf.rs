//! Misorientation distribution function binning.

use std::f64::consts::PI;

use texture_types::{CrystalSymmetry, Result, TextureError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default MDF bin width, 5 degrees.
pub const DEFAULT_MDF_WIDTH: f64 = 5.0 * PI / 180.0;

/// Equal-width bins over `[0, max disorientation]`.
///
/// # Example
///
/// ```
/// use texture_orient::MisorientationBins;
/// use texture_types::CrystalSymmetry;
///
/// let bins = MisorientationBins::for_symmetry(CrystalSymmetry::Cubic);
/// assert_eq!(bins.num_bins(), 13);
/// assert_eq!(bins.bin(0.0), 0);
/// assert_eq!(bins.bin(10.0), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MisorientationBins {
    width: f64,
    count: usize,
}

impl MisorientationBins {
    /// Five-degree bins covering the disorientation range of `symmetry`.
    #[must_use]
    pub fn for_symmetry(symmetry: CrystalSymmetry) -> Self {
        Self {
            width: DEFAULT_MDF_WIDTH,
            count: Self::count_for(symmetry, DEFAULT_MDF_WIDTH),
        }
    }

    /// Bins of a custom width in radians.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::InvalidConfig`] unless `width` is positive and
    /// finite.
    pub fn with_width(symmetry: CrystalSymmetry, width: f64) -> Result<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(TextureError::invalid_config(format!(
                "MDF bin width must be positive, got {width}"
            )));
        }
        Ok(Self {
            width,
            count: Self::count_for(symmetry, width),
        })
    }

    fn count_for(symmetry: CrystalSymmetry, width: f64) -> usize {
        ((symmetry.max_misorientation() / width).ceil() as usize).max(1)
    }

    /// Bin width in radians.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Number of bins.
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.count
    }

    /// Bin of a misorientation angle, clamped into range.
    #[must_use]
    pub fn bin(&self, angle: f64) -> usize {
        ((angle / self.width).max(0.0) as usize).min(self.count - 1)
    }
}
