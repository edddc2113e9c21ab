//! Orientation-space binning for texture matching.
//!
//! This crate maps crystal orientations onto the discrete histograms the
//! Monte Carlo optimizer works with:
//!
//! - [`operators`] - proper rotations of the cubic and hexagonal Laue groups
//! - [`misorientation`] - symmetry-reduced disorientation between two grains
//! - [`OrientationBinner`] - ODF bin lookup and sampling inside a bin
//! - [`MisorientationBins`] - MDF bin lookup
//!
//! # Example
//!
//! ```
//! use texture_orient::{MisorientationBins, OrientationBinner, misorientation};
//! use texture_types::{CrystalSymmetry, EulerAngles};
//!
//! let binner = OrientationBinner::new(CrystalSymmetry::Cubic);
//! assert_eq!(binner.bin_for_euler(EulerAngles::zero()), 0);
//!
//! let a = EulerAngles::zero().to_quaternion();
//! let b = EulerAngles::new(0.2, 0.0, 0.0).to_quaternion();
//! let m = misorientation(CrystalSymmetry::Cubic, &a, &b);
//!
//! let mdf = MisorientationBins::for_symmetry(CrystalSymmetry::Cubic);
//! assert_eq!(mdf.bin(m.angle), 2);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(
    clippy::cast_precision_loss,   // bin counts fit in f64
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,        // clamped to >= 0 before casting
    clippy::suboptimal_flops,
)]

mod mdf;
mod misorientation;
mod odf;
mod symmetry;

pub use mdf::{DEFAULT_MDF_WIDTH, MisorientationBins};
pub use misorientation::{
    Misorientation, angle_from_homochoric_radius, homochoric_radius, misorientation,
};
pub use odf::{OdfGrid, OrientationBinner, bin_index, choose_bin};
pub use symmetry::operators;

use nalgebra::Quaternion;
use texture_types::EulerAngles;

/// Quaternion of Bunge Euler angles `(e1, e2, e3)`.
///
/// Equivalent to [`EulerAngles::to_quaternion`].
#[must_use]
pub fn quaternion_from_euler(e1: f64, e2: f64, e3: f64) -> Quaternion<f64> {
    EulerAngles::new(e1, e2, e3).to_quaternion()
}

/// The fixed reference orientation used for ODF binning.
#[must_use]
pub fn reference_quaternion() -> Quaternion<f64> {
    quaternion_from_euler(0.0, 0.0, 0.0)
}
