//! Grain identity and per-grain state.

use std::f64::consts::PI;

use nalgebra::Quaternion;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::EulerAngles;

/// Identifier of a grain.
///
/// Grains are referenced by small integer ids into a grain list. Id `0` is a
/// reserved slot and never names a real grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GrainId(pub u32);

impl GrainId {
    /// The reserved sentinel id.
    pub const NONE: Self = Self(0);

    /// Create a new grain ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The id as a list index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for the reserved id `0`.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Builds an id from a list index.
    ///
    /// Grain lists never approach `u32::MAX` entries.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl From<u32> for GrainId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GrainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Grain({})", self.0)
    }
}

/// Equivalent sphere diameter of a grain of `voxels` voxels.
///
/// `2 * (voxels * voxel_volume * 3 / (4 pi))^(1/3)`.
///
/// # Example
///
/// ```
/// use texture_types::equivalent_diameter;
///
/// // A single unit voxel has the diameter of a unit-volume sphere
/// let d = equivalent_diameter(1, 1.0);
/// assert!((d - 1.2407).abs() < 1e-4);
/// ```
#[must_use]
pub fn equivalent_diameter(voxels: usize, voxel_volume: f64) -> f64 {
    let voxel_to_sphere = voxel_volume * (3.0 / 4.0) * (1.0 / PI);
    2.0 * (voxels as f64 * voxel_to_sphere).powf(1.0 / 3.0)
}

/// Per-grain state consumed by the texture optimizer.
///
/// The Euler angles and the cached quaternion are private and only change
/// together through [`Grain::set_orientation`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grain {
    euler: EulerAngles,
    quaternion: Quaternion<f64>,
    /// Number of voxels owned by the grain.
    pub num_voxels: usize,
    /// Whether the grain touches the sample exterior.
    pub surface: bool,
}

impl Grain {
    /// Creates an interior grain.
    #[must_use]
    pub fn new(euler: EulerAngles, num_voxels: usize) -> Self {
        Self {
            euler,
            quaternion: euler.to_quaternion(),
            num_voxels,
            surface: false,
        }
    }

    /// Creates a grain touching the sample exterior.
    #[must_use]
    pub fn surface(euler: EulerAngles, num_voxels: usize) -> Self {
        Self {
            surface: true,
            ..Self::new(euler, num_voxels)
        }
    }

    /// Placeholder for the reserved slot 0.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::surface(EulerAngles::zero(), 0)
    }

    /// Current Euler angles.
    #[must_use]
    pub const fn euler(&self) -> EulerAngles {
        self.euler
    }

    /// Quaternion derived from the current Euler angles.
    #[must_use]
    pub const fn quaternion(&self) -> &Quaternion<f64> {
        &self.quaternion
    }

    /// Replaces the orientation and re-derives the cached quaternion.
    pub fn set_orientation(&mut self, euler: EulerAngles) {
        self.euler = euler;
        self.quaternion = euler.to_quaternion();
    }

    /// `true` when the grain is eligible for orientation moves.
    #[must_use]
    pub const fn is_interior(&self) -> bool {
        !self.surface
    }

    /// Grain volume for the given voxel volume.
    #[must_use]
    pub fn volume(&self, voxel_volume: f64) -> f64 {
        self.num_voxels as f64 * voxel_volume
    }

    /// Equivalent sphere diameter for the given voxel volume.
    #[must_use]
    pub fn equivalent_diameter(&self, voxel_volume: f64) -> f64 {
        equivalent_diameter(self.num_voxels, voxel_volume)
    }
}
