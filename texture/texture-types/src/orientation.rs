//! Crystal orientation primitives.
//!
//! Orientations are stored as Bunge Euler angles `(phi1, Phi, phi2)` in radians
//! together with a quaternion derived from them. The quaternion uses the
//! half-angle product form
//!
//! ```text
//! x = sin(Phi/2) cos((phi1 - phi2)/2)
//! y = sin(Phi/2) sin((phi1 - phi2)/2)
//! z = cos(Phi/2) sin((phi1 + phi2)/2)
//! w = cos(Phi/2) cos((phi1 + phi2)/2)
//! ```

use std::f64::consts::{PI, TAU};
use std::fmt;

use nalgebra::Quaternion;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bunge Euler angles in radians.
///
/// # Example
///
/// ```
/// use texture_types::EulerAngles;
///
/// let identity = EulerAngles::zero();
/// let q = identity.to_quaternion();
/// assert_eq!(q.w, 1.0);
/// assert_eq!(q.i, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EulerAngles {
    /// First rotation about Z.
    pub phi1: f64,
    /// Rotation about the rotated X axis.
    pub phi: f64,
    /// Second rotation about the rotated Z axis.
    pub phi2: f64,
}

impl EulerAngles {
    /// Creates Euler angles from three radian values.
    #[must_use]
    pub const fn new(phi1: f64, phi: f64, phi2: f64) -> Self {
        Self { phi1, phi, phi2 }
    }

    /// The identity orientation.
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Builds the orientation quaternion with the half-angle product formula.
    ///
    /// The returned quaternion is unit length for finite input.
    #[must_use]
    pub fn to_quaternion(self) -> Quaternion<f64> {
        let (s, c) = (0.5 * self.phi).sin_cos();
        let (s1, c1) = (0.5 * (self.phi1 - self.phi2)).sin_cos();
        let (s2, c2) = (0.5 * (self.phi1 + self.phi2)).sin_cos();
        Quaternion::new(c * c2, s * c1, s * s1, c * s2)
    }

    /// Recovers Euler angles from a quaternion built by [`Self::to_quaternion`].
    ///
    /// `q` and `-q` describe the same rotation; both map to angles wrapped into
    /// `[0, 2pi)` for `phi1`/`phi2` and `[0, pi]` for `Phi`.
    ///
    /// # Example
    ///
    /// ```
    /// use texture_types::EulerAngles;
    ///
    /// let e = EulerAngles::new(0.3, 0.2, 1.1);
    /// let back = EulerAngles::from_quaternion(&e.to_quaternion());
    /// assert!((back.phi1 - 0.3).abs() < 1e-12);
    /// assert!((back.phi - 0.2).abs() < 1e-12);
    /// assert!((back.phi2 - 1.1).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn from_quaternion(q: &Quaternion<f64>) -> Self {
        let sum = 2.0 * q.k.atan2(q.w);
        let diff = 2.0 * q.j.atan2(q.i);
        let phi = 2.0 * q.i.hypot(q.j).atan2(q.k.hypot(q.w));
        Self {
            phi1: wrap_angle(0.5 * (sum + diff)),
            phi,
            phi2: wrap_angle(0.5 * (sum - diff)),
        }
    }

    /// Returns the angles as an array `[phi1, Phi, phi2]`.
    #[must_use]
    pub const fn as_array(self) -> [f64; 3] {
        [self.phi1, self.phi, self.phi2]
    }
}

impl From<[f64; 3]> for EulerAngles {
    fn from(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

fn wrap_angle(a: f64) -> f64 {
    let wrapped = a.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative input
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Crystal symmetry of a phase.
///
/// Only the two Laue classes used by the texture optimizer are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CrystalSymmetry {
    /// Cubic m-3m, 24 proper rotations.
    Cubic,
    /// Hexagonal 6/mmm, 12 proper rotations.
    Hexagonal,
}

impl CrystalSymmetry {
    /// Number of proper rotation operators of the Laue group.
    #[must_use]
    pub const fn operator_count(self) -> usize {
        match self {
            Self::Cubic => 24,
            Self::Hexagonal => 12,
        }
    }

    /// Largest possible disorientation angle in radians.
    ///
    /// 62.8 degrees for cubic and 93.8 degrees for hexagonal crystals.
    #[must_use]
    pub fn max_misorientation(self) -> f64 {
        match self {
            Self::Cubic => 62.8 * PI / 180.0,
            Self::Hexagonal => 93.84 * PI / 180.0,
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cubic => "cubic",
            Self::Hexagonal => "hexagonal",
        }
    }
}

impl fmt::Display for CrystalSymmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
