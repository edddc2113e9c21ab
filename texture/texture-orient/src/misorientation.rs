//! Symmetry-reduced misorientation between two orientations.

use nalgebra::{Quaternion, Vector3};
use texture_types::CrystalSymmetry;

use crate::symmetry::operators;

/// Disorientation between two crystal orientations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Misorientation {
    /// Smallest rotation angle over all symmetric equivalents, radians in `[0, pi]`.
    pub angle: f64,
    /// Rotation axis reduced to the positive octant, unit length (zero when
    /// the angle is zero).
    pub axis: Vector3<f64>,
}

impl Misorientation {
    /// Homochoric vector `axis * (3/4 (w - sin w))^(1/3)`.
    ///
    /// The homochoric map is volume preserving, so equal-sized cells in this
    /// space hold equal volumes of orientation space.
    #[must_use]
    pub fn homochoric(&self) -> Vector3<f64> {
        self.axis * homochoric_radius(self.angle)
    }
}

/// Homochoric radius for a rotation angle.
#[must_use]
pub fn homochoric_radius(angle: f64) -> f64 {
    (0.75 * (angle - angle.sin())).powf(1.0 / 3.0)
}

/// Inverts [`homochoric_radius`] on `[0, pi]` by bisection.
#[must_use]
pub fn angle_from_homochoric_radius(radius: f64) -> f64 {
    // radius^3 = 3/4 (w - sin w)
    let target = radius.powi(3);
    let (mut lo, mut hi) = (0.0_f64, std::f64::consts::PI);
    if target >= 0.75 * hi {
        return hi;
    }
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if 0.75 * (mid - mid.sin()) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Computes the disorientation from `q1` to `q2` under `symmetry`.
///
/// The relative rotation `q1* q2` is combined with every symmetry operator and
/// the equivalent with the smallest rotation angle wins. For hexagonal
/// crystals the in-plane part of the axis is folded into the 0-30 degree wedge.
///
/// # Example
///
/// ```
/// use texture_orient::misorientation;
/// use texture_types::{CrystalSymmetry, EulerAngles};
///
/// let a = EulerAngles::zero().to_quaternion();
/// // 90 degrees about Z is a cubic symmetry operation
/// let b = EulerAngles::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0).to_quaternion();
///
/// let m = misorientation(CrystalSymmetry::Cubic, &a, &b);
/// assert!(m.angle < 1e-6);
/// ```
#[must_use]
pub fn misorientation(
    symmetry: CrystalSymmetry,
    q1: &Quaternion<f64>,
    q2: &Quaternion<f64>,
) -> Misorientation {
    let relative = q1.conjugate() * q2;

    let mut best_angle = f64::INFINITY;
    let mut best_imag = Vector3::zeros();
    for op in operators(symmetry) {
        let candidate = relative * op;
        let angle = 2.0 * candidate.w.abs().min(1.0).acos();
        if angle < best_angle {
            best_angle = angle;
            best_imag = candidate.imag();
        }
    }

    let norm = best_imag.norm();
    if norm <= f64::EPSILON {
        return Misorientation {
            angle: best_angle,
            axis: Vector3::zeros(),
        };
    }
    let mut axis = best_imag.map(f64::abs) / norm;
    if symmetry == CrystalSymmetry::Hexagonal {
        axis = fold_hexagonal_axis(axis);
    }

    Misorientation {
        angle: best_angle,
        axis,
    }
}

/// Folds the basal-plane azimuth of a positive-octant axis into `[0, 30]` degrees.
fn fold_hexagonal_axis(axis: Vector3<f64>) -> Vector3<f64> {
    let planar = axis.x.hypot(axis.y);
    if planar <= f64::EPSILON {
        return axis;
    }
    let wedge = std::f64::consts::FRAC_PI_6;
    let azimuth = axis.y.atan2(axis.x);
    if azimuth <= wedge {
        return axis;
    }
    let sector = (azimuth / wedge).floor();
    let remainder = azimuth - sector * wedge;
    let folded = if (sector as u32) % 2 == 0 {
        remainder
    } else {
        wedge - remainder
    };
    Vector3::new(planar * folded.cos(), planar * folded.sin(), axis.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};
    use texture_types::EulerAngles;

    fn quat(a: f64, b: f64, c: f64) -> Quaternion<f64> {
        EulerAngles::new(a, b, c).to_quaternion()
    }

    #[test]
    fn test_self_misorientation_is_zero() {
        let q = quat(0.4, 0.7, 1.2);
        for sym in [CrystalSymmetry::Cubic, CrystalSymmetry::Hexagonal] {
            let m = misorientation(sym, &q, &q);
            assert!(m.angle < 1e-7);
            assert_relative_eq!(m.homochoric().norm(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_small_rotation_angle() {
        let a = quat(0.0, 0.0, 0.0);
        let b = quat(0.1, 0.0, 0.0);
        let m = misorientation(CrystalSymmetry::Cubic, &a, &b);
        assert_relative_eq!(m.angle, 0.1, epsilon = 1e-12);
        assert_relative_eq!(m.axis, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_in_arguments() {
        let a = quat(0.3, 1.1, 2.0);
        let b = quat(1.7, 0.4, 0.9);
        for sym in [CrystalSymmetry::Cubic, CrystalSymmetry::Hexagonal] {
            let ab = misorientation(sym, &a, &b).angle;
            let ba = misorientation(sym, &b, &a).angle;
            assert_relative_eq!(ab, ba, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_cubic_upper_bound() {
        let a = quat(0.0, 0.0, 0.0);
        for i in 0..20 {
            let t = f64::from(i) * 0.37;
            let b = quat(t, 0.5 * t, 1.3 * t);
            let m = misorientation(CrystalSymmetry::Cubic, &a, &b);
            assert!(m.angle <= CrystalSymmetry::Cubic.max_misorientation() + 1e-9);
        }
    }

    #[test]
    fn test_hexagonal_sixfold_is_symmetric() {
        let a = quat(0.0, 0.0, 0.0);
        let b = quat(FRAC_PI_3, 0.0, 0.0);
        let m = misorientation(CrystalSymmetry::Hexagonal, &a, &b);
        assert!(m.angle < 1e-6);

        // 90 degrees about Z is not a hexagonal symmetry; 30 degrees remain
        let c = quat(FRAC_PI_2, 0.0, 0.0);
        let m = misorientation(CrystalSymmetry::Hexagonal, &a, &c);
        assert_relative_eq!(m.angle, PI / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hexagonal_axis_in_wedge() {
        let axis = fold_hexagonal_axis(Vector3::new(1.0, 1.0, 0.0).normalize());
        let azimuth = axis.y.atan2(axis.x);
        assert!(azimuth <= PI / 6.0 + 1e-12);
        assert_relative_eq!(axis.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_homochoric_radius_inverse() {
        for i in 1..30 {
            let angle = f64::from(i) * 0.1;
            let r = homochoric_radius(angle);
            assert_relative_eq!(angle_from_homochoric_radius(r), angle, epsilon = 1e-9);
        }
        assert_eq!(angle_from_homochoric_radius(10.0), PI);
    }

    #[test]
    fn test_homochoric_inverse_at_known_angles() {
        // radius of a 90 degree rotation, (3/4 (pi/2 - 1))^(1/3)
        let r = (0.75 * (FRAC_PI_2 - 1.0)).powf(1.0 / 3.0);
        assert_relative_eq!(angle_from_homochoric_radius(r), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(homochoric_radius(PI), (0.75 * PI).powf(1.0 / 3.0), epsilon = 1e-12);
        assert_relative_eq!(
            angle_from_homochoric_radius((0.75 * PI).powf(1.0 / 3.0)),
            PI,
            epsilon = 1e-9
        );
        assert!(angle_from_homochoric_radius(0.0) < 1e-12);
    }
}
