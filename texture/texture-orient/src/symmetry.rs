//! Proper rotation operators of the supported Laue groups.
//!
//! Operators are stored as `[x, y, z, w]` quaternion components.

use std::f64::consts::FRAC_1_SQRT_2 as R2;

use nalgebra::Quaternion;
use texture_types::CrystalSymmetry;

const H: f64 = 0.5;
const S3: f64 = 0.866_025_403_784_438_6;

const CUBIC: [[f64; 4]; 24] = [
    [0.0, 0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [R2, 0.0, 0.0, R2],
    [0.0, R2, 0.0, R2],
    [0.0, 0.0, R2, R2],
    [-R2, 0.0, 0.0, R2],
    [0.0, -R2, 0.0, R2],
    [0.0, 0.0, -R2, R2],
    [R2, R2, 0.0, 0.0],
    [-R2, R2, 0.0, 0.0],
    [0.0, R2, R2, 0.0],
    [0.0, -R2, R2, 0.0],
    [R2, 0.0, R2, 0.0],
    [-R2, 0.0, R2, 0.0],
    [H, H, H, H],
    [-H, -H, -H, H],
    [H, -H, H, H],
    [-H, H, -H, H],
    [-H, H, H, H],
    [H, -H, -H, H],
    [-H, -H, H, H],
    [H, H, -H, H],
];

const HEXAGONAL: [[f64; 4]; 12] = [
    [0.0, 0.0, 0.0, 1.0],
    [0.0, 0.0, H, S3],
    [0.0, 0.0, S3, H],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, S3, -H],
    [0.0, 0.0, H, -S3],
    [1.0, 0.0, 0.0, 0.0],
    [S3, H, 0.0, 0.0],
    [H, S3, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [-H, S3, 0.0, 0.0],
    [-S3, H, 0.0, 0.0],
];

fn table(symmetry: CrystalSymmetry) -> &'static [[f64; 4]] {
    match symmetry {
        CrystalSymmetry::Cubic => &CUBIC,
        CrystalSymmetry::Hexagonal => &HEXAGONAL,
    }
}

/// Iterates the rotation operators of `symmetry`, identity first.
///
/// # Example
///
/// ```
/// use texture_orient::operators;
/// use texture_types::CrystalSymmetry;
///
/// assert_eq!(operators(CrystalSymmetry::Cubic).count(), 24);
/// assert_eq!(operators(CrystalSymmetry::Hexagonal).count(), 12);
/// ```
pub fn operators(symmetry: CrystalSymmetry) -> impl Iterator<Item = Quaternion<f64>> {
    table(symmetry)
        .iter()
        .map(|&[x, y, z, w]| Quaternion::new(w, x, y, z))
}
