//! Orientation distribution function binning.
//!
//! Orientations are reduced into the fundamental zone relative to a reference
//! orientation, mapped into homochoric space and cut into a regular grid of
//! `n1 x n2 x n3` cells. The flattened index is `b3 * n1 * n2 + b2 * n1 + b1`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6};

use nalgebra::{Quaternion, Vector3};
use texture_types::{CrystalSymmetry, EulerAngles, RandomSource, Result, TextureError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::misorientation::{angle_from_homochoric_radius, misorientation};

/// Default number of cells per axis for cubic symmetry.
const CUBIC_CELLS: usize = 18;
/// Default number of cells along the c axis for hexagonal symmetry.
const HEX_C_CELLS: usize = 12;

/// Homochoric extents of the fundamental zone bounding box.
fn extents(symmetry: CrystalSymmetry) -> [f64; 3] {
    match symmetry {
        CrystalSymmetry::Cubic => {
            let e = (0.75 * (FRAC_PI_4 - FRAC_PI_4.sin())).powf(1.0 / 3.0);
            [e, e, e]
        }
        CrystalSymmetry::Hexagonal => {
            let e = (0.75 * (FRAC_PI_2 - FRAC_PI_2.sin())).powf(1.0 / 3.0);
            let c = (0.75 * (FRAC_PI_6 - FRAC_PI_6.sin())).powf(1.0 / 3.0);
            [e, e, c]
        }
    }
}

/// Integer cube root, if `n` is a perfect cube.
fn exact_cbrt(n: usize) -> Option<usize> {
    let guess = (n as f64).cbrt().round() as usize;
    (guess.saturating_sub(1)..=guess + 1).find(|&r| r > 0 && r * r * r == n)
}

/// Regular grid over the homochoric fundamental zone.
///
/// # Example
///
/// ```
/// use texture_orient::OdfGrid;
/// use texture_types::CrystalSymmetry;
///
/// let grid = OdfGrid::for_symmetry(CrystalSymmetry::Cubic);
/// assert_eq!(grid.num_bins(), 5832);
/// assert_eq!(grid.cells(), [18, 18, 18]);
///
/// let hex = OdfGrid::for_symmetry(CrystalSymmetry::Hexagonal);
/// assert_eq!(hex.num_bins(), 15552);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OdfGrid {
    symmetry: CrystalSymmetry,
    cells: [usize; 3],
    extent: [f64; 3],
}

impl OdfGrid {
    /// Builds the grid holding `num_bins` cells for `symmetry`.
    ///
    /// Cubic grids are `n x n x n`; hexagonal grids are `3n x 3n x n`.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::UnsupportedBinCount`] when `num_bins` has no
    /// such factorization.
    pub fn new(symmetry: CrystalSymmetry, num_bins: usize) -> Result<Self> {
        let unsupported = || TextureError::UnsupportedBinCount {
            bins: num_bins,
            symmetry: symmetry.name(),
        };
        let cells = match symmetry {
            CrystalSymmetry::Cubic => {
                let n = exact_cbrt(num_bins).ok_or_else(unsupported)?;
                [n, n, n]
            }
            CrystalSymmetry::Hexagonal => {
                if num_bins % 9 != 0 {
                    return Err(unsupported());
                }
                let n = exact_cbrt(num_bins / 9).ok_or_else(unsupported)?;
                [3 * n, 3 * n, n]
            }
        };
        Ok(Self {
            symmetry,
            cells,
            extent: extents(symmetry),
        })
    }

    /// The standard grid for `symmetry`: 5832 cubic or 15552 hexagonal bins.
    #[must_use]
    pub fn for_symmetry(symmetry: CrystalSymmetry) -> Self {
        let cells = match symmetry {
            CrystalSymmetry::Cubic => [CUBIC_CELLS; 3],
            CrystalSymmetry::Hexagonal => [3 * HEX_C_CELLS, 3 * HEX_C_CELLS, HEX_C_CELLS],
        };
        Self {
            symmetry,
            cells,
            extent: extents(symmetry),
        }
    }

    /// Symmetry the grid was built for.
    #[must_use]
    pub const fn symmetry(&self) -> CrystalSymmetry {
        self.symmetry
    }

    /// Cells per axis.
    #[must_use]
    pub const fn cells(&self) -> [usize; 3] {
        self.cells
    }

    /// Homochoric extent per axis.
    #[must_use]
    pub const fn extent(&self) -> [f64; 3] {
        self.extent
    }

    /// Total number of bins.
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.cells[0] * self.cells[1] * self.cells[2]
    }

    /// Cell edge length per axis.
    #[must_use]
    pub fn step(&self) -> [f64; 3] {
        [
            self.extent[0] / self.cells[0] as f64,
            self.extent[1] / self.cells[1] as f64,
            self.extent[2] / self.cells[2] as f64,
        ]
    }

    /// Flattened bin of a homochoric point, clamped into the grid.
    #[must_use]
    pub fn bin_of_point(&self, h: &Vector3<f64>) -> usize {
        let axis_bin = |axis: usize| {
            let raw = (h[axis] * self.cells[axis] as f64 / self.extent[axis]).max(0.0) as usize;
            raw.min(self.cells[axis] - 1)
        };
        let (b1, b2, b3) = (axis_bin(0), axis_bin(1), axis_bin(2));
        b3 * self.cells[0] * self.cells[1] + b2 * self.cells[0] + b1
    }

    /// Cell coordinates of a flattened bin.
    #[must_use]
    pub const fn cell_of(&self, bin: usize) -> [usize; 3] {
        let plane = self.cells[0] * self.cells[1];
        [bin % self.cells[0], (bin / self.cells[0]) % self.cells[1], bin / plane]
    }
}

/// Computes the ODF bin of `q` relative to `reference`.
///
/// `q` is reduced by `symmetry` against `reference`, the resulting
/// disorientation is mapped to homochoric space and discretized on `grid`.
#[must_use]
pub fn bin_index(
    q: &Quaternion<f64>,
    reference: &Quaternion<f64>,
    symmetry: CrystalSymmetry,
    grid: &OdfGrid,
) -> usize {
    let miso = misorientation(symmetry, q, reference);
    grid.bin_of_point(&miso.homochoric())
}

/// Picks a bin from a distribution by inverse-CDF lookup.
///
/// A uniform draw is scaled by the total mass and the first bin whose running
/// sum exceeds it is returned. Rounding at the top end falls back to the last
/// bin.
///
/// # Example
///
/// ```
/// use texture_orient::choose_bin;
/// use texture_types::ReplaySource;
///
/// let odf = [0.0, 0.25, 0.75];
/// let mut rng = ReplaySource::new(vec![0.1, 0.5]);
/// assert_eq!(choose_bin(&odf, &mut rng), 1);
/// assert_eq!(choose_bin(&odf, &mut rng), 2);
/// ```
pub fn choose_bin<R: RandomSource + ?Sized>(distribution: &[f64], rng: &mut R) -> usize {
    let total: f64 = distribution.iter().sum();
    let target = rng.next_f64() * total;
    let mut cumulative = 0.0;
    for (bin, &mass) in distribution.iter().enumerate() {
        cumulative += mass;
        if cumulative > target {
            return bin;
        }
    }
    distribution.len().saturating_sub(1)
}

/// Maps orientations to ODF bins for one symmetry and reference orientation.
///
/// The reference is the identity built through the Euler formula at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationBinner {
    grid: OdfGrid,
    reference: Quaternion<f64>,
}

impl OrientationBinner {
    /// Binner on the standard grid for `symmetry`.
    #[must_use]
    pub fn new(symmetry: CrystalSymmetry) -> Self {
        Self::with_grid(OdfGrid::for_symmetry(symmetry))
    }

    /// Binner on a custom grid.
    #[must_use]
    pub fn with_grid(grid: OdfGrid) -> Self {
        Self {
            grid,
            reference: EulerAngles::zero().to_quaternion(),
        }
    }

    /// The grid in use.
    #[must_use]
    pub const fn grid(&self) -> &OdfGrid {
        &self.grid
    }

    /// Symmetry of the grid.
    #[must_use]
    pub const fn symmetry(&self) -> CrystalSymmetry {
        self.grid.symmetry
    }

    /// Number of ODF bins.
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.grid.num_bins()
    }

    /// Reference quaternion.
    #[must_use]
    pub const fn reference(&self) -> &Quaternion<f64> {
        &self.reference
    }

    /// Bin of an orientation quaternion.
    #[must_use]
    pub fn bin_index(&self, q: &Quaternion<f64>) -> usize {
        bin_index(q, &self.reference, self.grid.symmetry, &self.grid)
    }

    /// Bin of an orientation given as Euler angles.
    #[must_use]
    pub fn bin_for_euler(&self, euler: EulerAngles) -> usize {
        self.bin_index(&euler.to_quaternion())
    }

    /// Draws an orientation lying inside homochoric cell `bin`.
    ///
    /// A uniform point in the cell gives the rotation axis and, through the
    /// inverse homochoric map, the rotation angle. The rotation is applied to
    /// the reference orientation. Out-of-range bins are clamped to the last
    /// cell.
    pub fn sample_euler<R: RandomSource + ?Sized>(&self, bin: usize, rng: &mut R) -> EulerAngles {
        let bin = bin.min(self.grid.num_bins() - 1);
        let cell = self.grid.cell_of(bin);
        let step = self.grid.step();
        let h = Vector3::new(
            step[0] * (cell[0] as f64 + rng.next_f64()),
            step[1] * (cell[1] as f64 + rng.next_f64()),
            step[2] * (cell[2] as f64 + rng.next_f64()),
        );
        let radius = h.norm();
        if radius <= f64::EPSILON {
            return EulerAngles::from_quaternion(&self.reference);
        }
        let angle = angle_from_homochoric_radius(radius);
        let axis = h / radius;
        let (s, c) = (0.5 * angle).sin_cos();
        let rotation = Quaternion::from_parts(c, axis * s);
        EulerAngles::from_quaternion(&(self.reference * rotation))
    }
}
