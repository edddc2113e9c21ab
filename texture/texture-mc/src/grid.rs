//! Dense voxel grid of grain ids.

use texture_types::{GrainId, Result, TextureError};

/// Grain id per voxel on a regular `nx x ny x nz` grid, x fastest.
///
/// # Example
///
/// ```
/// use texture_mc::GrainGrid;
/// use texture_types::GrainId;
///
/// let ids = vec![GrainId::new(1); 8];
/// let grid = GrainGrid::new([2, 2, 2], [0.5, 0.5, 0.5], ids).unwrap();
///
/// assert_eq!(grid.len(), 8);
/// assert_eq!(grid.voxel_volume(), 0.125);
/// assert_eq!(grid.coords(5), [1, 0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GrainGrid {
    dims: [usize; 3],
    resolution: [f64; 3],
    ids: Vec<GrainId>,
}

impl GrainGrid {
    /// Creates a grid from dimensions, per-axis resolution and voxel ids.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::EmptyGrid`] for a zero dimension,
    /// [`TextureError::GridSizeMismatch`] when `ids` has the wrong length and
    /// [`TextureError::InvalidResolution`] for a non-positive resolution.
    pub fn new(dims: [usize; 3], resolution: [f64; 3], ids: Vec<GrainId>) -> Result<Self> {
        let expected = dims[0] * dims[1] * dims[2];
        if expected == 0 {
            return Err(TextureError::EmptyGrid);
        }
        if ids.len() != expected {
            return Err(TextureError::GridSizeMismatch {
                dims,
                expected,
                actual: ids.len(),
            });
        }
        if resolution.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(TextureError::InvalidResolution(resolution));
        }
        Ok(Self {
            dims,
            resolution,
            ids,
        })
    }

    /// Grid dimensions.
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Voxel edge lengths.
    #[must_use]
    pub const fn resolution(&self) -> [f64; 3] {
        self.resolution
    }

    /// Volume of one voxel.
    #[must_use]
    pub fn voxel_volume(&self) -> f64 {
        self.resolution.iter().product()
    }

    /// Number of voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always `false` for a constructed grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Voxel ids in x-fastest order.
    #[must_use]
    pub fn ids(&self) -> &[GrainId] {
        &self.ids
    }

    /// Grain owning voxel `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> GrainId {
        self.ids[index]
    }

    pub(crate) fn set(&mut self, index: usize, id: GrainId) {
        self.ids[index] = id;
    }

    /// Flat index of `(x, y, z)`.
    #[must_use]
    pub const fn index_of(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    /// `(x, y, z)` of a flat index.
    #[must_use]
    pub const fn coords(&self, index: usize) -> [usize; 3] {
        let [nx, ny, _] = self.dims;
        [index % nx, (index / nx) % ny, index / (nx * ny)]
    }

    /// The six face neighbors of a voxel, `None` past the grid edge.
    ///
    /// Order is -z, -y, -x, +x, +y, +z.
    #[must_use]
    pub const fn face_neighbors(&self, index: usize) -> [Option<usize>; 6] {
        let [nx, ny, nz] = self.dims;
        let [x, y, z] = self.coords(index);
        let plane = nx * ny;
        [
            if z > 0 { Some(index - plane) } else { None },
            if y > 0 { Some(index - nx) } else { None },
            if x > 0 { Some(index - 1) } else { None },
            if x + 1 < nx { Some(index + 1) } else { None },
            if y + 1 < ny { Some(index + nx) } else { None },
            if z + 1 < nz { Some(index + plane) } else { None },
        ]
    }

    /// One past the largest grain id present.
    #[must_use]
    pub fn num_grains(&self) -> usize {
        self.ids.iter().map(|id| id.index() + 1).max().unwrap_or(1)
    }

    /// Voxel count per grain for grain slots `0..num_grains`.
    ///
    /// Ids at or beyond `num_grains` are ignored.
    #[must_use]
    pub fn grain_sizes(&self, num_grains: usize) -> Vec<usize> {
        let mut sizes = vec![0; num_grains];
        for id in &self.ids {
            if let Some(size) = sizes.get_mut(id.index()) {
                *size += 1;
            }
        }
        sizes
    }

    /// Rewrites every voxel id through `map`.
    pub(crate) fn relabel(&mut self, map: &[GrainId]) {
        for id in &mut self.ids {
            *id = map[id.index()];
        }
    }
}
