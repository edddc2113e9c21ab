//! Grain adjacency with cached misorientations.
//!
//! For every grain the graph holds three parallel sequences in fixed insertion
//! order: neighbor ids, cached misorientation angles and shared surface areas.
//! Topology never changes after construction; only the cached angles do.

use texture_types::{GrainId, Result, TextureError};

/// Adjacency lists over grain slots `0..num_grains`.
///
/// Each entry also remembers where the reverse entry sits in the neighbor's
/// list, so a pair's cached angle can be written on both sides at once.
///
/// # Example
///
/// ```
/// use texture_mc::NeighborGraph;
/// use texture_types::GrainId;
///
/// let graph = NeighborGraph::from_pairs(4, &[(1, 2, 1.5), (2, 3, 0.5)]).unwrap();
///
/// assert_eq!(graph.neighbors(GrainId::new(2)), &[GrainId::new(1), GrainId::new(3)]);
/// assert_eq!(graph.shared_areas(GrainId::new(2)), &[1.5, 0.5]);
/// assert_eq!(graph.misorientations(GrainId::new(2)), &[0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborGraph {
    ids: Vec<Vec<GrainId>>,
    misorientations: Vec<Vec<f64>>,
    areas: Vec<Vec<f64>>,
    mirror: Vec<Vec<usize>>,
}

impl NeighborGraph {
    /// A graph of `num_grains` slots with no adjacency.
    #[must_use]
    pub fn empty(num_grains: usize) -> Self {
        Self {
            ids: vec![Vec::new(); num_grains],
            misorientations: vec![Vec::new(); num_grains],
            areas: vec![Vec::new(); num_grains],
            mirror: vec![Vec::new(); num_grains],
        }
    }

    /// Builds the graph from per-grain neighbor and shared-area lists.
    ///
    /// Shared areas are read from the lower-id side of each pair and stored on
    /// both sides. Cached misorientations start at zero.
    ///
    /// # Errors
    ///
    /// Fails when the lists disagree in length, an id is out of range, a grain
    /// lists itself or lists a neighbor twice, an area is negative, or an
    /// adjacency is one-sided.
    pub fn from_lists(ids: Vec<Vec<GrainId>>, areas: Vec<Vec<f64>>) -> Result<Self> {
        let num_grains = ids.len();
        if areas.len() != num_grains {
            return Err(TextureError::invalid_input(format!(
                "{num_grains} neighbor lists but {} area lists",
                areas.len()
            )));
        }

        for (g, (neighbors, shared)) in ids.iter().zip(&areas).enumerate() {
            let grain = GrainId::from_index(g);
            if neighbors.len() != shared.len() {
                return Err(TextureError::NeighborListMismatch {
                    grain,
                    ids: neighbors.len(),
                    areas: shared.len(),
                });
            }
            for (k, &n) in neighbors.iter().enumerate() {
                if n.is_none() || n.index() >= num_grains {
                    return Err(TextureError::InvalidGrainId { id: n, num_grains });
                }
                if n == grain {
                    return Err(TextureError::invalid_input(format!(
                        "{grain} lists itself as a neighbor"
                    )));
                }
                if neighbors[..k].contains(&n) {
                    return Err(TextureError::invalid_input(format!(
                        "{grain} lists {n} more than once"
                    )));
                }
                if !(shared[k] >= 0.0 && shared[k].is_finite()) {
                    return Err(TextureError::invalid_input(format!(
                        "shared area between {grain} and {n} is {}",
                        shared[k]
                    )));
                }
            }
        }

        let mut mirror = Vec::with_capacity(num_grains);
        for (g, neighbors) in ids.iter().enumerate() {
            let grain = GrainId::from_index(g);
            let mut back = Vec::with_capacity(neighbors.len());
            for &n in neighbors {
                let position = ids[n.index()]
                    .iter()
                    .position(|&m| m == grain)
                    .ok_or(TextureError::AsymmetricNeighbors { a: grain, b: n })?;
                back.push(position);
            }
            mirror.push(back);
        }

        let mut areas = areas;
        for g in 0..num_grains {
            for k in 0..ids[g].len() {
                let n = ids[g][k].index();
                if n < g {
                    areas[g][k] = areas[n][mirror[g][k]];
                }
            }
        }

        let misorientations = ids.iter().map(|list| vec![0.0; list.len()]).collect();
        Ok(Self {
            ids,
            misorientations,
            areas,
            mirror,
        })
    }

    /// Builds the graph from undirected `(a, b, shared_area)` pairs.
    ///
    /// Each pair is appended to both grains' lists in input order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::from_lists`].
    pub fn from_pairs(num_grains: usize, pairs: &[(u32, u32, f64)]) -> Result<Self> {
        let mut ids = vec![Vec::new(); num_grains];
        let mut areas = vec![Vec::new(); num_grains];
        for &(a, b, area) in pairs {
            for (from, to) in [(a, b), (b, a)] {
                let slot = from as usize;
                if slot >= num_grains {
                    return Err(TextureError::InvalidGrainId {
                        id: GrainId::new(from),
                        num_grains,
                    });
                }
                ids[slot].push(GrainId::new(to));
                areas[slot].push(area);
            }
        }
        Self::from_lists(ids, areas)
    }

    /// Number of grain slots.
    #[must_use]
    pub fn num_grains(&self) -> usize {
        self.ids.len()
    }

    /// Neighbor ids of `grain` in insertion order.
    #[must_use]
    pub fn neighbors(&self, grain: GrainId) -> &[GrainId] {
        &self.ids[grain.index()]
    }

    /// Cached misorientation angles of `grain`, parallel to [`Self::neighbors`].
    #[must_use]
    pub fn misorientations(&self, grain: GrainId) -> &[f64] {
        &self.misorientations[grain.index()]
    }

    /// Shared surface areas of `grain`, parallel to [`Self::neighbors`].
    #[must_use]
    pub fn shared_areas(&self, grain: GrainId) -> &[f64] {
        &self.areas[grain.index()]
    }

    /// Writes the cached angle of the pair at `grain`'s list position `index`.
    ///
    /// The reverse entry in the neighbor's list is written too.
    pub fn set_misorientation(&mut self, grain: GrainId, index: usize, value: f64) {
        let g = grain.index();
        let n = self.ids[g][index].index();
        let back = self.mirror[g][index];
        self.misorientations[g][index] = value;
        self.misorientations[n][back] = value;
    }

    /// Iterates each undirected pair once as `(lower, higher, list position in lower)`.
    pub fn pairs(&self) -> impl Iterator<Item = (GrainId, GrainId, usize)> + '_ {
        self.ids.iter().enumerate().flat_map(|(g, list)| {
            list.iter().enumerate().filter_map(move |(k, &n)| {
                (n.index() > g).then(|| (GrainId::from_index(g), n, k))
            })
        })
    }

    /// Total number of directed neighbor entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.ids.iter().map(Vec::len).sum()
    }
}
