//! The shared state every Monte Carlo trial reads and mutates.

use texture_orient::{MisorientationBins, OdfGrid, OrientationBinner, choose_bin, misorientation};
use texture_types::{
    CrystalSymmetry, EulerAngles, Grain, GrainId, RandomSource, Result, TextureError,
};

use crate::graph::NeighborGraph;
use crate::histogram::Histograms;

/// Grains, adjacency and histograms of one texture-matching run.
///
/// Built once and threaded through every step call. It is `Clone + PartialEq`
/// so a trial can be checked for side effects by snapshot comparison.
///
/// Slot 0 of the grain list is reserved and never selected.
///
/// A state covers a single phase. For multi-phase microstructures build one
/// state per phase and leave boundaries to grains of other phases out of its
/// graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    binner: OrientationBinner,
    mdf_bins: MisorientationBins,
    grains: Vec<Grain>,
    graph: NeighborGraph,
    histograms: Histograms,
    voxel_volume: f64,
    interior_volume: f64,
    total_surface_area: f64,
}

impl SimulationState {
    /// Builds a state on the standard ODF grid and MDF bins for `symmetry`.
    ///
    /// Cached misorientations and both simulated histograms are measured from
    /// the current grain orientations.
    ///
    /// # Errors
    ///
    /// Fails when the graph and grain list differ in size, fewer than two
    /// grains are interior, the interior volume is zero, the voxel volume is
    /// not positive, or a target histogram has the wrong length.
    pub fn new(
        symmetry: CrystalSymmetry,
        grains: Vec<Grain>,
        graph: NeighborGraph,
        actual_odf: Vec<f64>,
        actual_mdf: Vec<f64>,
        voxel_volume: f64,
    ) -> Result<Self> {
        Self::with_bins(
            OdfGrid::for_symmetry(symmetry),
            MisorientationBins::for_symmetry(symmetry),
            grains,
            graph,
            actual_odf,
            actual_mdf,
            voxel_volume,
        )
    }

    /// Builds a state on a custom ODF grid and MDF binning.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::new`].
    pub fn with_bins(
        grid: OdfGrid,
        mdf_bins: MisorientationBins,
        grains: Vec<Grain>,
        graph: NeighborGraph,
        actual_odf: Vec<f64>,
        actual_mdf: Vec<f64>,
        voxel_volume: f64,
    ) -> Result<Self> {
        if graph.num_grains() != grains.len() {
            return Err(TextureError::invalid_input(format!(
                "neighbor graph has {} slots for {} grains",
                graph.num_grains(),
                grains.len()
            )));
        }
        if !(voxel_volume > 0.0 && voxel_volume.is_finite()) {
            return Err(TextureError::invalid_input(format!(
                "voxel volume must be positive, got {voxel_volume}"
            )));
        }
        let interior = grains.iter().skip(1).filter(|g| g.is_interior()).count();
        if interior < 2 {
            return Err(TextureError::InsufficientInteriorGrains { found: interior });
        }
        let interior_volume: f64 = grains
            .iter()
            .skip(1)
            .filter(|g| g.is_interior())
            .map(|g| g.volume(voxel_volume))
            .sum();
        if interior_volume <= 0.0 {
            return Err(TextureError::invalid_input("interior grains hold no voxels"));
        }

        let histograms =
            Histograms::new(actual_odf, grid.num_bins(), actual_mdf, mdf_bins.num_bins())?;

        let mut state = Self {
            binner: OrientationBinner::with_grid(grid),
            mdf_bins,
            grains,
            graph,
            histograms,
            voxel_volume,
            interior_volume,
            total_surface_area: 0.0,
        };
        state.total_surface_area = state.counted_surface_area();
        state.recompute_histograms();
        Ok(state)
    }

    /// Crystal symmetry of the run.
    #[must_use]
    pub const fn symmetry(&self) -> CrystalSymmetry {
        self.binner.symmetry()
    }

    /// ODF binner.
    #[must_use]
    pub const fn binner(&self) -> &OrientationBinner {
        &self.binner
    }

    /// MDF binning.
    #[must_use]
    pub const fn mdf_bins(&self) -> &MisorientationBins {
        &self.mdf_bins
    }

    /// Number of grain slots, including slot 0.
    #[must_use]
    pub fn num_grains(&self) -> usize {
        self.grains.len()
    }

    /// All grain slots.
    #[must_use]
    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    /// One grain.
    #[must_use]
    pub fn grain(&self, id: GrainId) -> &Grain {
        &self.grains[id.index()]
    }

    /// Neighbor graph.
    #[must_use]
    pub const fn graph(&self) -> &NeighborGraph {
        &self.graph
    }

    /// Histograms.
    #[must_use]
    pub const fn histograms(&self) -> &Histograms {
        &self.histograms
    }

    /// Volume of one voxel.
    #[must_use]
    pub const fn voxel_volume(&self) -> f64 {
        self.voxel_volume
    }

    /// Total volume of interior grains.
    #[must_use]
    pub const fn interior_volume(&self) -> f64 {
        self.interior_volume
    }

    /// Sum of shared areas over the pairs counted in the MDF.
    #[must_use]
    pub const fn total_surface_area(&self) -> f64 {
        self.total_surface_area
    }

    /// ODF weight of a grain: its share of the interior volume.
    #[must_use]
    pub fn volume_fraction(&self, id: GrainId) -> f64 {
        self.grains[id.index()].volume(self.voxel_volume) / self.interior_volume
    }

    /// MDF weight of a shared boundary.
    #[must_use]
    pub fn area_fraction(&self, area: f64) -> f64 {
        if self.total_surface_area > 0.0 {
            area / self.total_surface_area
        } else {
            0.0
        }
    }

    /// ODF bin of a grain's current orientation.
    #[must_use]
    pub fn odf_bin(&self, id: GrainId) -> usize {
        self.binner.bin_index(self.grains[id.index()].quaternion())
    }

    /// Misorientation angle between two grains, evaluated in id order.
    #[must_use]
    pub fn pair_misorientation(&self, a: GrainId, b: GrainId) -> f64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        misorientation(
            self.symmetry(),
            self.grains[lo.index()].quaternion(),
            self.grains[hi.index()].quaternion(),
        )
        .angle
    }

    /// Whether the boundary between `a` and `b` is counted in the MDF.
    #[must_use]
    pub fn counts_in_mdf(&self, a: GrainId, b: GrainId) -> bool {
        self.grains[a.index()].is_interior() || self.grains[b.index()].is_interior()
    }

    fn counted_surface_area(&self) -> f64 {
        self.graph
            .pairs()
            .filter(|&(a, b, _)| self.counts_in_mdf(a, b))
            .map(|(a, _, k)| self.graph.shared_areas(a)[k])
            .sum()
    }

    /// Recomputes every cached neighbor misorientation from the current
    /// orientations and rebuilds the simulated MDF.
    pub fn measure_misorientations(&mut self) {
        let pairs: Vec<_> = self.graph.pairs().collect();
        let mut mdf = vec![0.0; self.mdf_bins.num_bins()];
        for (a, b, k) in pairs {
            let angle = self.pair_misorientation(a, b);
            self.graph.set_misorientation(a, k, angle);
            if self.counts_in_mdf(a, b) {
                let weight = self.area_fraction(self.graph.shared_areas(a)[k]);
                mdf[self.mdf_bins.bin(angle)] += weight;
            }
        }
        self.histograms.set_simulated_mdf(mdf);
    }

    /// Rebuilds both simulated histograms and every cached misorientation
    /// from scratch.
    ///
    /// The optimizer never needs this; it keeps the histograms in step
    /// incrementally.
    pub fn recompute_histograms(&mut self) {
        self.histograms.clear_simulated();
        for g in 1..self.grains.len() {
            let id = GrainId::from_index(g);
            if self.grains[g].is_interior() {
                let bin = self.odf_bin(id);
                let fraction = self.volume_fraction(id);
                self.histograms.odf_delta(bin, fraction);
            }
        }
        self.measure_misorientations();
    }

    /// Gives every grain an orientation drawn from the target ODF, then
    /// re-measures the histograms.
    pub fn assign_orientations<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        for g in 1..self.grains.len() {
            let bin = choose_bin(self.histograms.actual_odf(), rng);
            let euler = self.binner.sample_euler(bin, rng);
            self.grains[g].set_orientation(euler);
        }
        self.recompute_histograms();
    }

    /// Euler angles of each voxel from its owning grain.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::InvalidGrainId`] when a voxel names a grain
    /// outside the list.
    pub fn voxel_orientations(&self, voxel_grains: &[GrainId]) -> Result<Vec<EulerAngles>> {
        voxel_grains
            .iter()
            .map(|&id| {
                self.grains
                    .get(id.index())
                    .map(Grain::euler)
                    .ok_or(TextureError::InvalidGrainId {
                        id,
                        num_grains: self.grains.len(),
                    })
            })
            .collect()
    }

    pub(crate) fn set_orientation(&mut self, id: GrainId, euler: EulerAngles) {
        self.grains[id.index()].set_orientation(euler);
    }

    pub(crate) fn graph_mut(&mut self) -> &mut NeighborGraph {
        &mut self.graph
    }

    pub(crate) fn histograms_mut(&mut self) -> &mut Histograms {
        &mut self.histograms
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grains() -> Vec<Grain> {
        vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), 10),
            Grain::new(EulerAngles::new(0.1, 0.1, 0.1), 30),
            Grain::surface(EulerAngles::new(0.3, 0.0, 0.0), 20),
        ]
    }

    fn build() -> SimulationState {
        let graph = NeighborGraph::from_pairs(4, &[(1, 2, 1.0), (2, 3, 3.0)]).unwrap();
        let mut odf = vec![0.0; 5832];
        odf[0] = 1.0;
        let mdf = vec![1.0 / 13.0; 13];
        SimulationState::new(CrystalSymmetry::Cubic, grains(), graph, odf, mdf, 1.0).unwrap()
    }

    #[test]
    fn test_odf_counts_interior_grains_only() {
        let state = build();
        assert_relative_eq!(state.interior_volume(), 40.0);
        let odf = state.histograms().simulated_odf();
        assert_relative_eq!(odf[0], 0.25);
        assert_relative_eq!(odf[state.odf_bin(GrainId::new(2))], 0.75);
        assert_relative_eq!(odf.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mdf_uses_counted_pairs() {
        let state = build();
        assert_relative_eq!(state.total_surface_area(), 4.0);
        let mdf = state.histograms().simulated_mdf();
        assert_relative_eq!(mdf.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cache_is_symmetric() {
        let state = build();
        let a = state.graph().misorientations(GrainId::new(2));
        let b = state.graph().misorientations(GrainId::new(1));
        let c = state.graph().misorientations(GrainId::new(3));
        assert_eq!(a[0], b[0]);
        assert_eq!(a[1], c[0]);
        assert!(b[0] > 0.0);
    }

    #[test]
    fn test_surface_pair_excluded_from_mdf() {
        let g = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), 1),
            Grain::new(EulerAngles::zero(), 1),
            Grain::surface(EulerAngles::zero(), 1),
            Grain::surface(EulerAngles::zero(), 1),
        ];
        let graph = NeighborGraph::from_pairs(5, &[(1, 2, 1.0), (3, 4, 5.0)]).unwrap();
        let state = SimulationState::new(
            CrystalSymmetry::Cubic,
            g,
            graph,
            vec![0.0; 5832],
            vec![0.0; 13],
            1.0,
        )
        .unwrap();
        assert_relative_eq!(state.total_surface_area(), 1.0);
        assert_relative_eq!(state.histograms().simulated_mdf()[0], 1.0);
    }

    #[test]
    fn test_rejects_single_interior_grain() {
        let g = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), 1),
            Grain::surface(EulerAngles::zero(), 1),
        ];
        let err = SimulationState::new(
            CrystalSymmetry::Cubic,
            g,
            NeighborGraph::empty(3),
            vec![0.0; 5832],
            vec![0.0; 13],
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, TextureError::InsufficientInteriorGrains { found: 1 }));
    }

    #[test]
    fn test_rejects_wrong_histogram_length() {
        let graph = NeighborGraph::empty(4);
        let err = SimulationState::new(
            CrystalSymmetry::Hexagonal,
            grains(),
            graph,
            vec![0.0; 5832],
            vec![0.0; 19],
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, TextureError::HistogramLength { expected: 15552, .. }));
    }

    #[test]
    fn test_rejects_graph_size_mismatch() {
        let err = SimulationState::new(
            CrystalSymmetry::Cubic,
            grains(),
            NeighborGraph::empty(3),
            vec![0.0; 5832],
            vec![0.0; 13],
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, TextureError::InvalidInput(_)));
    }

    #[test]
    fn test_assign_orientations_follows_target() {
        let mut state = build();
        let mut rng = StdRng::seed_from_u64(42);
        state.assign_orientations(&mut rng);
        // every grain lands in bin 0, the only populated target bin
        for g in 1..4 {
            assert_eq!(state.odf_bin(GrainId::new(g)), 0);
        }
        assert_relative_eq!(state.histograms().simulated_odf()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(state.histograms().odf_error(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut state = build();
        let before = state.clone();
        state.recompute_histograms();
        assert_eq!(state, before);
    }

    #[test]
    fn test_voxel_orientations() {
        let state = build();
        let voxels = [GrainId::new(1), GrainId::new(2), GrainId::new(2)];
        let eulers = state.voxel_orientations(&voxels).unwrap();
        assert_eq!(eulers[0], EulerAngles::zero());
        assert_eq!(eulers[2], EulerAngles::new(0.1, 0.1, 0.1));
        assert!(state.voxel_orientations(&[GrainId::new(9)]).is_err());
    }
}
