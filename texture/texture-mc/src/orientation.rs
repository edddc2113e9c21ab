//! Orientation moves: switching two grains' orientations and swapping one
//! grain's orientation for a fresh sample from the target ODF.
//!
//! Each trial is computed first and applied only on acceptance, so a
//! rejected trial leaves the state untouched. The acceptance rule is greedy:
//! a move is taken iff it lowers the summed squared ODF and MDF error.

use texture_orient::{choose_bin, misorientation};
use texture_types::{EulerAngles, GrainId, Quaternion, RandomSource, select_grain_index};

use crate::state::SimulationState;

/// Result of one Monte Carlo trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The move improved the fit and was applied.
    Accepted,
    /// The move was discarded.
    Rejected,
}

impl TrialOutcome {
    /// `true` for [`TrialOutcome::Accepted`].
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A fully evaluated move that has not been applied yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveEvaluation {
    /// Decrease in squared ODF error if applied.
    pub odf_change: f64,
    /// Decrease in squared MDF error if applied.
    pub mdf_change: f64,
    orientations: Vec<(GrainId, EulerAngles)>,
    odf_updates: Vec<(usize, f64)>,
    mdf_updates: Vec<(usize, f64)>,
    cache_updates: Vec<(GrainId, usize, f64)>,
}

impl MoveEvaluation {
    fn new() -> Self {
        Self {
            odf_change: 0.0,
            mdf_change: 0.0,
            orientations: Vec::with_capacity(2),
            odf_updates: Vec::with_capacity(2),
            mdf_updates: Vec::new(),
            cache_updates: Vec::new(),
        }
    }

    /// Combined improvement with unit weights.
    #[must_use]
    pub fn total_change(&self) -> f64 {
        self.odf_change + self.mdf_change
    }

    /// Whether the move would be accepted.
    #[must_use]
    pub fn improves(&self) -> bool {
        self.total_change() > 0.0
    }

    /// Adds the ODF change of moving `delta` into `bin`.
    fn add_odf(&mut self, state: &SimulationState, bin: usize, delta: f64) {
        self.odf_change += state.histograms().odf_change(bin, delta);
        self.odf_updates.push((bin, delta));
    }

    /// Adds the MDF change of `grain` taking orientation `q`, over every
    /// neighbor except `skip`.
    fn add_neighbors(
        &mut self,
        state: &SimulationState,
        grain: GrainId,
        q: &Quaternion<f64>,
        skip: Option<GrainId>,
    ) {
        let graph = state.graph();
        let neighbors = graph.neighbors(grain);
        let cached = graph.misorientations(grain);
        let areas = graph.shared_areas(grain);
        for (k, &neighbor) in neighbors.iter().enumerate() {
            if Some(neighbor) == skip {
                continue;
            }
            let weight = state.area_fraction(areas[k]);
            let current_bin = state.mdf_bins().bin(cached[k]);
            let angle = hypothetical_misorientation(state, grain, q, neighbor);
            let new_bin = state.mdf_bins().bin(angle);

            let histograms = state.histograms();
            self.mdf_change += histograms.mdf_change(current_bin, -weight);
            self.mdf_change += histograms.mdf_change(new_bin, weight);
            self.mdf_updates.push((current_bin, -weight));
            self.mdf_updates.push((new_bin, weight));
            self.cache_updates.push((grain, k, angle));
        }
    }

    /// Commits every pending update.
    fn apply(self, state: &mut SimulationState) {
        for (grain, euler) in self.orientations {
            state.set_orientation(grain, euler);
        }
        let histograms = state.histograms_mut();
        for (bin, delta) in self.odf_updates {
            histograms.odf_delta(bin, delta);
        }
        for (bin, delta) in self.mdf_updates {
            histograms.mdf_delta(bin, delta);
        }
        let graph = state.graph_mut();
        for (grain, index, angle) in self.cache_updates {
            graph.set_misorientation(grain, index, angle);
        }
    }
}

/// Misorientation of the pair if `grain` had orientation `q`, evaluated in id
/// order so it matches a from-scratch measurement.
fn hypothetical_misorientation(
    state: &SimulationState,
    grain: GrainId,
    q: &Quaternion<f64>,
    neighbor: GrainId,
) -> f64 {
    let other = state.grain(neighbor).quaternion();
    let m = if grain < neighbor {
        misorientation(state.symmetry(), q, other)
    } else {
        misorientation(state.symmetry(), other, q)
    };
    m.angle
}

/// Draws one interior grain, resampling while the draw lands on a surface
/// grain.
///
/// Terminates because a validated [`SimulationState`] holds at least two
/// interior grains.
pub fn propose_grain<R: RandomSource + ?Sized>(state: &SimulationState, rng: &mut R) -> GrainId {
    loop {
        let g = GrainId::from_index(select_grain_index(rng, state.num_grains()));
        if state.grain(g).is_interior() {
            return g;
        }
    }
}

/// Draws a grain pair, resampling both while either is a surface grain.
pub fn propose_pair<R: RandomSource + ?Sized>(
    state: &SimulationState,
    rng: &mut R,
) -> (GrainId, GrainId) {
    let n = state.num_grains();
    loop {
        let g1 = GrainId::from_index(select_grain_index(rng, n));
        let g2 = GrainId::from_index(select_grain_index(rng, n));
        if state.grain(g1).is_interior() && state.grain(g2).is_interior() {
            return (g1, g2);
        }
    }
}

/// Evaluates exchanging the orientations of `g1` and `g2`.
///
/// Both ODF bins receive their delta even when they coincide, and each
/// grain's neighbor pass skips only the partner.
#[must_use]
pub fn evaluate_switch(state: &SimulationState, g1: GrainId, g2: GrainId) -> MoveEvaluation {
    let e1 = state.grain(g1).euler();
    let e2 = state.grain(g2).euler();
    let bin_a = state.odf_bin(g1);
    let bin_b = state.odf_bin(g2);
    let v1 = state.volume_fraction(g1);
    let v2 = state.volume_fraction(g2);

    let mut eval = MoveEvaluation::new();
    eval.add_odf(state, bin_a, v2 - v1);
    eval.add_odf(state, bin_b, v1 - v2);

    let q2 = e2.to_quaternion();
    eval.add_neighbors(state, g1, &q2, Some(g2));
    let q1 = e1.to_quaternion();
    eval.add_neighbors(state, g2, &q1, Some(g1));

    // The pair's own boundary stays out of the MDF delta, but its cache entry
    // is re-measured so it matches a fresh measurement bit for bit.
    if let Some(k) = state.graph().neighbors(g1).iter().position(|&n| n == g2) {
        let angle = if g1 < g2 {
            misorientation(state.symmetry(), &q2, &q1).angle
        } else {
            misorientation(state.symmetry(), &q1, &q2).angle
        };
        eval.cache_updates.push((g1, k, angle));
    }

    eval.orientations.push((g1, e2));
    eval.orientations.push((g2, e1));
    eval
}

/// Evaluates giving `grain` the orientation `euler`.
#[must_use]
pub fn evaluate_swap_out(
    state: &SimulationState,
    grain: GrainId,
    euler: EulerAngles,
) -> MoveEvaluation {
    let old_bin = state.odf_bin(grain);
    let q = euler.to_quaternion();
    let new_bin = state.binner().bin_index(&q);
    let v = state.volume_fraction(grain);

    let mut eval = MoveEvaluation::new();
    eval.add_odf(state, new_bin, v);
    eval.add_odf(state, old_bin, -v);
    eval.add_neighbors(state, grain, &q, None);
    eval.orientations.push((grain, euler));
    eval
}

fn settle(state: &mut SimulationState, eval: MoveEvaluation, bad_tries: &mut u64) -> TrialOutcome {
    if eval.improves() {
        eval.apply(state);
        *bad_tries = 0;
        TrialOutcome::Accepted
    } else {
        *bad_tries += 1;
        TrialOutcome::Rejected
    }
}

/// One switch trial: pick two interior grains, evaluate exchanging their
/// orientations and apply the exchange iff it improves the fit.
///
/// `bad_tries` is reset on acceptance and incremented on rejection.
///
/// # Example
///
/// ```
/// use texture_mc::{NeighborGraph, SimulationState, switch_orientations};
/// use texture_types::{CrystalSymmetry, EulerAngles, Grain, ReplaySource};
///
/// let grains = vec![
///     Grain::placeholder(),
///     Grain::new(EulerAngles::zero(), 10),
///     Grain::new(EulerAngles::zero(), 10),
/// ];
/// let graph = NeighborGraph::from_pairs(3, &[(1, 2, 1.0)]).unwrap();
/// let mut state = SimulationState::new(
///     CrystalSymmetry::Cubic, grains, graph, vec![0.0; 5832], vec![0.0; 13], 1.0,
/// ).unwrap();
///
/// // identical orientations cannot improve anything
/// let mut bad = 0;
/// let mut rng = ReplaySource::new(vec![0.4, 0.9]);
/// let outcome = switch_orientations(&mut state, &mut rng, &mut bad);
/// assert!(!outcome.is_accepted());
/// assert_eq!(bad, 1);
/// ```
pub fn switch_orientations<R: RandomSource + ?Sized>(
    state: &mut SimulationState,
    rng: &mut R,
    bad_tries: &mut u64,
) -> TrialOutcome {
    let (g1, g2) = propose_pair(state, rng);
    let eval = evaluate_switch(state, g1, g2);
    settle(state, eval, bad_tries)
}

/// One swap-out trial: pick an interior grain and a fresh orientation from
/// the target ODF, and apply it iff it improves the fit.
pub fn swap_out_orientation<R: RandomSource + ?Sized>(
    state: &mut SimulationState,
    rng: &mut R,
    bad_tries: &mut u64,
) -> TrialOutcome {
    let grain = propose_grain(state, rng);
    let bin = choose_bin(state.histograms().actual_odf(), rng);
    let euler = state.binner().sample_euler(bin, rng);
    let eval = evaluate_swap_out(state, grain, euler);
    settle(state, eval, bad_tries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::NeighborGraph;
    use approx::assert_relative_eq;
    use texture_types::{CrystalSymmetry, Grain, ReplaySource};

    fn target_bin_zero() -> Vec<f64> {
        let mut odf = vec![0.0; 5832];
        odf[0] = 1.0;
        odf
    }

    fn two_grains(v1: usize, v2: usize) -> SimulationState {
        let grains = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), v1),
            Grain::new(EulerAngles::new(0.1, 0.1, 0.1), v2),
        ];
        let graph = NeighborGraph::from_pairs(3, &[(1, 2, 1.0)]).unwrap();
        SimulationState::new(
            CrystalSymmetry::Cubic,
            grains,
            graph,
            target_bin_zero(),
            vec![0.0; 13],
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_switch_moves_bigger_grain_into_target_bin() {
        let mut state = two_grains(10, 30);
        let g1 = GrainId::new(1);
        let g2 = GrainId::new(2);
        let bin_b = state.odf_bin(g2);
        assert_ne!(bin_b, 0);

        let eval = evaluate_switch(&state, g1, g2);
        // (1 - .25)^2 - (1 - .75)^2 at bin 0, (.75)^2 - (.25)^2 at bin B
        assert_relative_eq!(eval.odf_change, 1.0, epsilon = 1e-12);
        // partners are excluded from each other's neighbor pass
        assert_eq!(eval.mdf_change, 0.0);

        let mut bad = 7;
        let mut rng = ReplaySource::new(vec![0.5, 0.9]);
        assert!(switch_orientations(&mut state, &mut rng, &mut bad).is_accepted());
        assert_eq!(bad, 0);
        assert_eq!(state.grain(g1).euler(), EulerAngles::new(0.1, 0.1, 0.1));
        assert_eq!(state.grain(g2).euler(), EulerAngles::zero());
        assert_relative_eq!(state.histograms().simulated_odf()[0], 0.75, epsilon = 1e-12);
        assert_relative_eq!(state.histograms().simulated_odf()[bin_b], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_rejected_switch_leaves_state_untouched() {
        let mut state = two_grains(30, 10);
        let before = state.clone();
        let mut bad = 3;
        let mut rng = ReplaySource::new(vec![0.5, 0.9]);
        let outcome = switch_orientations(&mut state, &mut rng, &mut bad);
        assert_eq!(outcome, TrialOutcome::Rejected);
        assert_eq!(bad, 4);
        assert_eq!(state, before);
    }

    #[test]
    fn test_self_switch_is_never_accepted() {
        let state = two_grains(10, 30);
        let g = GrainId::new(2);
        let eval = evaluate_switch(&state, g, g);
        assert_eq!(eval.odf_change, 0.0);
        assert!(!eval.improves());
    }

    #[test]
    fn test_same_bin_deltas_are_both_applied() {
        let grains = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), 10),
            Grain::new(EulerAngles::new(0.01, 0.0, 0.0), 30),
        ];
        let graph = NeighborGraph::empty(3);
        let state = SimulationState::new(
            CrystalSymmetry::Cubic,
            grains,
            graph,
            target_bin_zero(),
            vec![0.0; 13],
            1.0,
        )
        .unwrap();
        let eval = evaluate_switch(&state, GrainId::new(1), GrainId::new(2));
        // both deltas hit bin 0: -2 d^2 with d = 0.5
        assert_relative_eq!(eval.odf_change, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_swap_out_toward_target() {
        let mut state = two_grains(10, 30);
        let g2 = GrainId::new(2);
        let eval = evaluate_swap_out(&state, g2, EulerAngles::zero());
        assert!(eval.odf_change > 0.0);
        assert_eq!(eval.orientations, vec![(g2, EulerAngles::zero())]);

        // draws: grain 2, bin 0, then the point inside bin 0
        let mut bad = 0;
        let mut rng = ReplaySource::new(vec![0.9, 0.5, 0.1, 0.1, 0.1]);
        let outcome = swap_out_orientation(&mut state, &mut rng, &mut bad);
        assert!(outcome.is_accepted());
        assert_eq!(state.odf_bin(g2), 0);
        assert_relative_eq!(state.histograms().simulated_odf()[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_accepted_switch_keeps_cache_current() {
        let grains = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), 10),
            Grain::new(EulerAngles::new(0.1, 0.1, 0.1), 30),
            Grain::new(EulerAngles::new(0.5, 0.2, 0.0), 20),
        ];
        let graph = NeighborGraph::from_pairs(4, &[(1, 2, 1.0), (1, 3, 2.0), (2, 3, 1.5)]).unwrap();
        let mut state = SimulationState::new(
            CrystalSymmetry::Cubic,
            grains,
            graph,
            target_bin_zero(),
            vec![1.0 / 13.0; 13],
            1.0,
        )
        .unwrap();
        let eval = evaluate_switch(&state, GrainId::new(1), GrainId::new(2));
        eval.apply(&mut state);

        let mut fresh = state.clone();
        fresh.recompute_histograms();
        for g in 1..4 {
            let id = GrainId::new(g);
            let cached = state.graph().misorientations(id);
            let measured = fresh.graph().misorientations(id);
            for (a, b) in cached.iter().zip(measured) {
                assert_relative_eq!(a, b, epsilon = 1e-12);
            }
        }
        for (a, b) in state
            .histograms()
            .simulated_mdf()
            .iter()
            .zip(fresh.histograms().simulated_mdf())
        {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_switched_neighbors_cache_matches_fresh_measurement() {
        let grains = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::new(0.3, 0.7, 1.1), 10),
            Grain::new(EulerAngles::new(1.9, 0.4, 0.2), 30),
            Grain::new(EulerAngles::new(0.5, 0.2, 2.6), 20),
        ];
        let graph = NeighborGraph::from_pairs(4, &[(1, 2, 1.0), (2, 3, 1.5)]).unwrap();
        let mut state = SimulationState::new(
            CrystalSymmetry::Cubic,
            grains,
            graph,
            target_bin_zero(),
            vec![1.0 / 13.0; 13],
            1.0,
        )
        .unwrap();

        for (a, b) in [(1, 2), (2, 1), (3, 2)] {
            let eval = evaluate_switch(&state, GrainId::new(a), GrainId::new(b));
            eval.apply(&mut state);
            let mut fresh = state.clone();
            fresh.recompute_histograms();
            assert_eq!(state.graph(), fresh.graph(), "after switching {a} and {b}");
        }
    }

    #[test]
    fn test_switching_back_restores_histograms() {
        let grains = vec![
            Grain::placeholder(),
            Grain::new(EulerAngles::zero(), 10),
            Grain::new(EulerAngles::new(0.1, 0.1, 0.1), 30),
            Grain::new(EulerAngles::new(0.9, 0.4, 0.2), 20),
        ];
        let graph = NeighborGraph::from_pairs(4, &[(1, 2, 1.0), (1, 3, 2.0), (2, 3, 1.5)]).unwrap();
        let mut state = SimulationState::new(
            CrystalSymmetry::Cubic,
            grains,
            graph,
            target_bin_zero(),
            vec![1.0 / 13.0; 13],
            1.0,
        )
        .unwrap();
        let original = state.clone();
        let (g1, g2) = (GrainId::new(1), GrainId::new(3));

        let forward = evaluate_switch(&state, g1, g2);
        forward.apply(&mut state);
        let back = evaluate_switch(&state, g1, g2);
        back.apply(&mut state);

        assert_eq!(state.grains(), original.grains());
        let pairs = state
            .histograms()
            .simulated_odf()
            .iter()
            .zip(original.histograms().simulated_odf())
            .chain(
                state
                    .histograms()
                    .simulated_mdf()
                    .iter()
                    .zip(original.histograms().simulated_mdf()),
            );
        for (a, b) in pairs {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_propose_pair_skips_surface() {
        let grains = vec![
            Grain::placeholder(),
            Grain::surface(EulerAngles::zero(), 1),
            Grain::new(EulerAngles::zero(), 1),
            Grain::new(EulerAngles::zero(), 1),
        ];
        let state = SimulationState::new(
            CrystalSymmetry::Cubic,
            grains,
            NeighborGraph::empty(4),
            vec![0.0; 5832],
            vec![0.0; 13],
            1.0,
        )
        .unwrap();
        // first attempt draws grain 1 (surface), second attempt 2 and 3
        let mut rng = ReplaySource::new(vec![0.3, 0.6, 0.6, 0.9]);
        assert_eq!(propose_pair(&state, &mut rng), (GrainId::new(2), GrainId::new(3)));
        assert_eq!(rng.draws(), 4);
    }
}
