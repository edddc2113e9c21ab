//! Texture-matching driver loop.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use texture_types::{MatchConfig, RandomSource, Result};

use crate::orientation::{TrialOutcome, swap_out_orientation, switch_orientations};
use crate::state::SimulationState;

/// Why a matching run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    /// `max_bad_tries` consecutive trials were rejected.
    Converged,
    /// The iteration budget ran out first.
    IterationLimit,
}

/// Summary of a matching run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchReport {
    /// Trials performed.
    pub iterations: u64,
    /// Trials accepted.
    pub accepted: u64,
    /// Accepted switch moves.
    pub switches_accepted: u64,
    /// Accepted swap-out moves.
    pub swap_outs_accepted: u64,
    /// Consecutive rejections at the end of the run.
    pub bad_tries: u64,
    /// Squared ODF error before the run.
    pub initial_odf_error: f64,
    /// Squared MDF error before the run.
    pub initial_mdf_error: f64,
    /// Squared ODF error after the run.
    pub final_odf_error: f64,
    /// Squared MDF error after the run.
    pub final_mdf_error: f64,
    /// Stop condition that ended the run.
    pub stop_reason: StopReason,
}

impl MatchReport {
    /// Fraction of trials that were accepted.
    #[must_use]
    pub fn acceptance_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.accepted as f64 / self.iterations as f64
        }
    }
}

impl std::fmt::Display for MatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Texture match: {} trials, {} accepted, ODF error {:.3e} -> {:.3e}, MDF error {:.3e} -> {:.3e}",
            self.iterations,
            self.accepted,
            self.initial_odf_error,
            self.final_odf_error,
            self.initial_mdf_error,
            self.final_mdf_error
        )
    }
}

/// Runs switch and swap-out trials until the fit stops improving.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use texture_mc::{NeighborGraph, SimulationState, TextureMatcher};
/// use texture_types::{CrystalSymmetry, EulerAngles, Grain, MatchConfig};
///
/// let grains = vec![
///     Grain::placeholder(),
///     Grain::new(EulerAngles::zero(), 4),
///     Grain::new(EulerAngles::new(0.3, 0.2, 0.1), 4),
/// ];
/// let graph = NeighborGraph::from_pairs(3, &[(1, 2, 1.0)]).unwrap();
/// let mut odf = vec![0.0; 5832];
/// odf[0] = 1.0;
/// let state = SimulationState::new(
///     CrystalSymmetry::Cubic, grains, graph, odf, vec![0.0; 13], 1.0,
/// ).unwrap();
///
/// let config = MatchConfig::default().with_max_iterations(200).with_max_bad_tries(50);
/// let mut matcher = TextureMatcher::new(state, config).unwrap();
/// let report = matcher.run(&mut StdRng::seed_from_u64(1));
///
/// assert!(report.final_odf_error <= report.initial_odf_error);
/// ```
#[derive(Debug, Clone)]
pub struct TextureMatcher {
    state: SimulationState,
    config: MatchConfig,
}

impl TextureMatcher {
    /// Creates a matcher over a prepared state.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(state: SimulationState, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { state, config })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Consumes the matcher and returns the state.
    #[must_use]
    pub fn into_state(self) -> SimulationState {
        self.state
    }

    /// Runs trials while fewer than `max_bad_tries` consecutive rejections
    /// have occurred and the iteration budget lasts.
    pub fn run<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> MatchReport {
        let initial_odf_error = self.state.histograms().odf_error();
        let initial_mdf_error = self.state.histograms().mdf_error();
        info!(
            grains = self.state.num_grains() - 1,
            symmetry = %self.state.symmetry(),
            odf_error = initial_odf_error,
            mdf_error = initial_mdf_error,
            "Starting texture matching"
        );

        let mut iterations = 0_u64;
        let mut bad_tries = 0_u64;
        let mut switches_accepted = 0_u64;
        let mut swap_outs_accepted = 0_u64;

        while bad_tries < self.config.max_bad_tries && iterations < self.config.max_iterations {
            iterations += 1;
            if rng.next_f64() < self.config.swap_out_probability {
                let outcome = swap_out_orientation(&mut self.state, rng, &mut bad_tries);
                if outcome == TrialOutcome::Accepted {
                    swap_outs_accepted += 1;
                }
            } else {
                let outcome = switch_orientations(&mut self.state, rng, &mut bad_tries);
                if outcome == TrialOutcome::Accepted {
                    switches_accepted += 1;
                }
            }

            if self.config.progress_interval > 0 && iterations % self.config.progress_interval == 0 {
                debug!(
                    iterations,
                    bad_tries,
                    odf_error = self.state.histograms().odf_error(),
                    mdf_error = self.state.histograms().mdf_error(),
                    "Texture matching progress"
                );
            }
        }

        let stop_reason = if bad_tries >= self.config.max_bad_tries {
            StopReason::Converged
        } else {
            warn!(
                iterations,
                bad_tries, "Texture matching stopped on the iteration limit"
            );
            StopReason::IterationLimit
        };

        let report = MatchReport {
            iterations,
            accepted: switches_accepted + swap_outs_accepted,
            switches_accepted,
            swap_outs_accepted,
            bad_tries,
            initial_odf_error,
            initial_mdf_error,
            final_odf_error: self.state.histograms().odf_error(),
            final_mdf_error: self.state.histograms().mdf_error(),
            stop_reason,
        };
        info!(
            iterations = report.iterations,
            accepted = report.accepted,
            odf_error = report.final_odf_error,
            mdf_error = report.final_mdf_error,
            "Texture matching complete"
        );
        report
    }
}
