//! Monte Carlo texture matching for synthetic grain microstructures.
//!
//! Given grains with volumes and a boundary graph, the optimizer reassigns
//! crystal orientations until the simulated orientation distribution (ODF)
//! and misorientation distribution (MDF) approach measured targets. A second
//! optimizer grows and shrinks grains on a voxel grid toward a target size
//! distribution.
//!
//! - [`SimulationState`] - grains, boundaries and the four histograms
//! - [`switch_orientations`], [`swap_out_orientation`] - the two greedy moves
//! - [`TextureMatcher`] - driver loop with a bad-try stop rule
//! - [`VolumeOptimizer`] - voxel-level grain size adjustment
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use texture_mc::{NeighborGraph, SimulationState, TextureMatcher};
//! use texture_types::{CrystalSymmetry, EulerAngles, Grain, MatchConfig};
//!
//! let grains = vec![
//!     Grain::placeholder(),
//!     Grain::new(EulerAngles::zero(), 10),
//!     Grain::new(EulerAngles::new(0.1, 0.1, 0.1), 30),
//! ];
//! let graph = NeighborGraph::from_pairs(3, &[(1, 2, 1.0)]).unwrap();
//! let mut odf = vec![0.0; 5832];
//! odf[0] = 1.0;
//! let state = SimulationState::new(
//!     CrystalSymmetry::Cubic, grains, graph, odf, vec![0.0; 13], 1.0,
//! ).unwrap();
//!
//! let mut matcher = TextureMatcher::new(state, MatchConfig::default()).unwrap();
//! let report = matcher.run(&mut StdRng::seed_from_u64(42));
//! println!("{report}");
//! ```
//!
//! # Randomness
//!
//! Every operation that draws takes a [`texture_types::RandomSource`], so a
//! seeded `StdRng` reproduces a run and a
//! [`texture_types::ReplaySource`] scripts individual draws in tests.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(
    clippy::cast_precision_loss,   // voxel counts fit in f64
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,        // clamped to >= 0 before casting
    clippy::module_name_repetitions,
    clippy::suboptimal_flops,
)]

mod graph;
mod grid;
mod histogram;
mod matcher;
mod orientation;
mod state;
mod volume;

pub use graph::NeighborGraph;
pub use grid::GrainGrid;
pub use histogram::{Histograms, squared_error_change};
pub use matcher::{MatchReport, StopReason, TextureMatcher};
pub use orientation::{
    MoveEvaluation, TrialOutcome, evaluate_swap_out, evaluate_switch, propose_grain,
    propose_pair, swap_out_orientation, switch_orientations,
};
pub use state::SimulationState;
pub use volume::{
    DiameterDistributionError, SizeDistributionError, VolumeOptimizer, VolumeReport,
};
