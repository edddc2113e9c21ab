//! Core types for Monte Carlo texture matching.
//!
//! This crate provides the shared vocabulary of the texture crates:
//!
//! - [`GrainId`] and [`Grain`] - grain identity, orientation, size, surface flag
//! - [`EulerAngles`] - Bunge Euler angles and their quaternion form
//! - [`CrystalSymmetry`] - the supported Laue classes (cubic, hexagonal)
//! - [`MatchConfig`] and [`VolumeConfig`] - driver settings
//! - [`RandomSource`] - the injected random stream used by every Monte Carlo move
//! - [`TextureError`] - setup failures
//!
//! # Design Philosophy
//!
//! These types are **pure data**. Binning lives in `texture-orient`; the
//! optimizers live in `texture-mc`.
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Example
//!
//! ```
//! use texture_types::{EulerAngles, Grain, GrainId};
//!
//! let mut grain = Grain::new(EulerAngles::zero(), 125);
//! grain.set_orientation(EulerAngles::new(0.1, 0.2, 0.3));
//!
//! assert_eq!(grain.euler().phi, 0.2);
//! assert!(grain.is_interior());
//! assert_eq!(GrainId::new(3).to_string(), "Grain(3)");
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
)]

mod config;
mod error;
mod grain;
mod orientation;
mod random;

pub use config::{MatchConfig, VolumeConfig};
pub use error::{Result, TextureError};
pub use grain::{Grain, GrainId, equivalent_diameter};
pub use orientation::{CrystalSymmetry, EulerAngles};
pub use random::{RandomSource, ReplaySource, select_grain_index};

// Re-export nalgebra types for convenience
pub use nalgebra::{Quaternion, Vector3};
