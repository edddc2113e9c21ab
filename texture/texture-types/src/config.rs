//! Configuration for Monte Carlo runs.
//!
//! # Example
//!
//! ```
//! use texture_types::{MatchConfig, VolumeConfig};
//!
//! let config = MatchConfig::default()
//!     .with_max_iterations(50_000)
//!     .with_max_bad_tries(2_000);
//! assert!(config.validate().is_ok());
//!
//! let volume = VolumeConfig::default().with_iterations(500);
//! assert_eq!(volume.iterations, 500);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Result, TextureError};

/// Settings for the texture-matching driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchConfig {
    /// Hard cap on the number of trials.
    pub max_iterations: u64,
    /// Stop after this many consecutive rejected trials.
    pub max_bad_tries: u64,
    /// Probability of proposing a swap-out move instead of a switch.
    pub swap_out_probability: f64,
    /// Emit a progress record every this many trials (0 disables).
    pub progress_interval: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            max_bad_tries: 10_000,
            swap_out_probability: 0.5,
            progress_interval: 10_000,
        }
    }
}

impl MatchConfig {
    /// Only switch moves; the swap-out move is never proposed.
    #[must_use]
    pub fn switch_only() -> Self {
        Self {
            swap_out_probability: 0.0,
            ..Default::default()
        }
    }

    /// Set the iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the consecutive-rejection limit.
    #[must_use]
    pub const fn with_max_bad_tries(mut self, max_bad_tries: u64) -> Self {
        self.max_bad_tries = max_bad_tries;
        self
    }

    /// Set the swap-out probability.
    #[must_use]
    pub const fn with_swap_out_probability(mut self, probability: f64) -> Self {
        self.swap_out_probability = probability;
        self
    }

    /// Set the progress interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::InvalidConfig`] when a limit is zero or the
    /// swap-out probability is outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(TextureError::invalid_config("max_iterations must be positive"));
        }
        if self.max_bad_tries == 0 {
            return Err(TextureError::invalid_config("max_bad_tries must be positive"));
        }
        if !(0.0..=1.0).contains(&self.swap_out_probability) {
            return Err(TextureError::invalid_config(format!(
                "swap_out_probability must be in [0, 1], got {}",
                self.swap_out_probability
            )));
        }
        Ok(())
    }
}

/// Settings for the volume-adjustment driver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeConfig {
    /// Number of grow/shrink trials.
    pub iterations: u64,
    /// Emit a progress record every this many trials (0 disables).
    pub progress_interval: u64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            progress_interval: 1_000,
        }
    }
}

impl VolumeConfig {
    /// Set the number of trials.
    #[must_use]
    pub const fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the progress interval.
    #[must_use]
    pub const fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}
