//! Target and simulated ODF/MDF histograms.

use texture_types::{Result, TextureError};

/// Decrease in squared error at `bin` if `delta` were added to `simulated[bin]`.
///
/// Returns `(a - s)^2 - (a - (s + delta))^2`; positive means the change moves
/// the simulated histogram toward the target. Only one bin is touched, so a
/// trial costs O(changed bins) rather than O(total bins).
///
/// # Example
///
/// ```
/// use texture_mc::squared_error_change;
///
/// let actual = [1.0, 0.0];
/// let simulated = [0.5, 0.5];
/// assert_eq!(squared_error_change(&actual, &simulated, 0, 0.5), 0.25);
/// assert_eq!(squared_error_change(&actual, &simulated, 1, 0.5), -0.75);
/// ```
#[must_use]
pub fn squared_error_change(actual: &[f64], simulated: &[f64], bin: usize, delta: f64) -> f64 {
    let before = actual[bin] - simulated[bin];
    let after = actual[bin] - (simulated[bin] + delta);
    before * before - after * after
}

fn squared_error(actual: &[f64], simulated: &[f64]) -> f64 {
    actual
        .iter()
        .zip(simulated)
        .map(|(a, s)| (a - s) * (a - s))
        .sum()
}

/// The four histograms a texture-matching run works with.
///
/// The targets are fixed at construction; the simulated histograms are
/// changed only through [`Self::odf_delta`] and [`Self::mdf_delta`].
#[derive(Debug, Clone, PartialEq)]
pub struct Histograms {
    actual_odf: Vec<f64>,
    simulated_odf: Vec<f64>,
    actual_mdf: Vec<f64>,
    simulated_mdf: Vec<f64>,
}

impl Histograms {
    /// Creates zeroed simulated histograms matching the target lengths.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::HistogramLength`] when a target does not have
    /// the expected number of bins.
    pub fn new(
        actual_odf: Vec<f64>,
        odf_bins: usize,
        actual_mdf: Vec<f64>,
        mdf_bins: usize,
    ) -> Result<Self> {
        if actual_odf.len() != odf_bins {
            return Err(TextureError::HistogramLength {
                name: "actual ODF",
                expected: odf_bins,
                actual: actual_odf.len(),
            });
        }
        if actual_mdf.len() != mdf_bins {
            return Err(TextureError::HistogramLength {
                name: "actual MDF",
                expected: mdf_bins,
                actual: actual_mdf.len(),
            });
        }
        Ok(Self {
            simulated_odf: vec![0.0; odf_bins],
            simulated_mdf: vec![0.0; mdf_bins],
            actual_odf,
            actual_mdf,
        })
    }

    /// Target ODF.
    #[must_use]
    pub fn actual_odf(&self) -> &[f64] {
        &self.actual_odf
    }

    /// Simulated ODF.
    #[must_use]
    pub fn simulated_odf(&self) -> &[f64] {
        &self.simulated_odf
    }

    /// Target MDF.
    #[must_use]
    pub fn actual_mdf(&self) -> &[f64] {
        &self.actual_mdf
    }

    /// Simulated MDF.
    #[must_use]
    pub fn simulated_mdf(&self) -> &[f64] {
        &self.simulated_mdf
    }

    /// `simulated_odf[bin] += delta`.
    pub fn odf_delta(&mut self, bin: usize, delta: f64) {
        self.simulated_odf[bin] += delta;
    }

    /// `simulated_mdf[bin] += delta`.
    pub fn mdf_delta(&mut self, bin: usize, delta: f64) {
        self.simulated_mdf[bin] += delta;
    }

    /// [`squared_error_change`] on the ODF.
    #[must_use]
    pub fn odf_change(&self, bin: usize, delta: f64) -> f64 {
        squared_error_change(&self.actual_odf, &self.simulated_odf, bin, delta)
    }

    /// [`squared_error_change`] on the MDF.
    #[must_use]
    pub fn mdf_change(&self, bin: usize, delta: f64) -> f64 {
        squared_error_change(&self.actual_mdf, &self.simulated_mdf, bin, delta)
    }

    /// Sum of squared ODF bin differences.
    #[must_use]
    pub fn odf_error(&self) -> f64 {
        squared_error(&self.actual_odf, &self.simulated_odf)
    }

    /// Sum of squared MDF bin differences.
    #[must_use]
    pub fn mdf_error(&self) -> f64 {
        squared_error(&self.actual_mdf, &self.simulated_mdf)
    }

    pub(crate) fn set_simulated_mdf(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.simulated_mdf.len());
        self.simulated_mdf = values;
    }

    /// Zeroes both simulated histograms.
    pub fn clear_simulated(&mut self) {
        self.simulated_odf.fill(0.0);
        self.simulated_mdf.fill(0.0);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Histograms {
        Histograms::new(vec![0.5, 0.5, 0.0], 3, vec![1.0, 0.0], 2).unwrap()
    }

    #[test]
    fn test_new_checks_lengths() {
        let err = Histograms::new(vec![1.0], 3, vec![1.0], 1).unwrap_err();
        assert!(matches!(
            err,
            TextureError::HistogramLength { name: "actual ODF", expected: 3, actual: 1 }
        ));
        assert!(Histograms::new(vec![1.0], 1, vec![], 2).is_err());
    }

    #[test]
    fn test_deltas_accumulate() {
        let mut h = sample();
        h.odf_delta(1, 0.25);
        h.odf_delta(1, 0.25);
        h.mdf_delta(0, 0.75);
        assert_eq!(h.simulated_odf(), &[0.0, 0.5, 0.0]);
        assert_eq!(h.simulated_mdf(), &[0.75, 0.0]);
    }

    #[test]
    fn test_errors() {
        let mut h = sample();
        assert_relative_eq!(h.odf_error(), 0.5);
        assert_relative_eq!(h.mdf_error(), 1.0);
        h.odf_delta(0, 0.5);
        h.odf_delta(1, 0.5);
        assert_relative_eq!(h.odf_error(), 0.0);
        h.clear_simulated();
        assert_relative_eq!(h.odf_error(), 0.5);
    }

    #[test]
    fn test_change_predicts_error_difference() {
        let mut h = sample();
        h.odf_delta(2, 0.3);
        let before = h.odf_error();
        let change = h.odf_change(2, -0.3) + h.odf_change(0, 0.3);
        h.odf_delta(2, -0.3);
        h.odf_delta(0, 0.3);
        assert_relative_eq!(before - h.odf_error(), change, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_delta_is_zero_change() {
        let h = sample();
        assert_eq!(h.odf_change(0, 0.0), 0.0);
        assert_eq!(h.mdf_change(1, 0.0), 0.0);
    }
}
