//! Monte Carlo grain volume adjustment.
//!
//! Each trial grows or shrinks one grain by a single voxel layer, measures a
//! grain-size error functional and keeps the change only if the error did not
//! increase. Rejected trials are undone voxel by voxel.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use texture_types::{
    GrainId, RandomSource, Result, TextureError, VolumeConfig, equivalent_diameter,
    select_grain_index,
};

use crate::grid::GrainGrid;
use crate::orientation::TrialOutcome;

/// Error of a grain-size distribution; lower is better.
///
/// `sizes[g]` is the voxel count and `diameters[g]` the equivalent diameter
/// of grain slot `g`. Slot 0 and removed grains have size 0.
///
/// Closures of the same shape implement the trait.
pub trait SizeDistributionError {
    /// Evaluates the error.
    fn error(&self, sizes: &[usize], diameters: &[f64]) -> f64;
}

impl<F> SizeDistributionError for F
where
    F: Fn(&[usize], &[f64]) -> f64,
{
    fn error(&self, sizes: &[usize], diameters: &[f64]) -> f64 {
        self(sizes, diameters)
    }
}

/// Normalized squared error between a binned diameter histogram and a target.
///
/// Grain `g` with `d = diameters[g]` lands in bin
/// `clamp(floor((d - min_diameter / 2) / step), 0, bins - 1)`; counts are
/// divided by the number of live grains and compared as
/// `sum (sim - target)^2 / sum target^2`.
///
/// # Example
///
/// ```
/// use texture_mc::{DiameterDistributionError, SizeDistributionError};
///
/// let target = DiameterDistributionError::new(vec![0.0, 1.0], 0.0, 1.0).unwrap();
/// // one live grain of diameter 1.5 falls in the second bin
/// assert_eq!(target.error(&[0, 10], &[0.0, 1.5]), 0.0);
/// assert_eq!(target.error(&[0, 10], &[0.0, 0.5]), 2.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiameterDistributionError {
    target: Vec<f64>,
    min_diameter: f64,
    step: f64,
}

impl DiameterDistributionError {
    /// Creates the functional for a target histogram.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::InvalidConfig`] for an empty target or a
    /// non-positive step.
    pub fn new(target: Vec<f64>, min_diameter: f64, step: f64) -> Result<Self> {
        if target.is_empty() {
            return Err(TextureError::invalid_config("size target has no bins"));
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(TextureError::invalid_config(format!(
                "size bin step must be positive, got {step}"
            )));
        }
        Ok(Self {
            target,
            min_diameter,
            step,
        })
    }

    /// Bin of a diameter.
    #[must_use]
    pub fn bin(&self, diameter: f64) -> usize {
        let raw = ((diameter - 0.5 * self.min_diameter) / self.step).max(0.0) as usize;
        raw.min(self.target.len() - 1)
    }

    /// Normalized diameter histogram of the live grains.
    #[must_use]
    pub fn histogram(&self, sizes: &[usize], diameters: &[f64]) -> Vec<f64> {
        let mut hist = vec![0.0; self.target.len()];
        let mut count = 0_usize;
        for (g, (&size, &d)) in sizes.iter().zip(diameters).enumerate() {
            if g == 0 || size == 0 {
                continue;
            }
            hist[self.bin(d)] += 1.0;
            count += 1;
        }
        if count > 0 {
            let n = count as f64;
            hist.iter_mut().for_each(|h| *h /= n);
        }
        hist
    }
}

impl SizeDistributionError for DiameterDistributionError {
    fn error(&self, sizes: &[usize], diameters: &[f64]) -> f64 {
        let hist = self.histogram(sizes, diameters);
        let mut squared = 0.0;
        let mut scale = 0.0;
        for (sim, target) in hist.iter().zip(&self.target) {
            squared += (sim - target) * (sim - target);
            scale += target * target;
        }
        if scale > 0.0 { squared / scale } else { squared }
    }
}

/// Per-voxel scratch state during one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Untouched,
    Visited,
    Converted(GrainId),
}

impl Mark {
    const fn is_convertible(self) -> bool {
        !matches!(self, Self::Converted(_))
    }
}

/// Summary of a volume-adjustment run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeReport {
    /// Trials performed.
    pub iterations: u64,
    /// Trials kept.
    pub committed: u64,
    /// Trials undone.
    pub rolled_back: u64,
    /// Grains that lost all voxels and were removed by renumbering.
    pub grains_removed: usize,
    /// Size error before the run.
    pub initial_error: f64,
    /// Size error after the run.
    pub final_error: f64,
}

impl std::fmt::Display for VolumeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Volume adjustment: {} trials ({} kept), {} grains removed, error {:.4} -> {:.4}",
            self.iterations, self.committed, self.grains_removed, self.initial_error, self.final_error
        )
    }
}

/// Grows and shrinks grains on a voxel grid toward a target size distribution.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use texture_mc::{GrainGrid, VolumeOptimizer};
/// use texture_types::{GrainId, VolumeConfig};
///
/// // two grains splitting a 4x1x1 bar 3:1; the error prefers equal sizes
/// let ids = [1, 1, 1, 2].map(GrainId::new).to_vec();
/// let grid = GrainGrid::new([4, 1, 1], [1.0; 3], ids).unwrap();
/// let balance = |sizes: &[usize], _: &[f64]| sizes[1].abs_diff(sizes[2]) as f64;
///
/// let config = VolumeConfig::default().with_iterations(50);
/// let mut optimizer = VolumeOptimizer::new(grid, balance, config).unwrap();
/// let report = optimizer.run(&mut StdRng::seed_from_u64(4));
///
/// assert!(report.final_error <= report.initial_error);
/// assert_eq!(optimizer.sizes().iter().sum::<usize>(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct VolumeOptimizer<E> {
    grid: GrainGrid,
    sizes: Vec<usize>,
    diameters: Vec<f64>,
    marks: Vec<Mark>,
    frontier: Vec<usize>,
    converted: Vec<usize>,
    touched_grains: Vec<GrainId>,
    error_fn: E,
    current_error: f64,
    config: VolumeConfig,
}

impl<E: SizeDistributionError> VolumeOptimizer<E> {
    /// Prepares an optimizer over `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`TextureError::InvalidGrainId`] when a voxel carries the
    /// reserved id 0.
    pub fn new(grid: GrainGrid, error_fn: E, config: VolumeConfig) -> Result<Self> {
        let num_grains = grid.num_grains();
        if grid.ids().iter().any(|id| id.is_none()) {
            return Err(TextureError::InvalidGrainId {
                id: GrainId::NONE,
                num_grains,
            });
        }
        let voxel_volume = grid.voxel_volume();
        let sizes = grid.grain_sizes(num_grains);
        let diameters = sizes
            .iter()
            .map(|&s| equivalent_diameter(s, voxel_volume))
            .collect::<Vec<_>>();
        let current_error = error_fn.error(&sizes, &diameters);
        Ok(Self {
            marks: vec![Mark::Untouched; grid.len()],
            grid,
            sizes,
            diameters,
            frontier: Vec::new(),
            converted: Vec::new(),
            touched_grains: Vec::new(),
            error_fn,
            current_error,
            config,
        })
    }

    /// The voxel grid.
    #[must_use]
    pub const fn grid(&self) -> &GrainGrid {
        &self.grid
    }

    /// Consumes the optimizer and returns the grid.
    #[must_use]
    pub fn into_grid(self) -> GrainGrid {
        self.grid
    }

    /// Voxel count per grain slot.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Equivalent diameter per grain slot.
    #[must_use]
    pub fn diameters(&self) -> &[f64] {
        &self.diameters
    }

    /// Error of the current distribution.
    #[must_use]
    pub const fn current_error(&self) -> f64 {
        self.current_error
    }

    /// Draws a grain that still owns voxels.
    fn select_grain<R: RandomSource + ?Sized>(&self, rng: &mut R) -> GrainId {
        loop {
            let g = select_grain_index(rng, self.sizes.len());
            if self.sizes[g] > 0 {
                return GrainId::from_index(g);
            }
        }
    }

    /// One grow/shrink trial.
    ///
    /// Kept iff the error does not increase; otherwise every converted voxel
    /// is restored.
    pub fn step<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> TrialOutcome {
        let grain = self.select_grain(rng);
        let grow = rng.next_f64() >= 0.5;
        let Some(nucleus) = self.grid.ids().iter().position(|&id| id == grain) else {
            return TrialOutcome::Rejected;
        };

        self.flood(grain, nucleus, grow);
        self.apply_sizes();

        let error = self.error_fn.error(&self.sizes, &self.diameters);
        let outcome = if error <= self.current_error {
            self.current_error = error;
            TrialOutcome::Accepted
        } else {
            self.rollback();
            TrialOutcome::Rejected
        };
        self.clear_scratch();
        outcome
    }

    /// Breadth-first pass over the grain's footprint converting one boundary
    /// layer.
    fn flood(&mut self, grain: GrainId, nucleus: usize, grow: bool) {
        self.frontier.push(nucleus);
        self.marks[nucleus] = Mark::Visited;

        let mut cursor = 0;
        while cursor < self.frontier.len() {
            let index = self.frontier[cursor];
            cursor += 1;
            for neighbor in self.grid.face_neighbors(index).into_iter().flatten() {
                let other = self.grid.get(neighbor);
                if other == grain && self.marks[neighbor] == Mark::Untouched {
                    self.marks[neighbor] = Mark::Visited;
                    self.frontier.push(neighbor);
                }
                if other == grain
                    || self.grid.get(index) != grain
                    || !self.marks[neighbor].is_convertible()
                {
                    continue;
                }
                if grow {
                    self.marks[neighbor] = Mark::Converted(other);
                    self.grid.set(neighbor, grain);
                    self.converted.push(neighbor);
                } else {
                    self.marks[index] = Mark::Converted(grain);
                    self.grid.set(index, other);
                    self.converted.push(index);
                }
            }
        }
    }

    /// Moves voxel counts for every conversion and refreshes the affected
    /// diameters.
    fn apply_sizes(&mut self) {
        for &index in &self.converted {
            if let Mark::Converted(previous) = self.marks[index] {
                let current = self.grid.get(index);
                self.sizes[current.index()] += 1;
                self.sizes[previous.index()] -= 1;
                self.touched_grains.push(current);
                self.touched_grains.push(previous);
            }
        }
        self.touched_grains.sort_unstable();
        self.touched_grains.dedup();
        self.refresh_diameters();
    }

    fn refresh_diameters(&mut self) {
        let voxel_volume = self.grid.voxel_volume();
        for g in &self.touched_grains {
            self.diameters[g.index()] = equivalent_diameter(self.sizes[g.index()], voxel_volume);
        }
    }

    fn rollback(&mut self) {
        for &index in &self.converted {
            if let Mark::Converted(previous) = self.marks[index] {
                let current = self.grid.get(index);
                self.sizes[current.index()] -= 1;
                self.sizes[previous.index()] += 1;
                self.grid.set(index, previous);
            }
        }
        self.refresh_diameters();
    }

    /// Resets marks only where this trial wrote them.
    fn clear_scratch(&mut self) {
        for &index in self.frontier.iter().chain(&self.converted) {
            self.marks[index] = Mark::Untouched;
        }
        self.frontier.clear();
        self.converted.clear();
        self.touched_grains.clear();
    }

    /// Compacts grain ids so live grains are numbered `1..=k` in their old
    /// order.
    ///
    /// Returns the old-to-new id map; removed grains map to
    /// [`GrainId::NONE`].
    pub fn renumber(&mut self) -> Vec<GrainId> {
        let mut map = vec![GrainId::NONE; self.sizes.len()];
        let mut sizes = vec![0];
        let mut diameters = vec![0.0];
        for g in 1..self.sizes.len() {
            if self.sizes[g] > 0 {
                map[g] = GrainId::from_index(sizes.len());
                sizes.push(self.sizes[g]);
                diameters.push(self.diameters[g]);
            }
        }
        self.grid.relabel(&map);
        debug!(
            before = self.sizes.len() - 1,
            after = sizes.len() - 1,
            "Renumbered grains"
        );
        self.sizes = sizes;
        self.diameters = diameters;
        map
    }

    /// Runs the configured number of trials, then renumbers the grains.
    pub fn run<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> VolumeReport {
        let initial_error = self.current_error;
        let initial_grains = self.live_grains();
        info!(
            grains = initial_grains,
            voxels = self.grid.len(),
            iterations = self.config.iterations,
            error = initial_error,
            "Starting volume adjustment"
        );

        let mut committed = 0_u64;
        let mut rolled_back = 0_u64;
        for iteration in 1..=self.config.iterations {
            match self.step(rng) {
                TrialOutcome::Accepted => committed += 1,
                TrialOutcome::Rejected => rolled_back += 1,
            }
            if self.config.progress_interval > 0 && iteration % self.config.progress_interval == 0 {
                debug!(
                    iteration,
                    committed,
                    error = self.current_error,
                    "Volume adjustment progress"
                );
            }
        }

        let grains_removed = initial_grains - self.live_grains();
        self.renumber();

        let report = VolumeReport {
            iterations: self.config.iterations,
            committed,
            rolled_back,
            grains_removed,
            initial_error,
            final_error: self.current_error,
        };
        info!(
            committed = report.committed,
            removed = report.grains_removed,
            error = report.final_error,
            "Volume adjustment complete"
        );
        report
    }

    fn live_grains(&self) -> usize {
        self.sizes.iter().skip(1).filter(|&&s| s > 0).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use texture_types::ReplaySource;

    fn bar(ids: &[u32]) -> GrainGrid {
        let ids: Vec<GrainId> = ids.iter().map(|&g| GrainId::new(g)).collect();
        GrainGrid::new([ids.len(), 1, 1], [1.0; 3], ids).unwrap()
    }

    fn always(value: f64) -> impl Fn(&[usize], &[f64]) -> f64 {
        move |_: &[usize], _: &[f64]| value
    }

    #[test]
    fn test_rejects_sentinel_voxels() {
        let grid = bar(&[1, 0, 2]);
        assert!(VolumeOptimizer::new(grid, always(0.0), VolumeConfig::default()).is_err());
    }

    #[test]
    fn test_grow_converts_one_layer() {
        let grid = bar(&[2, 1, 1, 2, 2, 2]);
        let mut opt = VolumeOptimizer::new(grid, always(0.0), VolumeConfig::default()).unwrap();
        // grain 1 (0.4 * 3 = 1.2), grow (0.9)
        let mut rng = ReplaySource::new(vec![0.4, 0.9]);
        assert!(opt.step(&mut rng).is_accepted());
        let ids: Vec<u32> = opt.grid().ids().iter().map(|g| g.raw()).collect();
        assert_eq!(ids, vec![1, 1, 1, 1, 2, 2]);
        assert_eq!(opt.sizes(), &[0, 4, 2]);
    }

    #[test]
    fn test_shrink_converts_boundary_voxels() {
        let grid = bar(&[2, 1, 1, 1, 2]);
        let mut opt = VolumeOptimizer::new(grid, always(0.0), VolumeConfig::default()).unwrap();
        let mut rng = ReplaySource::new(vec![0.4, 0.1]);
        assert!(opt.step(&mut rng).is_accepted());
        let ids: Vec<u32> = opt.grid().ids().iter().map(|g| g.raw()).collect();
        assert_eq!(ids, vec![2, 2, 1, 2, 2]);
        assert_eq!(opt.sizes(), &[0, 1, 4]);
    }

    #[test]
    fn test_rollback_restores_everything() {
        let grid = bar(&[2, 1, 1, 2, 2, 2]);
        // any change in sizes makes the error worse
        let error = |sizes: &[usize], _: &[f64]| sizes[1].abs_diff(2) as f64;
        let mut opt = VolumeOptimizer::new(grid.clone(), error, VolumeConfig::default()).unwrap();
        let diameters = opt.diameters().to_vec();

        let mut rng = ReplaySource::new(vec![0.4, 0.9]);
        assert_eq!(opt.step(&mut rng), TrialOutcome::Rejected);
        assert_eq!(opt.grid(), &grid);
        assert_eq!(opt.sizes(), &[0, 2, 4]);
        assert_eq!(opt.diameters(), diameters.as_slice());
        assert!(opt.marks.iter().all(|&m| m == Mark::Untouched));
    }

    #[test]
    fn test_diameters_follow_sizes() {
        let grid = bar(&[1, 1, 2]);
        let mut opt = VolumeOptimizer::new(grid, always(0.0), VolumeConfig::default()).unwrap();
        let mut rng = ReplaySource::new(vec![0.9, 0.9]);
        opt.step(&mut rng);
        for (g, &size) in opt.sizes().iter().enumerate() {
            assert_relative_eq!(opt.diameters()[g], equivalent_diameter(size, 1.0));
        }
    }

    #[test]
    fn test_renumber_drops_empty_grains() {
        // grain 2 is a single voxel that a grow of grain 1 absorbs
        let grid = bar(&[1, 2, 3, 3]);
        let mut opt = VolumeOptimizer::new(grid, always(0.0), VolumeConfig::default()).unwrap();
        let mut rng = ReplaySource::new(vec![0.3, 0.9]);
        opt.step(&mut rng);
        assert_eq!(opt.sizes(), &[0, 2, 0, 2]);

        let map = opt.renumber();
        assert_eq!(map, [0, 1, 0, 2].map(GrainId::new).to_vec());
        assert_eq!(opt.sizes(), &[0, 2, 2]);
        let ids: Vec<u32> = opt.grid().ids().iter().map(|g| g.raw()).collect();
        assert_eq!(ids, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_diameter_error_functional() {
        let target = DiameterDistributionError::new(vec![0.5, 0.5], 0.0, 1.0).unwrap();
        let hist = target.histogram(&[0, 1, 1, 0], &[0.0, 0.5, 1.5, 9.0]);
        assert_eq!(hist, vec![0.5, 0.5]);
        assert_eq!(target.error(&[0, 1, 1, 0], &[0.0, 0.5, 1.5, 9.0]), 0.0);
        // clamped into the last bin
        assert_eq!(target.bin(100.0), 1);
        assert_eq!(target.bin(-1.0), 0);
        assert!(DiameterDistributionError::new(vec![], 0.0, 1.0).is_err());
        assert!(DiameterDistributionError::new(vec![1.0], 0.0, 0.0).is_err());
    }

    #[test]
    fn test_run_reports_counts() {
        let grid = bar(&[1, 1, 1, 2, 2, 3]);
        let config = VolumeConfig::default().with_iterations(40);
        let mut opt = VolumeOptimizer::new(grid, always(1.0), config).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let report = opt.run(&mut rng);
        assert_eq!(report.iterations, 40);
        assert_eq!(report.committed + report.rolled_back, 40);
        assert_eq!(opt.sizes().iter().sum::<usize>(), 6);
    }
}
