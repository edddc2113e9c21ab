//! Random draws for Monte Carlo moves.
//!
//! Every random decision (grain selection, move choice, growth direction,
//! orientation sampling) goes through one [`RandomSource`] passed explicitly
//! into the step functions, so a run is reproducible from its seed.

/// A stream of uniform draws in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

impl<R: rand::Rng + ?Sized> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.r#gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// Used to script individual trials.
///
/// # Example
///
/// ```
/// use texture_types::{RandomSource, ReplaySource};
///
/// let mut source = ReplaySource::new(vec![0.25, 0.75]);
/// assert_eq!(source.next_f64(), 0.25);
/// assert_eq!(source.next_f64(), 0.75);
/// assert_eq!(source.next_f64(), 0.25);
/// ```
#[derive(Debug, Clone)]
pub struct ReplaySource {
    values: Vec<f64>,
    cursor: usize,
}

impl ReplaySource {
    /// Creates a source replaying `values`.
    ///
    /// An empty sequence always yields `0.0`.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }

    /// Number of draws taken so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ReplaySource {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Picks a grain slot uniformly from `[1, count - 1]`.
///
/// A raw draw is scaled to `[0, count)`; slot 0 folds onto 1 and an exact
/// `count` folds onto `count - 1`.
///
/// `count` includes the reserved slot 0, so it must be at least 2.
///
/// # Example
///
/// ```
/// use texture_types::{ReplaySource, select_grain_index};
///
/// let mut source = ReplaySource::new(vec![0.0, 0.5, 0.99]);
/// assert_eq!(select_grain_index(&mut source, 4), 1);
/// assert_eq!(select_grain_index(&mut source, 4), 2);
/// assert_eq!(select_grain_index(&mut source, 4), 3);
/// ```
pub fn select_grain_index<R: RandomSource + ?Sized>(rng: &mut R, count: usize) -> usize {
    debug_assert!(count >= 2, "grain selection needs slot 0 plus one grain, got {count}");
    let mut index = (rng.next_f64() * count as f64) as usize;
    if index == 0 {
        index = 1;
    }
    if index >= count {
        index = count - 1;
    }
    index
}
