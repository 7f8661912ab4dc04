//! Device clock offset estimation
//!
//! Legacy messages stamp every reading with the device clock, which drifts
//! and is often set from a modem with coarse network time. The estimator
//! keeps the last `N` observed offsets (`device − local`, in ms) and reports
//! their mean, which the dispatcher subtracts from legacy timestamps.
//!
//! Binary batches are never corrected; their timestamps are used as sent.
//!
//! ```rust
//! use piezowatch_core::clock::ClockOffsetEstimator;
//!
//! let mut clock = ClockOffsetEstimator::<20>::new();
//! assert_eq!(clock.current(), 0.0);
//!
//! for offset in [100, 200, 300] {
//!     clock.observe(offset);
//! }
//! assert_eq!(clock.current(), 200.0);
//! ```

use heapless::Deque;

use crate::constants::OFFSET_HISTORY_LEN;
use crate::time::Timestamp;

/// Bounded running mean of device/local clock offsets
///
/// Offsets are kept in a fixed-capacity FIFO; once `N` are held, each new
/// observation evicts the oldest. Single writer, no allocation.
#[derive(Debug, Clone)]
pub struct ClockOffsetEstimator<const N: usize = OFFSET_HISTORY_LEN> {
    samples: Deque<i64, N>,
    /// Running sum of `samples`, kept in i128 so long histories of large
    /// offsets cannot overflow
    sum: i128,
    mean: f64,
}

impl<const N: usize> ClockOffsetEstimator<N> {
    /// Empty estimator; reports a zero offset until the first observation
    pub const fn new() -> Self {
        Self {
            samples: Deque::new(),
            sum: 0,
            mean: 0.0,
        }
    }

    /// Record one `device − local` offset in milliseconds
    pub fn observe(&mut self, offset: i64) {
        if N == 0 {
            return;
        }

        if self.samples.is_full() {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest as i128;
            }
        }

        // Cannot fail: a slot was freed above when full
        let _ = self.samples.push_back(offset);
        self.sum += offset as i128;
        self.mean = self.sum as f64 / self.samples.len() as f64;
    }

    /// Current mean offset, 0 until something has been observed
    pub fn current(&self) -> f64 {
        self.mean
    }

    /// Mean offset rounded to whole milliseconds
    pub fn current_ms(&self) -> i64 {
        libm::round(self.mean) as i64
    }

    /// Map a device timestamp onto the local clock, saturating at the i64 range
    pub fn correct(&self, device_ts: Timestamp) -> Timestamp {
        device_ts.saturating_sub(self.current_ms())
    }

    /// Offsets currently contributing to the mean
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True until the first observation
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all history (e.g. after a device reboot resets its clock)
    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = 0;
        self.mean = 0.0;
    }

    /// Retained offsets, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &i64> + '_ {
        self.samples.iter()
    }
}

impl<const N: usize> Default for ClockOffsetEstimator<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn empty_estimate_is_zero() {
        let clock = ClockOffsetEstimator::<20>::new();
        assert_eq!(clock.current(), 0.0);
        assert_eq!(clock.correct(5_000), 5_000);
        assert!(clock.is_empty());
    }

    #[test]
    fn mean_of_observed() {
        let mut clock = ClockOffsetEstimator::<20>::new();
        clock.observe(100);
        clock.observe(200);
        clock.observe(300);

        assert_eq!(clock.current(), 200.0);
        assert_eq!(clock.correct(10_200), 10_000);
    }

    #[test]
    fn only_last_twenty_count() {
        let mut clock: ClockOffsetEstimator = ClockOffsetEstimator::new();
        for offset in 1..=25 {
            clock.observe(offset);
        }

        assert_eq!(clock.len(), 20);
        // Mean of 6..=25
        assert_eq!(clock.current(), 15.5);
        let kept: Vec<i64> = clock.iter().copied().collect();
        assert_eq!(kept.first(), Some(&6));
        assert_eq!(kept.last(), Some(&25));
    }

    #[test]
    fn negative_offsets() {
        let mut clock = ClockOffsetEstimator::<4>::new();
        clock.observe(-1_000);
        clock.observe(-3_000);

        assert_eq!(clock.current(), -2_000.0);
        assert_eq!(clock.correct(0), 2_000);
    }

    #[test]
    fn rounding_to_whole_ms() {
        let mut clock = ClockOffsetEstimator::<4>::new();
        clock.observe(1);
        clock.observe(2);

        assert_eq!(clock.current(), 1.5);
        assert_eq!(clock.current_ms(), 2);
    }

    #[test]
    fn reset_clears_history() {
        let mut clock = ClockOffsetEstimator::<4>::new();
        clock.observe(500);
        clock.reset();

        assert!(clock.is_empty());
        assert_eq!(clock.current(), 0.0);
    }

    #[test]
    fn extreme_offsets_saturate() {
        let mut clock = ClockOffsetEstimator::<4>::new();
        clock.observe(i64::MIN);

        assert_eq!(clock.correct(i64::MAX), i64::MAX);
        assert_eq!(clock.correct(0), i64::MAX);

        clock.reset();
        clock.observe(i64::MAX);
        assert_eq!(clock.correct(i64::MIN), i64::MIN);
    }
}
