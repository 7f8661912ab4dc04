//! Rolling Time Windows per Channel
//!
//! ## Overview
//!
//! Live plots only need the last few seconds of each channel. Instead of a
//! fixed count of readings, every channel keeps whatever arrived within the
//! trailing `window_ms` of local time:
//!
//! ```text
//!            window_ms
//!      ◄───────────────────►
//! ──x──x──┼──x──x──x──x──x──┼──► local time
//!  evicted│     retained     now
//! ```
//!
//! ### Eviction Rule
//!
//! After each append, every sample with `now − timestamp > window_ms` is
//! removed from that channel. Samples are kept in insertion order, which is
//! not guaranteed to be timestamp order (a late legacy reading can land after
//! a newer batch), so eviction scans the whole window rather than stopping at
//! the first retained sample.
//!
//! ### Bounds
//!
//! Windows are bounded by time, not count. A producer sending faster raises
//! memory use proportionally; at 4 channels × 100 Hz × 20 s that is 8000
//! samples of 16 bytes.
//!
//! ### Readers
//!
//! [`ChannelWindowStore::snapshot`] returns an owned copy. Readers never get
//! a reference into the live window, so a presentation layer can hold a
//! snapshot while the dispatcher keeps appending.
//!
//! ## Usage Example
//!
//! ```rust
//! use piezowatch_core::channels::ChannelKey;
//! use piezowatch_core::decode::Sample;
//! use piezowatch_core::window::ChannelWindowStore;
//!
//! let key = ChannelKey::ALL[0];
//! let mut store = ChannelWindowStore::new(20_000);
//!
//! store.append(key, Sample::new(1_000, 0.5), 1_000);
//! store.append(key, Sample::new(30_000, 0.7), 30_000);
//!
//! // The first sample is 29 s old when the second arrives
//! assert_eq!(store.snapshot(key), vec![Sample::new(30_000, 0.7)]);
//! ```

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use crate::channels::ChannelKey;
use crate::constants::DEFAULT_WINDOW_MS;
use crate::decode::Sample;
use crate::time::Timestamp;

/// Time-bounded sample windows keyed by channel
///
/// ## Internal Invariants
///
/// - A window exists for every key in [`ChannelKey::ALL`] from construction
/// - After `append(key, _, now)`, no sample in `key`'s window is older than
///   `now − window_ms`
///
/// ## Thread Safety
///
/// Single writer. Share behind a mutex if readers live on other threads;
/// snapshots are copies, so the lock is only held for the copy.
#[derive(Debug, Clone)]
pub struct ChannelWindowStore {
    window_ms: i64,
    windows: BTreeMap<ChannelKey, VecDeque<Sample>>,
}

impl ChannelWindowStore {
    /// Create an empty window for every addressable channel
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            windows: ChannelKey::ALL
                .iter()
                .map(|key| (*key, VecDeque::new()))
                .collect(),
        }
    }

    /// Configured window length in milliseconds
    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Append `sample` to `key`'s window, then evict everything older than
    /// the window relative to `now`
    ///
    /// Returns the number of samples evicted.
    pub fn append(&mut self, key: ChannelKey, sample: Sample, now: Timestamp) -> usize {
        let window_ms = self.window_ms;
        let window = self.windows.entry(key).or_default();
        window.push_back(sample);

        let before = window.len();
        window.retain(|s| now.saturating_sub(s.timestamp) <= window_ms);
        before - window.len()
    }

    /// Copy of `key`'s window in insertion order
    ///
    /// Unknown keys yield an empty sequence.
    pub fn snapshot(&self, key: ChannelKey) -> Vec<Sample> {
        self.windows
            .get(&key)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Most recently appended sample on `key`
    pub fn latest(&self, key: ChannelKey) -> Option<Sample> {
        self.windows.get(&key).and_then(|w| w.back().copied())
    }

    /// Number of samples currently held for `key`
    pub fn len(&self, key: ChannelKey) -> usize {
        self.windows.get(&key).map_or(0, VecDeque::len)
    }

    /// Total samples across all channels
    pub fn total_len(&self) -> usize {
        self.windows.values().map(VecDeque::len).sum()
    }

    /// Keys with a window, in index order
    pub fn channels(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.windows.keys().copied()
    }

    /// Empty every window, keeping the key set
    pub fn clear(&mut self) {
        self.windows.values_mut().for_each(VecDeque::clear);
    }
}

impl Default for ChannelWindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS)
    }
}
