//! Local time for the consuming process
//!
//! Window eviction and clock offset estimation compare device timestamps with
//! the time a message was received. The receive time comes from a
//! [`TimeSource`] so tests and replays can pin it:
//! - System clock (live ingest)
//! - Fixed clock (tests, deterministic replays)

/// Milliseconds since the Unix epoch
///
/// Signed so offset-corrected timestamps and offsets share one type.
pub type Timestamp = i64;

/// Source of local receive time
pub trait TimeSource {
    /// Current time in milliseconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// Wall clock time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Move the clock to `timestamp`
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move the clock forward by `ms`
    pub fn advance(&mut self, ms: i64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
