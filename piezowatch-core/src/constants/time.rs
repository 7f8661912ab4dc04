//! Time-Related Constants
//!
//! Conversion factors and the windowing/offset defaults used by the
//! aggregation engine.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: i64 = 1000;

// ===== WINDOWING =====

/// Default rolling display window (milliseconds).
///
/// Samples older than this, measured against local receive time, are evicted
/// on every append. 20 seconds keeps a live plot readable at piezo rates.
pub const DEFAULT_WINDOW_MS: i64 = 20_000;

// ===== CLOCK OFFSET =====

/// Number of offset samples retained by the clock offset estimator.
///
/// Large enough to smooth network jitter on a 1 Hz legacy stream, small enough
/// that a device clock resync is reflected within half a minute.
pub const OFFSET_HISTORY_LEN: usize = 20;
