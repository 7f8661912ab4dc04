//! Constants for PiezoWatch Core
//!
//! Centralized constants for the wire formats and the aggregation engine.
//!
//! ## Organization
//!
//! - **Wire**: record layouts, sentinel values and scale factors
//! - **Time**: unit conversions, window length, offset history size
//! - **Topics**: default transport topics and legacy field names
//!
//! Always use these constants instead of magic numbers.

/// Binary record layouts and scale factors.
pub mod wire;

/// Time conversions and windowing defaults.
pub mod time;

/// Default topics and envelope field names.
pub mod topics;

pub use wire::{
    PIEZO_HEADER_LEN, PIEZO_SAMPLE_WIDTH, PIEZO_SENTINEL, TEMPHUM_RECORD_LEN,
    MAX_PIEZO_CHANNELS,
};

pub use time::{MS_PER_SECOND, DEFAULT_WINDOW_MS, OFFSET_HISTORY_LEN};

pub use topics::{DEFAULT_PIEZO_TOPIC, DEFAULT_TEMP_TOPIC};
