//! Binary Record Decoders
//!
//! ## Overview
//!
//! Sensor nodes pack their readings into two fixed little-endian records
//! before base64-wrapping them into a JSON envelope:
//!
//! ```text
//! Piezo batch (8 + 2·S·C bytes)
//! ┌──────────────┬─────────────┬──────────┬───────────┬────────────────────┐
//! │ base_ts  u32 │ interval u16│ S     u8 │ C      u8 │ i16 × (S·C) values │
//! └──────────────┴─────────────┴──────────┴───────────┴────────────────────┘
//!
//! Temperature / humidity (8 bytes)
//! ┌──────────────┬──────────────┬──────────────┐
//! │ ts       u32 │ temp×100 i16 │ hum×100  u16 │
//! └──────────────┴──────────────┴──────────────┘
//! ```
//!
//! Timestamps on the wire are whole seconds; decoded samples carry
//! milliseconds. Decoding is pure: the same buffer always produces the same
//! output, and nothing outside the returned value is touched.
//!
//! ## Interleaving
//!
//! Firmware documentation describes piezo values as sample-major
//! (`s0_ch0, s0_ch1, ...`) while the reference decoder consumes them
//! channel-major (`ch0_s0, ch0_s1, ...`). [`SampleLayout`] selects the order;
//! channel-major is the default because it matches captured producer output.

pub mod piezo;
pub mod temphum;

pub use piezo::{decode_piezo, decode_piezo_with_layout, PiezoBatch, PiezoBatchHeader};
pub use temphum::{decode_temphum, ClimateReading};

use crate::time::Timestamp;

/// One decoded reading on a channel
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Milliseconds since the Unix epoch
    pub timestamp: Timestamp,
    /// Value in the channel's physical unit (mV for piezo channels)
    pub value: f64,
}

impl Sample {
    /// Sample at `timestamp` (ms) with `value` in mV
    pub const fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Order in which piezo values are laid out after the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SampleLayout {
    /// All samples of channel 0, then all samples of channel 1, ...
    #[default]
    ChannelMajor,
    /// Sample 0 of every channel, then sample 1 of every channel, ...
    SampleMajor,
}
