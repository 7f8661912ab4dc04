//! Core decoding and windowing engine for PiezoWatch
//!
//! Turns telemetry messages from piezoelectric and temperature/humidity
//! sensor nodes into per-channel rolling windows of timestamped samples.
//!
//! Key constraints:
//! - Binary decoders run without std (`alloc` only)
//! - Nothing on the decode path panics on hostile input
//! - A bad message is dropped on its own; it never poisons the next one
//!
//! ```no_run
//! use piezowatch_core::{ChannelKey, TelemetryEngine};
//!
//! let mut engine = TelemetryEngine::default();
//!
//! // Hand over each transport message with its local receive time
//! engine.ingest("iot/piezo", br#"{"base64_sensordata": "OWk8Z2QAAQFkAA=="}"#, 1_732_012_345_000);
//!
//! for sample in engine.snapshot(ChannelKey::ALL[0]) {
//!     println!("{} {:.2} mV", sample.timestamp, sample.value);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod channels;
pub mod clock;
pub mod constants;
pub mod cursor;
pub mod decode;
pub mod errors;
pub mod time;
pub mod window;

#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod engine;
#[cfg(feature = "std")]
pub mod envelope;
#[cfg(feature = "std")]
pub mod summary;

// Public API
pub use channels::{ChannelKey, RecordFormat, TopicRoute, TopicTable};
pub use clock::ClockOffsetEstimator;
pub use cursor::BinaryCursor;
pub use decode::{
    decode_piezo, decode_temphum, ClimateReading, PiezoBatch, Sample, SampleLayout,
};
pub use errors::{DecodeError, DecodeResult};
pub use time::{FixedTime, TimeSource, Timestamp};
pub use window::ChannelWindowStore;

#[cfg(feature = "std")]
pub use config::{ConfigError, EngineConfig};
#[cfg(feature = "std")]
pub use engine::TelemetryEngine;
#[cfg(feature = "std")]
pub use envelope::{DecoderMode, Dispatch, EnvelopeDispatcher};
#[cfg(feature = "std")]
pub use summary::{BatchSummary, ClimateSummary};
#[cfg(feature = "std")]
pub use time::SystemTime;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
