//! Error Types for Telemetry Decoding
//!
//! ## Design Philosophy
//!
//! Decode errors are returned once per inbound message and are usually logged
//! and dropped at the dispatcher boundary, so they follow the same rules as
//! the rest of the core:
//!
//! 1. **Small Size**: every variant carries at most two `usize` fields.
//!
//! 2. **No Heap Allocation**: reasons are `&'static str`. Detail from the
//!    underlying JSON or base64 error is logged where it occurs, not stored.
//!
//! 3. **Copy Semantics**: errors can be counted, compared and stored in
//!    diagnostics without cloning.
//!
//! ## Error Categories
//!
//! ### Binary Layer
//! - `OutOfBounds`: a cursor read ran past the end of the buffer
//! - `TruncatedRecord`: a record declares more bytes than were delivered
//!
//! ### Envelope Layer
//! - `MalformedEnvelope`: payload is not JSON, not an object, or the base64
//!   body does not decode
//! - `UnknownTopic`: no route is configured for the topic
//!
//! ### Routing
//! - `UnmappedChannel`: a decoded channel slot has no configured key. The
//!   dispatcher counts and drops these; they never fail a message.
//!
//! ## Propagation
//!
//! ```rust
//! use piezowatch_core::{DecodeError, decode::decode_temphum};
//!
//! match decode_temphum(&[0x00, 0x01]) {
//!     Err(DecodeError::TruncatedRecord { expected, actual }) => {
//!         assert_eq!((expected, actual), (8, 2));
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Decode errors - kept small and `Copy`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Cursor read past the end of the buffer
    #[error("Read of {needed} bytes with only {remaining} remaining")]
    OutOfBounds {
        /// Width of the attempted read
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Declared record length exceeds the available bytes
    #[error("Truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord {
        /// Length the record declares (or the fixed record length)
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },

    /// Payload is not a usable JSON envelope or carries bad base64
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Static description of what was wrong
        reason: &'static str,
    },

    /// Decoded channel slot has no configured channel key
    #[error("Channel slot {slot} is not mapped")]
    UnmappedChannel {
        /// Zero-based slot within the decoded batch or legacy message
        slot: usize,
    },

    /// No route configured for the message topic
    #[error("No route configured for topic")]
    UnknownTopic,
}

impl DecodeError {
    /// Short, stable name used for diagnostic counters and log fields
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::TruncatedRecord { .. } => "truncated_record",
            Self::MalformedEnvelope { .. } => "malformed_envelope",
            Self::UnmappedChannel { .. } => "unmapped_channel",
            Self::UnknownTopic => "unknown_topic",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::OutOfBounds { needed, remaining } =>
                defmt::write!(fmt, "Read {} bytes, {} remaining", needed, remaining),
            Self::TruncatedRecord { expected, actual } =>
                defmt::write!(fmt, "Truncated: expected {}, got {}", expected, actual),
            Self::MalformedEnvelope { reason } =>
                defmt::write!(fmt, "Malformed envelope: {}", reason),
            Self::UnmappedChannel { slot } =>
                defmt::write!(fmt, "Slot {} unmapped", slot),
            Self::UnknownTopic =>
                defmt::write!(fmt, "Unknown topic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_small() {
        assert!(core::mem::size_of::<DecodeError>() <= 24);
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            DecodeError::OutOfBounds { needed: 2, remaining: 1 }.kind(),
            DecodeError::TruncatedRecord { expected: 8, actual: 4 }.kind(),
            DecodeError::MalformedEnvelope { reason: "x" }.kind(),
            DecodeError::UnmappedChannel { slot: 4 }.kind(),
            DecodeError::UnknownTopic.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
