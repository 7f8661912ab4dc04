//! Temperature / humidity record decoder

use crate::{
    constants::{
        wire::{HUMIDITY_COUNTS_PER_PCT, TEMP_COUNTS_PER_C},
        MS_PER_SECOND, TEMPHUM_RECORD_LEN,
    },
    cursor::BinaryCursor,
    errors::{DecodeError, DecodeResult},
    time::Timestamp,
};

/// Single climate reading from a temperature/humidity probe
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClimateReading {
    /// Milliseconds since the Unix epoch
    pub timestamp: Timestamp,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

/// Decode an 8-byte temperature/humidity record
///
/// No sentinel filtering applies to this format. Bytes past the first eight
/// are ignored.
pub fn decode_temphum(bytes: &[u8]) -> DecodeResult<ClimateReading> {
    if bytes.len() < TEMPHUM_RECORD_LEN {
        return Err(DecodeError::TruncatedRecord {
            expected: TEMPHUM_RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let mut cursor = BinaryCursor::new(bytes);
    let timestamp = cursor.read_u32_le()?;
    let temperature_raw = cursor.read_i16_le()?;
    let humidity_raw = cursor.read_u16_le()?;

    Ok(ClimateReading {
        timestamp: timestamp as Timestamp * MS_PER_SECOND,
        temperature: temperature_raw as f64 / TEMP_COUNTS_PER_C,
        humidity: humidity_raw as f64 / HUMIDITY_COUNTS_PER_PCT,
    })
}
