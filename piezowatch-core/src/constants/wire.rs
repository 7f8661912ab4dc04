//! Wire Format Constants
//!
//! Field widths and scale factors for the two fixed binary records produced
//! by the sensor nodes. Every multi-byte field on the wire is little-endian.

// ===== PIEZO BATCH RECORD =====

/// Size of the piezo batch header in bytes.
///
/// `u32 base_timestamp | u16 sample_interval_ms | u8 num_samples | u8 num_channels`
pub const PIEZO_HEADER_LEN: usize = 8;

/// Width of one piezo sample on the wire (signed 16-bit).
pub const PIEZO_SAMPLE_WIDTH: usize = 2;

/// Reserved raw value marking an invalid or uninitialized piezo sample.
///
/// Bit pattern `0x8000`. The producer writes it when an ADC read fails, so a
/// sample carrying it is never a real reading.
pub const PIEZO_SENTINEL: i16 = i16::MIN;

/// Raw piezo counts per millivolt (values are transmitted in centi-millivolts).
pub const PIEZO_COUNTS_PER_MV: f64 = 100.0;

// ===== TEMPERATURE / HUMIDITY RECORD =====

/// Exact size of a temperature/humidity record in bytes.
///
/// `u32 timestamp | i16 temperature×100 | u16 humidity×100`
pub const TEMPHUM_RECORD_LEN: usize = 8;

/// Raw temperature counts per degree Celsius.
pub const TEMP_COUNTS_PER_C: f64 = 100.0;

/// Raw humidity counts per percent relative humidity.
pub const HUMIDITY_COUNTS_PER_PCT: f64 = 100.0;

// ===== CHANNELS =====

/// Number of physical piezo channels a deployment can address.
pub const MAX_PIEZO_CHANNELS: usize = 16;
