//! Human-readable batch summaries
//!
//! Used by the CLI and logs to show what a message contained without dumping
//! every sample:
//!
//! ```text
//! [Piezo] Batch Info:
//!   Base Timestamp: 1732012345 (2024-11-19T10:32:25Z)
//!   Sample Interval: 100ms
//!   Samples per Channel: 4
//!   Channels: 2
//!   Binary Size: 24 bytes
//!   Channel 1: 1.00mV -> 2.50mV (3/4 valid samples)
//!   Channel 2: No valid samples
//! ```

use alloc::vec::Vec;
use core::fmt;

use crate::decode::{ClimateReading, PiezoBatch};
use crate::time::Timestamp;

/// Per-channel overview of one piezo batch
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    /// Samples kept after sentinel filtering
    pub valid: usize,
    /// Samples declared by the header
    pub total: usize,
    /// First valid value in mV
    pub first: Option<f64>,
    /// Last valid value in mV
    pub last: Option<f64>,
}

/// Overview of one piezo batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    /// Header base timestamp, seconds
    pub base_timestamp: u32,
    /// Header sample interval
    pub sample_interval_ms: u16,
    /// Samples per channel declared by the header
    pub num_samples: u8,
    /// Channels declared by the header
    pub num_channels: u8,
    /// Decoded record size in bytes
    pub binary_len: usize,
    /// Sentinel samples dropped
    pub invalid_samples: usize,
    /// One entry per channel, in wire order
    pub channels: Vec<ChannelSummary>,
}

impl BatchSummary {
    /// Summarize a decoded batch whose record was `binary_len` bytes
    pub fn new(batch: &PiezoBatch, binary_len: usize) -> Self {
        let total = batch.header.num_samples as usize;
        Self {
            base_timestamp: batch.header.base_timestamp,
            sample_interval_ms: batch.header.sample_interval_ms,
            num_samples: batch.header.num_samples,
            num_channels: batch.header.num_channels,
            binary_len,
            invalid_samples: batch.invalid_samples,
            channels: batch
                .channels
                .iter()
                .map(|samples| ChannelSummary {
                    valid: samples.len(),
                    total,
                    first: samples.first().map(|s| s.value),
                    last: samples.last().map(|s| s.value),
                })
                .collect(),
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Piezo] Batch Info:")?;
        writeln!(
            f,
            "  Base Timestamp: {} ({})",
            self.base_timestamp,
            IsoSeconds(self.base_timestamp as i64)
        )?;
        writeln!(f, "  Sample Interval: {}ms", self.sample_interval_ms)?;
        writeln!(f, "  Samples per Channel: {}", self.num_samples)?;
        writeln!(f, "  Channels: {}", self.num_channels)?;
        write!(f, "  Binary Size: {} bytes", self.binary_len)?;

        for (i, ch) in self.channels.iter().enumerate() {
            match (ch.first, ch.last) {
                (Some(first), Some(last)) => write!(
                    f,
                    "\n  Channel {}: {:.2}mV -> {:.2}mV ({}/{} valid samples)",
                    i + 1,
                    first,
                    last,
                    ch.valid,
                    ch.total
                )?,
                _ => write!(f, "\n  Channel {}: No valid samples", i + 1)?,
            }
        }
        Ok(())
    }
}

/// Overview of one climate reading
///
/// `binary_len` is only known for readings decoded from a binary record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSummary {
    /// The decoded reading
    pub reading: ClimateReading,
    /// Decoded record size in bytes
    pub binary_len: Option<usize>,
}

impl ClimateSummary {
    /// Summarize a reading; pass the record size for binary messages
    pub fn new(reading: ClimateReading, binary_len: Option<usize>) -> Self {
        Self { reading, binary_len }
    }
}

impl fmt::Display for ClimateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reading = &self.reading;
        let seconds = reading.timestamp.div_euclid(1000);
        writeln!(f, "[TempHum] Reading:")?;
        writeln!(f, "  Timestamp: {} ({})", seconds, IsoSeconds(seconds))?;
        if let Some(len) = self.binary_len {
            writeln!(f, "  Binary Size: {} bytes", len)?;
        }
        writeln!(f, "  Temperature: {:.2}°C", reading.temperature)?;
        write!(f, "  Humidity: {:.2}%", reading.humidity)
    }
}

/// Seconds since the epoch rendered as an ISO-8601 UTC time
struct IsoSeconds(Timestamp);

impl fmt::Display for IsoSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(self.0, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_piezo;
    use alloc::string::ToString;

    fn record(values: &[i16], samples: u8, channels: u8) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&1_732_012_345u32.to_le_bytes());
        out.extend_from_slice(&100u16.to_le_bytes());
        out.push(samples);
        out.push(channels);
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    #[test]
    fn counts_per_channel() {
        let bytes = record(&[100, i16::MIN, 250, -5, i16::MIN, i16::MIN, i16::MIN, i16::MIN], 4, 2);
        let batch = decode_piezo(&bytes).unwrap();
        let summary = BatchSummary::new(&batch, bytes.len());

        assert_eq!(summary.binary_len, 24);
        assert_eq!(summary.invalid_samples, 5);
        assert_eq!(
            summary.channels[0],
            ChannelSummary { valid: 3, total: 4, first: Some(1.0), last: Some(-0.05) }
        );
        assert_eq!(summary.channels[1].valid, 0);
    }

    #[test]
    fn renders_like_the_decoder_log() {
        let bytes = record(&[100, i16::MIN, 250, -5, i16::MIN, i16::MIN, i16::MIN, i16::MIN], 4, 2);
        let batch = decode_piezo(&bytes).unwrap();
        let text = BatchSummary::new(&batch, bytes.len()).to_string();

        assert!(text.contains("Base Timestamp: 1732012345 (2024-11-19T10:32:25Z)"));
        assert!(text.contains("Channel 1: 1.00mV -> -0.05mV (3/4 valid samples)"));
        assert!(text.contains("Channel 2: No valid samples"));
    }

    #[test]
    fn climate_summary() {
        let reading = ClimateReading {
            timestamp: 1_732_012_345_000,
            temperature: 23.45,
            humidity: 67.89,
        };
        let text = ClimateSummary::new(reading, Some(8)).to_string();

        assert!(text.contains("Temperature: 23.45°C"));
        assert!(text.contains("Humidity: 67.89%"));
        assert!(text.contains("2024-11-19T10:32:25Z"));
        assert!(text.contains("Binary Size: 8 bytes"));

        let legacy = ClimateSummary::new(reading, None).to_string();
        assert!(!legacy.contains("Binary Size"));
    }
}
