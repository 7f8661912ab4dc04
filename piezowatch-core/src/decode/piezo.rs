//! Piezo batch decoder
//!
//! One batch carries `num_samples` readings for each of `num_channels`
//! channels, all sharing a base timestamp and a fixed sampling interval.
//! Sentinel samples (`0x8000`) are dropped from the output and counted.

use alloc::vec::Vec;

use crate::{
    constants::{
        wire::PIEZO_COUNTS_PER_MV, MS_PER_SECOND, PIEZO_HEADER_LEN, PIEZO_SAMPLE_WIDTH,
        PIEZO_SENTINEL,
    },
    cursor::BinaryCursor,
    errors::{DecodeError, DecodeResult},
    time::Timestamp,
};

use super::{Sample, SampleLayout};

/// Fixed header at the start of every piezo batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiezoBatchHeader {
    /// Seconds since the Unix epoch of sample 0
    pub base_timestamp: u32,
    /// Spacing between consecutive samples of one channel
    pub sample_interval_ms: u16,
    /// Samples per channel
    pub num_samples: u8,
    /// Channels in the batch
    pub num_channels: u8,
}

impl PiezoBatchHeader {
    /// Read the header fields in wire order
    pub fn read(cursor: &mut BinaryCursor<'_>) -> DecodeResult<Self> {
        Ok(Self {
            base_timestamp: cursor.read_u32_le()?,
            sample_interval_ms: cursor.read_u16_le()?,
            num_samples: cursor.read_u8()?,
            num_channels: cursor.read_u8()?,
        })
    }

    /// Bytes of sample data following the header
    pub const fn payload_len(&self) -> usize {
        PIEZO_SAMPLE_WIDTH * self.num_samples as usize * self.num_channels as usize
    }

    /// Total record length including the header
    pub const fn record_len(&self) -> usize {
        PIEZO_HEADER_LEN + self.payload_len()
    }

    /// Timestamp of the sample at `index` in milliseconds
    pub const fn sample_timestamp(&self, index: usize) -> Timestamp {
        self.base_timestamp as Timestamp * MS_PER_SECOND
            + index as Timestamp * self.sample_interval_ms as Timestamp
    }
}

/// Decoded piezo batch
#[derive(Debug, Clone, PartialEq)]
pub struct PiezoBatch {
    /// Header as read from the record
    pub header: PiezoBatchHeader,
    /// One sequence per declared channel, in channel order. A channel whose
    /// samples were all sentinels is present and empty.
    pub channels: Vec<Vec<Sample>>,
    /// Sentinel samples discarded while decoding
    pub invalid_samples: usize,
}

impl PiezoBatch {
    /// Number of samples kept across all channels
    pub fn valid_samples(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }
}

/// Decode a piezo batch using the default channel-major layout
pub fn decode_piezo(bytes: &[u8]) -> DecodeResult<PiezoBatch> {
    decode_piezo_with_layout(bytes, SampleLayout::default())
}

/// Decode a piezo batch whose values follow `layout`
///
/// Trailing bytes past the declared record length are ignored.
pub fn decode_piezo_with_layout(bytes: &[u8], layout: SampleLayout) -> DecodeResult<PiezoBatch> {
    if bytes.len() < PIEZO_HEADER_LEN {
        return Err(DecodeError::TruncatedRecord {
            expected: PIEZO_HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let mut cursor = BinaryCursor::new(bytes);
    let header = PiezoBatchHeader::read(&mut cursor)?;

    if cursor.remaining() < header.payload_len() {
        return Err(DecodeError::TruncatedRecord {
            expected: header.record_len(),
            actual: bytes.len(),
        });
    }

    let num_samples = header.num_samples as usize;
    let num_channels = header.num_channels as usize;

    let mut channels: Vec<Vec<Sample>> = (0..num_channels)
        .map(|_| Vec::with_capacity(num_samples))
        .collect();
    let mut invalid_samples = 0;

    let mut read_one = |cursor: &mut BinaryCursor<'_>, channel: usize, index: usize| -> DecodeResult<()> {
        let raw = cursor.read_i16_le()?;
        if raw == PIEZO_SENTINEL {
            invalid_samples += 1;
        } else {
            channels[channel].push(Sample::new(
                header.sample_timestamp(index),
                raw as f64 / PIEZO_COUNTS_PER_MV,
            ));
        }
        Ok(())
    };

    match layout {
        SampleLayout::ChannelMajor => {
            for channel in 0..num_channels {
                for index in 0..num_samples {
                    read_one(&mut cursor, channel, index)?;
                }
            }
        }
        SampleLayout::SampleMajor => {
            for index in 0..num_samples {
                for channel in 0..num_channels {
                    read_one(&mut cursor, channel, index)?;
                }
            }
        }
    }

    Ok(PiezoBatch {
        header,
        channels,
        invalid_samples,
    })
}
