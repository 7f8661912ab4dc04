//! Common test utilities for integration tests
//!
//! This module provides:
//! - Binary record packers for piezo batches and climate readings
//! - JSON envelope builders for both message encodings
//! - A seeded generator for noisy piezo batches

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine};
use piezowatch_core::constants::PIEZO_SENTINEL;

/// Receive time used by most scenarios
pub const NOW: i64 = 1_732_012_350_000;

/// Base timestamp (seconds) used by most scenarios
pub const BASE_TS: u32 = 1_732_012_345;

/// Pack a piezo batch; `values` must already be in wire order
pub fn pack_piezo(base: u32, interval_ms: u16, samples: u8, channels: u8, values: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + values.len() * 2);
    out.extend_from_slice(&base.to_le_bytes());
    out.extend_from_slice(&interval_ms.to_le_bytes());
    out.push(samples);
    out.push(channels);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Pack per-channel series channel-major
pub fn pack_channels(base: u32, interval_ms: u16, series: &[Vec<i16>]) -> Vec<u8> {
    let samples = series.first().map_or(0, Vec::len);
    let values: Vec<i16> = series.iter().flatten().copied().collect();
    pack_piezo(base, interval_ms, samples as u8, series.len() as u8, &values)
}

/// Pack a climate record from raw scaled counts
pub fn pack_temphum(timestamp: u32, temp_centi: i16, hum_centi: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&timestamp.to_le_bytes());
    out.extend_from_slice(&temp_centi.to_le_bytes());
    out.extend_from_slice(&hum_centi.to_le_bytes());
    out
}

/// Wrap a binary record in a JSON envelope
pub fn binary_envelope(record: &[u8], ts: i64, interval_ms: u16) -> String {
    serde_json::json!({
        "ts": ts,
        "time_interval": interval_ms,
        "base64_sensordata": STANDARD.encode(record),
    })
    .to_string()
}

/// Legacy message with one `{ts, v}` reading per slot (slot 0 is `Sensor1`)
pub fn legacy_envelope(readings: &[(usize, Option<i64>, f64)]) -> String {
    let mut fields = serde_json::Map::new();
    for (slot, ts, v) in readings {
        let mut reading = serde_json::Map::new();
        if let Some(ts) = ts {
            reading.insert("ts".into(), (*ts).into());
        }
        reading.insert("v".into(), (*v).into());
        fields.insert(format!("Sensor{}", slot + 1), reading.into());
    }
    serde_json::Value::Object(fields).to_string()
}

/// Seeded generator for piezo waveforms with sentinel dropouts
pub struct BatchGenerator {
    seed: u32,
}

impl BatchGenerator {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// `channels` series of `samples` values; roughly `dropout_pct`% sentinels
    pub fn series(&mut self, channels: usize, samples: usize, dropout_pct: u32) -> Vec<Vec<i16>> {
        (0..channels)
            .map(|_| {
                (0..samples)
                    .map(|_| {
                        if self.next() % 100 < dropout_pct {
                            PIEZO_SENTINEL
                        } else {
                            // ±50 mV
                            (self.next() % 10_001) as i16 - 5_000
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn next(&mut self) -> u32 {
        self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
        self.seed >> 8
    }
}
