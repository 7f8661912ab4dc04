//! Envelope Dispatch: from transport payload to channel windows
//!
//! ## Overview
//!
//! Every transport message is a JSON object. Two encodings coexist on the
//! same topics:
//!
//! ```text
//! Binary   {"ts": 1732012345678, "time_interval": 100, "base64_sensordata": "OWk8Z2QABAQ..."}
//! Legacy   {"Sensor1": {"ts": 1732012345678, "v": 1.25}, "Sensor2": [...]}
//! ```
//!
//! The [`EnvelopeDispatcher`] turns one message into normalized
//! `(ChannelKey, Sample)` emissions and an optional climate reading:
//!
//! 1. Parse the payload as a JSON object
//! 2. Look up the topic's [`TopicRoute`]
//! 3. In [`DecoderMode::Binary`] with a `base64_sensordata` field, base64
//!    decode it and run the route's record decoder. Timestamps are used as
//!    sent.
//! 4. Otherwise read legacy fields, correcting device timestamps with the
//!    [`ClockOffsetEstimator`]
//! 5. Append each emission to the [`ChannelWindowStore`]
//!
//! The whole message is decoded before anything is appended, so a message
//! that fails leaves every window untouched.
//!
//! ## Failure Boundary
//!
//! [`EnvelopeDispatcher::dispatch`] returns the error. The transport side
//! calls [`EnvelopeDispatcher::handle`], which logs, counts and drops it; the
//! next message is processed independently.
//!
//! ## Example
//!
//! ```rust
//! use piezowatch_core::channels::{ChannelKey, TopicTable};
//! use piezowatch_core::envelope::{DecoderMode, EnvelopeDispatcher};
//! use piezowatch_core::window::ChannelWindowStore;
//!
//! let mut dispatcher = EnvelopeDispatcher::new(TopicTable::default());
//! let mut store = ChannelWindowStore::default();
//!
//! let payload = br#"{"Sensor1": {"v": 1.25}}"#;
//! let report = dispatcher
//!     .dispatch("iot/piezo", payload, DecoderMode::Legacy, 5_000, &mut store)
//!     .unwrap();
//!
//! assert_eq!(report.stored, 1);
//! assert_eq!(store.snapshot(ChannelKey::ALL[0])[0].timestamp, 5_000);
//! ```

pub mod legacy;

use alloc::vec::Vec;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value};

use crate::{
    channels::{ChannelKey, RecordFormat, TopicRoute, TopicTable},
    clock::ClockOffsetEstimator,
    constants::topics::{FIELD_ENVELOPE_TS, FIELD_SENSORDATA, FIELD_TIME_INTERVAL},
    decode::{decode_piezo_with_layout, decode_temphum, ClimateReading, Sample, SampleLayout},
    errors::{DecodeError, DecodeResult},
    summary::BatchSummary,
    time::Timestamp,
    window::ChannelWindowStore,
};

use self::legacy::TimestampCorrector;

/// Which encoding the dispatcher expects
///
/// Read before every message; binary mode still falls back to legacy parsing
/// for messages without `base64_sensordata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderMode {
    /// Per-sample JSON with device timestamps
    Legacy,
    /// Base64-wrapped binary records
    #[default]
    Binary,
}

impl DecoderMode {
    /// Lowercase name, as accepted by `FromStr`
    pub const fn name(&self) -> &'static str {
        match self {
            DecoderMode::Legacy => "legacy",
            DecoderMode::Binary => "binary",
        }
    }
}

impl core::str::FromStr for DecoderMode {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(DecoderMode::Legacy),
            "binary" => Ok(DecoderMode::Binary),
            _ => Err(DecodeError::MalformedEnvelope {
                reason: "decoder mode must be `legacy` or `binary`",
            }),
        }
    }
}

/// Everything decoded from one message, before it touches the store
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Encoding actually used for this message
    pub decoded_as: DecoderMode,
    /// Samples to append, in emission order
    pub emissions: Vec<(ChannelKey, Sample)>,
    /// Samples decoded on slots with no configured channel
    pub unmapped: usize,
    /// Sentinel samples dropped by the piezo decoder
    pub invalid: usize,
    /// Climate reading carried by the message, if any
    pub climate: Option<ClimateReading>,
    /// Batch overview for binary piezo messages
    pub piezo: Option<BatchSummary>,
    /// Envelope `ts`, binary messages only
    pub envelope_ts: Option<Timestamp>,
    /// Envelope `time_interval`, binary messages only
    pub time_interval_ms: Option<u16>,
    /// Size of the base64-decoded record, binary messages only
    pub binary_len: Option<usize>,
}

impl Decoded {
    fn new(decoded_as: DecoderMode) -> Self {
        Self {
            decoded_as,
            emissions: Vec::new(),
            unmapped: 0,
            invalid: 0,
            climate: None,
            piezo: None,
            envelope_ts: None,
            time_interval_ms: None,
            binary_len: None,
        }
    }
}

/// Outcome of dispatching one message into the store
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Encoding actually used for this message
    pub decoded_as: DecoderMode,
    /// Samples appended to windows
    pub stored: usize,
    /// Samples evicted from windows by those appends
    pub evicted: usize,
    /// Samples dropped because their slot has no channel
    pub unmapped: usize,
    /// Sentinel samples dropped by the piezo decoder
    pub invalid: usize,
    /// Climate reading carried by the message, if any
    pub climate: Option<ClimateReading>,
    /// Batch overview for binary piezo messages
    pub piezo: Option<BatchSummary>,
    /// Envelope `ts`, binary messages only
    pub envelope_ts: Option<Timestamp>,
    /// Envelope `time_interval`, binary messages only
    pub time_interval_ms: Option<u16>,
    /// Size of the base64-decoded record, binary messages only
    pub binary_len: Option<usize>,
}

/// Running totals across all dispatched messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchStats {
    /// Messages seen, accepted or not
    pub messages: u64,
    /// Messages dropped with an error
    pub failures: u64,
    /// Accepted messages decoded from `base64_sensordata`
    pub binary_messages: u64,
    /// Accepted messages decoded from `SensorN` fields
    pub legacy_messages: u64,
    /// Samples appended to windows
    pub samples_stored: u64,
    /// Samples evicted from windows
    pub samples_evicted: u64,
    /// Samples dropped on unmapped slots
    pub unmapped_dropped: u64,
    /// Sentinel samples dropped by the piezo decoder
    pub invalid_samples: u64,
    /// Climate readings accepted
    pub climate_readings: u64,
    /// Most recent failure
    pub last_error: Option<DecodeError>,
}

impl DispatchStats {
    fn record(&mut self, dispatch: &Dispatch) {
        match dispatch.decoded_as {
            DecoderMode::Binary => self.binary_messages += 1,
            DecoderMode::Legacy => self.legacy_messages += 1,
        }
        self.samples_stored += dispatch.stored as u64;
        self.samples_evicted += dispatch.evicted as u64;
        self.unmapped_dropped += dispatch.unmapped as u64;
        self.invalid_samples += dispatch.invalid as u64;
        if dispatch.climate.is_some() {
            self.climate_readings += 1;
        }
    }

    fn record_failure(&mut self, err: DecodeError) {
        self.failures += 1;
        self.last_error = Some(err);
    }
}

/// Routes transport messages through the record decoders into windows
///
/// Owns the topic table, the piezo layout, the clock offset estimator and the
/// last climate reading. The window store is passed in per call so its owner
/// decides how it is shared with readers.
#[derive(Debug, Clone)]
pub struct EnvelopeDispatcher {
    routes: TopicTable,
    layout: SampleLayout,
    clock: ClockOffsetEstimator,
    last_climate: Option<ClimateReading>,
    stats: DispatchStats,
}

impl EnvelopeDispatcher {
    /// Dispatcher with the default layout and an empty clock history
    pub fn new(routes: TopicTable) -> Self {
        Self {
            routes,
            layout: SampleLayout::default(),
            clock: ClockOffsetEstimator::new(),
            last_climate: None,
            stats: DispatchStats::default(),
        }
    }

    /// Piezo value order for binary batches
    pub fn with_layout(mut self, layout: SampleLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Decode one message and append its samples to `store`
    ///
    /// `now` is the local receive time in ms. On error nothing is appended.
    pub fn dispatch(
        &mut self,
        topic: &str,
        payload: &[u8],
        mode: DecoderMode,
        now: Timestamp,
        store: &mut ChannelWindowStore,
    ) -> DecodeResult<Dispatch> {
        self.stats.messages += 1;

        let decoded = match self.decode(topic, payload, mode, now) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.stats.record_failure(err);
                return Err(err);
            }
        };

        let mut evicted = 0;
        for (key, sample) in &decoded.emissions {
            evicted += store.append(*key, *sample, now);
        }

        if let Some(climate) = decoded.climate {
            self.last_climate = Some(climate);
        }

        let dispatch = Dispatch {
            decoded_as: decoded.decoded_as,
            stored: decoded.emissions.len(),
            evicted,
            unmapped: decoded.unmapped,
            invalid: decoded.invalid,
            climate: decoded.climate,
            piezo: decoded.piezo,
            envelope_ts: decoded.envelope_ts,
            time_interval_ms: decoded.time_interval_ms,
            binary_len: decoded.binary_len,
        };
        self.stats.record(&dispatch);

        log_debug!(
            "{} message on {}: {} stored, {} evicted, {} unmapped, {} invalid",
            dispatch.decoded_as.name(),
            topic,
            dispatch.stored,
            dispatch.evicted,
            dispatch.unmapped,
            dispatch.invalid
        );

        Ok(dispatch)
    }

    /// Transport-facing wrapper around [`dispatch`](Self::dispatch)
    ///
    /// Failures are logged and counted, never propagated.
    pub fn handle(
        &mut self,
        topic: &str,
        payload: &[u8],
        mode: DecoderMode,
        now: Timestamp,
        store: &mut ChannelWindowStore,
    ) -> Option<Dispatch> {
        match self.dispatch(topic, payload, mode, now, store) {
            Ok(dispatch) => Some(dispatch),
            Err(err) => {
                log_warn!("Dropped message on {} ({}): {}", topic, err.kind(), err);
                None
            }
        }
    }

    /// Decode one message without touching any window
    ///
    /// Legacy messages still update the clock offset estimate.
    pub fn decode(
        &mut self,
        topic: &str,
        payload: &[u8],
        mode: DecoderMode,
        now: Timestamp,
    ) -> DecodeResult<Decoded> {
        let envelope: Value = serde_json::from_slice(payload).map_err(|err| {
            log_debug!("Payload on {} is not JSON: {}", topic, err);
            DecodeError::MalformedEnvelope {
                reason: "payload is not valid JSON",
            }
        })?;

        let fields = match envelope {
            Value::Object(fields) => fields,
            _ => {
                return Err(DecodeError::MalformedEnvelope {
                    reason: "payload is not a JSON object",
                })
            }
        };

        let route = self.routes.route(topic)?;

        match (mode, fields.get(FIELD_SENSORDATA)) {
            (DecoderMode::Binary, Some(encoded)) => {
                decode_binary(route, self.layout, &fields, encoded)
            }
            _ => Ok(decode_legacy(route, &fields, &mut self.clock, now)),
        }
    }

    /// Topic table in use
    pub fn routes(&self) -> &TopicTable {
        &self.routes
    }

    /// Piezo value layout in use
    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    /// Device clock offset estimator
    pub fn clock(&self) -> &ClockOffsetEstimator {
        &self.clock
    }

    /// Latest temperature/humidity reading from any climate topic
    pub fn last_climate(&self) -> Option<ClimateReading> {
        self.last_climate
    }

    /// Running counters
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}

fn decode_binary(
    route: &TopicRoute,
    layout: SampleLayout,
    fields: &Map<String, Value>,
    encoded: &Value,
) -> DecodeResult<Decoded> {
    let encoded = encoded.as_str().ok_or(DecodeError::MalformedEnvelope {
        reason: "base64_sensordata is not a string",
    })?;

    let bytes = STANDARD.decode(encoded.trim()).map_err(|err| {
        log_debug!("Bad base64 on {}: {}", route.topic, err);
        DecodeError::MalformedEnvelope {
            reason: "base64_sensordata is not valid base64",
        }
    })?;

    let mut decoded = Decoded::new(DecoderMode::Binary);
    decoded.envelope_ts = fields.get(FIELD_ENVELOPE_TS).and_then(Value::as_i64);
    decoded.time_interval_ms = fields
        .get(FIELD_TIME_INTERVAL)
        .and_then(Value::as_u64)
        .and_then(|v| u16::try_from(v).ok());
    decoded.binary_len = Some(bytes.len());

    match route.format {
        RecordFormat::Piezo => {
            let batch = decode_piezo_with_layout(&bytes, layout)?;
            let mapped = route.mapped_len(batch.channels.len());

            for (slot, samples) in batch.channels.iter().enumerate() {
                match route.channel(slot) {
                    Ok(key) if slot < mapped => {
                        decoded.emissions.extend(samples.iter().map(|s| (key, *s)));
                    }
                    _ => {
                        log_trace!("Dropping {} samples on unmapped slot {}", samples.len(), slot);
                        decoded.unmapped += samples.len();
                    }
                }
            }

            decoded.invalid = batch.invalid_samples;
            decoded.piezo = Some(BatchSummary::new(&batch, bytes.len()));
        }
        RecordFormat::TempHum => {
            decoded.climate = Some(decode_temphum(&bytes)?);
        }
    }

    Ok(decoded)
}

fn decode_legacy(
    route: &TopicRoute,
    fields: &Map<String, Value>,
    clock: &mut ClockOffsetEstimator,
    now: Timestamp,
) -> Decoded {
    let mut decoded = Decoded::new(DecoderMode::Legacy);
    let mut stamper = TimestampCorrector::new(clock, now);

    match route.format {
        RecordFormat::Piezo => {
            for (slot, readings) in legacy::slot_readings(fields) {
                let key = route.channel(slot);
                for reading in readings {
                    let timestamp = stamper.stamp(reading.ts);
                    match key {
                        Ok(key) => decoded.emissions.push((key, Sample::new(timestamp, reading.value))),
                        Err(_) => decoded.unmapped += 1,
                    }
                }
            }
        }
        RecordFormat::TempHum => {
            decoded.climate = Some(legacy::climate_reading(fields, &mut stamper));
        }
    }

    decoded
}
