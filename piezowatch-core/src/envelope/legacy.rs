//! Legacy per-sample JSON messages
//!
//! Before binary packing, nodes published one JSON object per message with
//! numbered sensor slots:
//!
//! ```json
//! { "Sensor1": { "ts": 1732012345120, "v": 1.25 },
//!   "Sensor2": [ { "ts": 1732012345120, "v": 0.5 }, { "ts": 1732012345220, "v": 0.6 } ] }
//! ```
//!
//! and climate probes published `{ "ts": ..., "temperature": ..., "humidity": ... }`.
//!
//! Parsing is permissive field by field: a missing or non-numeric value reads
//! as 0, a missing or non-numeric `ts` means "stamp with receive time". Only a
//! payload that is not a JSON object fails.

use alloc::vec::Vec;

use serde_json::{Map, Value};

use crate::{
    clock::ClockOffsetEstimator,
    constants::topics::{
        LEGACY_HUMIDITY, LEGACY_SLOT_PREFIX, LEGACY_TEMPERATURE, LEGACY_TS, LEGACY_VALUE,
    },
    decode::ClimateReading,
    time::Timestamp,
};

/// One `{ts, v}` reading as sent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyReading {
    /// Device timestamp in ms, when numeric
    pub ts: Option<Timestamp>,
    /// Reading value; 0 when missing or not numeric
    pub value: f64,
}

impl LegacyReading {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(fields) => Self {
                ts: fields.get(LEGACY_TS).and_then(number_as_timestamp),
                value: fields.get(LEGACY_VALUE).map_or(0.0, number_or_zero),
            },
            // A bare number in a slot is a value without a timestamp
            other => Self {
                ts: None,
                value: number_or_zero(other),
            },
        }
    }
}

/// Readings of every `SensorN` slot, sorted by slot index (`N − 1`)
///
/// Keys that are not `SensorN` with `N ≥ 1` are ignored. Sorting is numeric,
/// so `Sensor2` comes before `Sensor10`.
pub fn slot_readings(fields: &Map<String, Value>) -> Vec<(usize, Vec<LegacyReading>)> {
    let mut slots: Vec<(usize, Vec<LegacyReading>)> = fields
        .iter()
        .filter_map(|(key, value)| {
            let slot = parse_slot(key)?;
            let readings = match value {
                Value::Array(items) => items.iter().map(LegacyReading::from_value).collect(),
                single => alloc::vec![LegacyReading::from_value(single)],
            };
            Some((slot, readings))
        })
        .collect();

    slots.sort_by_key(|(slot, _)| *slot);
    slots
}

/// Climate fields of a legacy temperature/humidity message
pub fn climate_fields(fields: &Map<String, Value>) -> (Option<Timestamp>, f64, f64) {
    (
        fields.get(LEGACY_TS).and_then(number_as_timestamp),
        fields.get(LEGACY_TEMPERATURE).map_or(0.0, number_or_zero),
        fields.get(LEGACY_HUMIDITY).map_or(0.0, number_or_zero),
    )
}

/// Build a climate reading from a legacy message, correcting its timestamp
pub fn climate_reading(fields: &Map<String, Value>, stamper: &mut TimestampCorrector<'_>) -> ClimateReading {
    let (ts, temperature, humidity) = climate_fields(fields);
    ClimateReading {
        timestamp: stamper.stamp(ts),
        temperature,
        humidity,
    }
}

/// `Sensor3` → slot 2
fn parse_slot(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(LEGACY_SLOT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok()?.checked_sub(1)
}

fn number_as_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| libm::round(f) as i64)),
        _ => None,
    }
}

fn number_or_zero(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Applies clock offset correction to the readings of one message
///
/// The first reading carrying a device timestamp feeds `ts − now` into the
/// estimator; later readings in the same message are not sampled. Every
/// reading with a device timestamp is then stamped `ts − estimate`, and
/// readings without one get `now`.
pub struct TimestampCorrector<'a> {
    clock: &'a mut ClockOffsetEstimator,
    now: Timestamp,
    sampled: bool,
}

impl<'a> TimestampCorrector<'a> {
    /// Corrector for one message received at `now`
    pub fn new(clock: &'a mut ClockOffsetEstimator, now: Timestamp) -> Self {
        Self {
            clock,
            now,
            sampled: false,
        }
    }

    /// Local timestamp for a reading; saturates instead of overflowing
    pub fn stamp(&mut self, device_ts: Option<Timestamp>) -> Timestamp {
        match device_ts {
            None => self.now,
            Some(ts) => {
                if !self.sampled {
                    self.clock.observe(ts.saturating_sub(self.now));
                    self.sampled = true;
                }
                self.clock.correct(ts)
            }
        }
    }

    /// Whether this message contributed an offset sample
    pub fn sampled(&self) -> bool {
        self.sampled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn slot_keys() {
        assert_eq!(parse_slot("Sensor1"), Some(0));
        assert_eq!(parse_slot("Sensor16"), Some(15));
        assert_eq!(parse_slot("Sensor0"), None);
        assert_eq!(parse_slot("Sensor"), None);
        assert_eq!(parse_slot("Sensor-1"), None);
        assert_eq!(parse_slot("sensor1"), None);
        assert_eq!(parse_slot("ts"), None);
    }

    #[test]
    fn slots_sorted_numerically() {
        let fields = object(json!({
            "Sensor10": { "ts": 1, "v": 10.0 },
            "Sensor2": { "ts": 1, "v": 2.0 },
            "Sensor1": [ { "ts": 1, "v": 1.0 }, { "ts": 2, "v": 1.5 } ],
            "other": 5,
        }));

        let slots = slot_readings(&fields);
        let order: Vec<usize> = slots.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, alloc::vec![0, 1, 9]);
        assert_eq!(slots[0].1.len(), 2);
    }

    #[test]
    fn missing_value_is_zero() {
        let fields = object(json!({ "Sensor1": { "ts": 1_000 } }));
        let slots = slot_readings(&fields);

        assert_eq!(
            slots[0].1[0],
            LegacyReading { ts: Some(1_000), value: 0.0 }
        );
    }

    #[test]
    fn malformed_leaves_default() {
        let fields = object(json!({
            "Sensor1": { "ts": "yesterday", "v": "high" },
            "Sensor2": 3.5,
        }));
        let slots = slot_readings(&fields);

        assert_eq!(slots[0].1[0], LegacyReading { ts: None, value: 0.0 });
        assert_eq!(slots[1].1[0], LegacyReading { ts: None, value: 3.5 });
    }

    #[test]
    fn float_timestamp_rounds() {
        assert_eq!(number_as_timestamp(&json!(1500.6)), Some(1501));
        assert_eq!(number_as_timestamp(&json!(null)), None);
    }

    #[test]
    fn first_timestamp_feeds_clock_once() {
        let mut clock = ClockOffsetEstimator::new();
        let mut stamper = TimestampCorrector::new(&mut clock, 10_000);

        // Device is 500 ms ahead
        assert_eq!(stamper.stamp(Some(10_500)), 10_000);
        assert_eq!(stamper.stamp(Some(10_600)), 10_100);
        assert_eq!(stamper.stamp(None), 10_000);
        assert!(stamper.sampled());

        assert_eq!(clock.len(), 1);
        assert_eq!(clock.current(), 500.0);
    }

    #[test]
    fn extreme_device_timestamps_saturate() {
        let mut clock = ClockOffsetEstimator::new();
        let mut stamper = TimestampCorrector::new(&mut clock, 10_000);

        stamper.stamp(Some(-9_000_000_000_000_000_000));
        assert_eq!(stamper.stamp(Some(9_000_000_000_000_000_000)), i64::MAX);
        assert_eq!(stamper.stamp(None), 10_000);
    }

    #[test]
    fn no_timestamp_leaves_clock_alone() {
        let mut clock = ClockOffsetEstimator::new();
        let mut stamper = TimestampCorrector::new(&mut clock, 42);

        assert_eq!(stamper.stamp(None), 42);
        assert!(!stamper.sampled());
        assert!(clock.is_empty());
    }

    #[test]
    fn climate_defaults() {
        let fields = object(json!({ "temperature": 21.5 }));
        assert_eq!(climate_fields(&fields), (None, 21.5, 0.0));
    }
}
