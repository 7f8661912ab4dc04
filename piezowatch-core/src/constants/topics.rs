//! Transport Topics and Envelope Field Names

/// Topic carrying piezo batches from the sensor nodes.
pub const DEFAULT_PIEZO_TOPIC: &str = "iot/piezo";

/// Topic carrying temperature/humidity readings.
pub const DEFAULT_TEMP_TOPIC: &str = "iot/temp";

/// Number of piezo channels wired to the default piezo topic.
pub const DEFAULT_PIEZO_TOPIC_CHANNELS: usize = 4;

// ===== ENVELOPE FIELDS =====

/// Envelope field holding the base64-wrapped binary record.
pub const FIELD_SENSORDATA: &str = "base64_sensordata";

/// Envelope field holding the producer's send time (ms).
pub const FIELD_ENVELOPE_TS: &str = "ts";

/// Envelope field holding the producer's sampling interval (ms).
pub const FIELD_TIME_INTERVAL: &str = "time_interval";

// ===== LEGACY FIELDS =====

/// Prefix of numbered legacy sensor slots (`Sensor1`, `Sensor2`, ...).
pub const LEGACY_SLOT_PREFIX: &str = "Sensor";

/// Device timestamp of a legacy reading (ms since epoch).
pub const LEGACY_TS: &str = "ts";

/// Value of a legacy reading.
pub const LEGACY_VALUE: &str = "v";

/// Temperature field of a legacy climate message.
pub const LEGACY_TEMPERATURE: &str = "temperature";

/// Humidity field of a legacy climate message.
pub const LEGACY_HUMIDITY: &str = "humidity";
