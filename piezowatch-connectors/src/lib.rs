//! Transport Sources for the PiezoWatch Engine
//!
//! ## Overview
//!
//! Sensor nodes reach the engine through one of four paths. Each is a
//! [`TelemetrySource`] that pushes `(topic, payload)` pairs into a
//! [`MessageSink`]:
//!
//! ### MQTT
//!
//! **When to use:** live deployments. Nodes publish JSON envelopes on
//! `iot/piezo` and `iot/temp`.
//!
//! - Subscriptions are re-issued on every ConnAck; the broker may have
//!   dropped the session while we were away
//! - Connection errors wait a fixed delay, then the event loop reconnects
//! - Connection events only feed [`ConnectionStats`]; they never touch the
//!   engine
//!
//! ### Capture replay
//!
//! **When to use:** debugging a field capture. Reads serial console logs
//! line by line:
//!
//! ```text
//! [Piezo] JSON: {"ts": 1732012345678, "time_interval": 100, "base64_sensordata": "..."}
//! [TempHum] JSON: {"ts": 1732012345678, "base64_sensordata": "OWk8ZykJhRo="}
//! ```
//!
//! ### Serial
//!
//! **When to use:** a node wired to this machine. The console is read live at
//! the configured baud rate, with the same line format as a capture.
//! `[Modem]`, `[TimeSync]`, `[Setup]` and `[Core` status lines are logged.
//!
//! ### Interactive
//!
//! Same line format from stdin; `quit`, `exit` or `q` stops the loop. Bare
//! `{...}` envelopes go to the piezo topic.
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐  (topic, payload)  ┌────────────┐  ingest  ┌─────────────────┐
//! │ MqttSource   │───────────────────►│ EngineSink │─────────►│ TelemetryEngine │
//! │ LineSource   │   ConnectionEvent  │  + stats   │          │ (Arc<Mutex<_>>) │
//! └──────────────┘───────────────────►└────────────┘          └─────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use piezowatch_connectors::{
//!     lines::LineRouter, replay::LineSource, shared_engine, EngineSink, TelemetrySource,
//! };
//! use piezowatch_core::{FixedTime, TelemetryEngine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), piezowatch_connectors::ConnectorError> {
//! let capture: &[u8] = b"[TempHum] JSON: {\"base64_sensordata\": \"OWk8ZykJhRo=\"}\n";
//!
//! let engine = shared_engine(TelemetryEngine::default());
//! let mut sink = EngineSink::new(engine.clone(), FixedTime::new(1_732_012_346_000));
//! let mut source = LineSource::new(capture, LineRouter::default());
//!
//! source.run(&mut sink).await?;
//!
//! let climate = engine.lock().unwrap().last_climate().unwrap();
//! assert_eq!(climate.temperature, 23.45);
//! # Ok(())
//! # }
//! ```

pub mod lines;
pub mod replay;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "serial")]
pub mod serial;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttError, MqttSource};
#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialSource};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use piezowatch_core::{envelope::Dispatch, TelemetryEngine, TimeSource};
use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Reading a file, stdin or serial port failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport protocol failed
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Source configuration was rejected
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Transport connection lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// First successful connection
    Connected,
    /// Connection restored after a loss
    Reconnected,
    /// Broker closed the session or the link dropped
    Offline,
    /// Transport error, with its message
    Error(String),
}

/// Receiver of transport messages
pub trait MessageSink {
    /// Handle one message. Returns `false` if it was rejected.
    fn on_message(&mut self, topic: &str, payload: &[u8]) -> bool;

    /// Observe a connection event
    fn on_connection_event(&mut self, _event: &ConnectionEvent) {}
}

/// A transport that feeds messages to a sink until it is exhausted or stopped
#[async_trait]
pub trait TelemetrySource {
    /// Run until the source ends
    async fn run<S: MessageSink + Send>(&mut self, sink: &mut S) -> Result<(), ConnectorError>;
}

/// Diagnostic counters for one transport session
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// First connections
    pub connects: u64,
    /// Connections restored after a loss
    pub reconnects: u64,
    /// Transitions to offline
    pub offline: u64,
    /// Transport errors
    pub errors: u64,
    /// Messages handed to the engine
    pub messages_received: u64,
    /// Messages the engine dropped
    pub messages_rejected: u64,
    /// Payload bytes handed to the engine
    pub bytes_received: u64,
    /// Last transport error message
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count one connection event
    pub fn record(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => self.connects += 1,
            ConnectionEvent::Reconnected => self.reconnects += 1,
            ConnectionEvent::Offline => self.offline += 1,
            ConnectionEvent::Error(message) => {
                self.errors += 1;
                self.last_error = Some(message.clone());
            }
        }
    }
}

/// Engine shared between the ingest loop and readers
pub type SharedEngine = Arc<Mutex<TelemetryEngine>>;

/// Wrap an engine for sharing between a sink and its readers
pub fn shared_engine(engine: TelemetryEngine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Lock the shared engine, recovering from a poisoned mutex
///
/// Ingest never leaves the engine half-updated, so a panic in a reader does
/// not invalidate it.
pub fn lock_engine(engine: &SharedEngine) -> MutexGuard<'_, TelemetryEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

type DispatchObserver = Box<dyn FnMut(&str, &Dispatch) + Send>;

/// Sink that stamps each message with local time and ingests it
pub struct EngineSink<T> {
    engine: SharedEngine,
    time: T,
    stats: ConnectionStats,
    observer: Option<DispatchObserver>,
}

impl<T: TimeSource> EngineSink<T> {
    /// Sink ingesting into `engine`, stamping messages with `time`
    pub fn new(engine: SharedEngine, time: T) -> Self {
        Self {
            engine,
            time,
            stats: ConnectionStats::default(),
            observer: None,
        }
    }

    /// Call `observer` after every accepted message
    pub fn on_dispatch(mut self, observer: impl FnMut(&str, &Dispatch) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Engine this sink feeds
    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Counters for messages and connection events seen so far
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}

impl<T: TimeSource> MessageSink for EngineSink<T> {
    fn on_message(&mut self, topic: &str, payload: &[u8]) -> bool {
        self.stats.messages_received += 1;
        self.stats.bytes_received += payload.len() as u64;

        let now = self.time.now();
        let dispatch = lock_engine(&self.engine).ingest(topic, payload, now);

        match dispatch {
            Some(dispatch) => {
                if let Some(observer) = self.observer.as_mut() {
                    observer(topic, &dispatch);
                }
                true
            }
            None => {
                self.stats.messages_rejected += 1;
                false
            }
        }
    }

    fn on_connection_event(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Error(message) => log::warn!("Transport error: {}", message),
            other => log::info!("Transport {:?}", other),
        }
        self.stats.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piezowatch_core::{ChannelKey, FixedTime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sink_counts_messages() {
        let engine = shared_engine(TelemetryEngine::default());
        let mut sink = EngineSink::new(engine.clone(), FixedTime::new(5_000));

        assert!(sink.on_message("iot/piezo", br#"{"Sensor1": {"v": 1.5}}"#));
        assert!(!sink.on_message("iot/piezo", b"not json"));

        let stats = sink.stats();
        assert_eq!(stats.messages_received, 2);
        assert_eq!(stats.messages_rejected, 1);
        assert_eq!(stats.bytes_received, 23 + 8);

        let window = lock_engine(&engine).snapshot(ChannelKey::ALL[0]);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].timestamp, 5_000);
    }

    #[test]
    fn shared_engine_is_visible_to_sink_and_readers() {
        let engine = shared_engine(TelemetryEngine::default());
        let sink = EngineSink::new(Arc::clone(&engine), FixedTime::new(0));

        assert!(Arc::ptr_eq(sink.engine(), &engine));
        assert_eq!(lock_engine(&engine).stats().messages, 0);
    }

    #[test]
    fn observer_sees_accepted_only() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let engine = shared_engine(TelemetryEngine::default());
        let mut sink = EngineSink::new(engine, FixedTime::new(0)).on_dispatch(move |topic, _| {
            assert_eq!(topic, "iot/temp");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sink.on_message("iot/temp", br#"{"temperature": 20.0, "humidity": 50.0}"#);
        sink.on_message("iot/unknown", b"{}");

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn connection_events_feed_stats() {
        let mut stats = ConnectionStats::default();
        stats.record(&ConnectionEvent::Connected);
        stats.record(&ConnectionEvent::Offline);
        stats.record(&ConnectionEvent::Error("refused".into()));
        stats.record(&ConnectionEvent::Reconnected);

        assert_eq!((stats.connects, stats.offline, stats.errors, stats.reconnects), (1, 1, 1, 1));
        assert_eq!(stats.last_error.as_deref(), Some("refused"));
    }
}
