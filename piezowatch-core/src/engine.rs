//! Single-owner telemetry engine
//!
//! Bundles the dispatcher, the window store and the active decoder mode so a
//! transport loop only has to hand over `(topic, payload, now)`. Readers take
//! snapshots; the engine is usually shared behind one mutex.
//!
//! ```rust
//! use piezowatch_core::engine::TelemetryEngine;
//! use piezowatch_core::envelope::DecoderMode;
//! use piezowatch_core::channels::ChannelKey;
//!
//! let mut engine = TelemetryEngine::default();
//! engine.set_mode(DecoderMode::Legacy);
//!
//! engine.ingest("iot/piezo", br#"{"Sensor2": {"v": 0.75}}"#, 1_000);
//! assert_eq!(engine.snapshot(ChannelKey::ALL[1]).len(), 1);
//! ```

use alloc::vec::Vec;

use crate::{
    channels::ChannelKey,
    config::EngineConfig,
    decode::{ClimateReading, Sample},
    envelope::{DecoderMode, Dispatch, DispatchStats, EnvelopeDispatcher},
    time::Timestamp,
    window::ChannelWindowStore,
};

/// Dispatcher, windows and mode behind one owner
#[derive(Debug, Clone)]
pub struct TelemetryEngine {
    dispatcher: EnvelopeDispatcher,
    store: ChannelWindowStore,
    mode: DecoderMode,
}

impl TelemetryEngine {
    /// Engine with empty windows, built from `config`
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            dispatcher: config.dispatcher(),
            store: config.window_store(),
            mode: config.mode,
        }
    }

    /// Process one transport message received at `now`
    ///
    /// Failures are logged and counted by the dispatcher; `None` means the
    /// message was dropped.
    pub fn ingest(&mut self, topic: &str, payload: &[u8], now: Timestamp) -> Option<Dispatch> {
        self.dispatcher
            .handle(topic, payload, self.mode, now, &mut self.store)
    }

    /// Switch decoder mode; takes effect from the next message
    pub fn set_mode(&mut self, mode: DecoderMode) {
        if mode != self.mode {
            log_debug!("Decoder mode {} -> {}", self.mode.name(), mode.name());
        }
        self.mode = mode;
    }

    /// Decoder mode applied to incoming messages
    pub fn mode(&self) -> DecoderMode {
        self.mode
    }

    /// Copy of `key`'s current window
    pub fn snapshot(&self, key: ChannelKey) -> Vec<Sample> {
        self.store.snapshot(key)
    }

    /// Latest climate reading from either encoding
    pub fn last_climate(&self) -> Option<ClimateReading> {
        self.dispatcher.last_climate()
    }

    /// Channel windows
    pub fn store(&self) -> &ChannelWindowStore {
        &self.store
    }

    /// Dispatcher, for clock and routing state
    pub fn dispatcher(&self) -> &EnvelopeDispatcher {
        &self.dispatcher
    }

    /// Running dispatch counters
    pub fn stats(&self) -> &DispatchStats {
        self.dispatcher.stats()
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
