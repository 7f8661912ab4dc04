//! Engine configuration
//!
//! All fields have defaults matching the deployed sensor network, so an
//! empty JSON object is a valid configuration:
//!
//! ```rust
//! use piezowatch_core::config::EngineConfig;
//! use piezowatch_core::decode::SampleLayout;
//!
//! let config = EngineConfig::from_json(r#"{ "window_ms": 10000, "layout": "sample_major" }"#).unwrap();
//! assert_eq!(config.window_ms, 10_000);
//! assert_eq!(config.layout, SampleLayout::SampleMajor);
//! assert_eq!(config.routes.len(), 2);
//! ```

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::{
    channels::{RecordFormat, TopicRoute, TopicTable},
    constants::DEFAULT_WINDOW_MS,
    decode::SampleLayout,
    envelope::{DecoderMode, EnvelopeDispatcher},
    window::ChannelWindowStore,
};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config text is not valid JSON for this schema
    #[error("Invalid config JSON: {0}")]
    Parse(serde_json::Error),

    /// Config parsed but breaks a constraint
    #[error("Invalid config: {reason}")]
    Invalid {
        reason: &'static str,
    },
}

/// Decoding and windowing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rolling window length per channel (ms)
    pub window_ms: i64,
    /// Piezo value interleaving
    pub layout: SampleLayout,
    /// Decoder mode at startup
    pub mode: DecoderMode,
    /// Topic routes, resolved once into a [`TopicTable`]
    pub routes: Vec<TopicRoute>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            layout: SampleLayout::default(),
            mode: DecoderMode::default(),
            routes: TopicTable::default().routes().to_vec(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the window length in milliseconds
    pub fn window_ms(mut self, window_ms: i64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Set the piezo value layout
    pub fn layout(mut self, layout: SampleLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the initial decoder mode
    pub fn mode(mut self, mode: DecoderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the route table
    pub fn routes(mut self, routes: Vec<TopicRoute>) -> Self {
        self.routes = routes;
        self
    }

    /// Check constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_ms <= 0 {
            return Err(ConfigError::Invalid {
                reason: "window_ms must be positive",
            });
        }

        for (i, route) in self.routes.iter().enumerate() {
            if self.routes[..i].iter().any(|r| r.topic == route.topic) {
                return Err(ConfigError::Invalid {
                    reason: "topics must be unique",
                });
            }
            if route.format == RecordFormat::TempHum && !route.channels.is_empty() {
                return Err(ConfigError::Invalid {
                    reason: "temp_hum routes carry no piezo channels",
                });
            }
            let channels = &route.channels;
            if channels.iter().enumerate().any(|(j, c)| channels[..j].contains(c)) {
                return Err(ConfigError::Invalid {
                    reason: "a channel may appear only once per route",
                });
            }
        }

        Ok(())
    }

    /// Topic table built from `routes`
    pub fn topic_table(&self) -> TopicTable {
        TopicTable::new(self.routes.clone())
    }

    /// Empty window store with this window length
    pub fn window_store(&self) -> ChannelWindowStore {
        ChannelWindowStore::new(self.window_ms)
    }

    /// Dispatcher over this topic table and layout
    pub fn dispatcher(&self) -> EnvelopeDispatcher {
        EnvelopeDispatcher::new(self.topic_table()).with_layout(self.layout)
    }
}
