//! MQTT source for PiezoWatch
//!
//! Subscribes to the engine's topics and forwards every publish to the sink.
//! The rumqttc event loop reconnects on the next poll after an error; the
//! source only waits the configured delay in between and re-subscribes when
//! the broker acknowledges the new connection.
//!
//! ```rust,no_run
//! use piezowatch_connectors::{shared_engine, EngineSink, MqttConfig, MqttSource, TelemetrySource};
//! use piezowatch_core::{SystemTime, TelemetryEngine};
//!
//! # async fn example() -> Result<(), piezowatch_connectors::ConnectorError> {
//! let config = MqttConfig::new("broker.hivemq.com", 1883)
//!     .client_id("piezowatch-lab")
//!     .topics(["iot/piezo", "iot/temp"]);
//!
//! let engine = shared_engine(TelemetryEngine::default());
//! let mut sink = EngineSink::new(engine, SystemTime);
//!
//! MqttSource::new(config)?.run(&mut sink).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use piezowatch_core::constants::{DEFAULT_PIEZO_TOPIC, DEFAULT_TEMP_TOPIC};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, SubscribeFilter};
use thiserror::Error;

use crate::{ConnectionEvent, ConnectorError, MessageSink, TelemetrySource};

/// Public broker the nodes publish to by default
pub const DEFAULT_BROKER: &str = "broker.hivemq.com";
/// Plain TCP MQTT port
pub const DEFAULT_PORT: u16 = 1883;

/// Requests buffered between the client handle and the event loop
const REQUEST_CAPACITY: usize = 10;

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// The event loop is gone or the request queue rejected the call
    #[error("Client request failed: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// Rejected by [`MqttConfig::validate`]
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MqttError> for ConnectorError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::Config(message) => ConnectorError::ConfigError(message),
            other => ConnectorError::ProtocolError(other.to_string()),
        }
    }
}

/// MQTT configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MqttConfig {
    /// Broker host name
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Keep-alive interval; zero disables it
    pub keep_alive: Duration,
    /// Topics subscribed on every connect
    pub topics: Vec<String>,
    /// Wait after a connection error before polling again
    pub reconnect_delay: Duration,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BROKER, DEFAULT_PORT)
    }
}

impl MqttConfig {
    /// Create new configuration for a broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: format!("piezowatch-{}", std::process::id()),
            keep_alive: Duration::from_secs(60),
            topics: vec![DEFAULT_PIEZO_TOPIC.to_string(), DEFAULT_TEMP_TOPIC.to_string()],
            reconnect_delay: Duration::from_secs(2),
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Replace the subscribed topics
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the reconnect delay in milliseconds
    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay = Duration::from_millis(ms);
        self
    }

    /// Check the configuration before connecting
    pub fn validate(&self) -> Result<(), MqttError> {
        if self.host.is_empty() {
            return Err(MqttError::Config("broker host is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(MqttError::Config("client id is empty".into()));
        }
        if self.topics.is_empty() {
            return Err(MqttError::Config("no topics to subscribe".into()));
        }
        // Zero disables keep-alive; anything else is whole seconds
        if !self.keep_alive.is_zero() && self.keep_alive < Duration::from_secs(1) {
            return Err(MqttError::Config("keep-alive must be zero or at least one second".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options
    }
}

/// What the run loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Subscribe,
}

/// Connection state across polls
#[derive(Debug, Default)]
struct Session {
    connected: bool,
    ever_connected: bool,
}

impl Session {
    fn on_event<S: MessageSink>(&mut self, event: Event, sink: &mut S) -> Step {
        match event {
            Event::Incoming(Packet::ConnAck(_)) => {
                let event = if self.ever_connected {
                    ConnectionEvent::Reconnected
                } else {
                    ConnectionEvent::Connected
                };
                self.connected = true;
                self.ever_connected = true;
                sink.on_connection_event(&event);
                Step::Subscribe
            }
            Event::Incoming(Packet::Publish(publish)) => {
                sink.on_message(&publish.topic, &publish.payload);
                Step::Continue
            }
            Event::Incoming(Packet::Disconnect) => {
                self.go_offline(sink);
                Step::Continue
            }
            _ => Step::Continue,
        }
    }

    fn on_error<S: MessageSink>(&mut self, message: String, sink: &mut S) {
        sink.on_connection_event(&ConnectionEvent::Error(message));
        self.go_offline(sink);
    }

    fn go_offline<S: MessageSink>(&mut self, sink: &mut S) {
        if self.connected {
            self.connected = false;
            sink.on_connection_event(&ConnectionEvent::Offline);
        }
    }
}

/// Subscribing MQTT source
pub struct MqttSource {
    config: MqttConfig,
}

impl MqttSource {
    /// Validate `config` and build the source
    pub fn new(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Subscribe to every topic in one request
    ///
    /// The event loop is not polled while this awaits, so the request queue
    /// must never need more than one free slot.
    async fn subscribe_all(&self, client: &AsyncClient) -> Result<(), MqttError> {
        let filters = self
            .config
            .topics
            .iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce));
        client.subscribe_many(filters).await?;
        log::info!("Subscribed to {}", self.config.topics.join(", "));
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for MqttSource {
    /// Poll forever; only a failed client request ends the loop
    async fn run<S: MessageSink + Send>(&mut self, sink: &mut S) -> Result<(), ConnectorError> {
        log::info!("Connecting to {}:{}", self.config.host, self.config.port);

        let (client, mut eventloop) = AsyncClient::new(self.config.options(), REQUEST_CAPACITY);
        let mut session = Session::default();

        loop {
            match eventloop.poll().await {
                Ok(event) => {
                    if session.on_event(event, sink) == Step::Subscribe {
                        self.subscribe_all(&client).await?;
                    }
                }
                Err(err) => {
                    session.on_error(err.to_string(), sink);
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }
    }
}
