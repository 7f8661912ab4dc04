//! Serial console source
//!
//! Reads a node's console directly from its USB serial port. The console
//! carries the same tagged lines as a capture file, so the port is wrapped in
//! a [`LineSource`]; bare envelopes go to the piezo topic and firmware status
//! lines are logged.
//!
//! ```rust,no_run
//! use piezowatch_connectors::{
//!     lines::LineRouter, shared_engine, EngineSink, SerialConfig, SerialSource, TelemetrySource,
//! };
//! use piezowatch_core::{SystemTime, TelemetryEngine};
//!
//! # async fn example() -> Result<(), piezowatch_connectors::ConnectorError> {
//! let engine = shared_engine(TelemetryEngine::default());
//! let mut sink = EngineSink::new(engine, SystemTime);
//!
//! let config = SerialConfig::new("/dev/ttyUSB0", 115_200);
//! SerialSource::connect(&config, LineRouter::default())?.run(&mut sink).await?;
//! # Ok(())
//! # }
//! ```

use tokio::io::BufReader;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::lines::LineRouter;
use crate::replay::LineSource;
use crate::ConnectorError;

/// Port the node enumerates as on the bench machine
pub const DEFAULT_SERIAL_PORT: &str = "COM9";
/// Console baud rate of the node firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Line source over an open serial port
pub type SerialSource = LineSource<BufReader<SerialStream>>;

/// Serial port settings; the console is always 8N1 without flow control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`) or name (`COM9`)
    pub port: String,
    /// Line speed
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_PORT, DEFAULT_BAUD_RATE)
    }
}

impl SerialConfig {
    /// Settings for `port` at `baud_rate`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }

    /// Check the settings before opening the port
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.port.is_empty() {
            return Err(ConnectorError::ConfigError("serial port is empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConnectorError::ConfigError("baud rate must be positive".into()));
        }
        Ok(())
    }
}

impl SerialSource {
    /// Open the port and read it as a live console
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(config: &SerialConfig, router: LineRouter) -> Result<Self, ConnectorError> {
        config.validate()?;

        let port = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|err| {
                log::error!("Failed to open {}: {}", config.port, err);
                ConnectorError::Io(err.into())
            })?;

        log::info!("Connected to {} @ {} baud", config.port, config.baud_rate);
        Ok(LineSource::new(BufReader::new(port), router.accept_bare_json()))
    }
}
