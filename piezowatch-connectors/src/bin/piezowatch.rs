//! PiezoWatch CLI
//!
//! Decodes sensor node telemetry from a broker, a serial port, a console
//! capture or stdin and prints a summary of every message.
//!
//! # Usage
//!
//! ```bash
//! # Subscribe to the public broker
//! piezowatch --mqtt
//!
//! # Read a node's console (COM9 @ 115200 without arguments)
//! piezowatch --serial /dev/ttyUSB0 115200
//!
//! # Replay a serial console capture
//! piezowatch --file capture.log
//!
//! # Paste envelopes by hand
//! piezowatch --interactive --mode legacy
//!
//! # Pipe another tool's output
//! node-logger | piezowatch --default-topic iot/piezo
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use piezowatch_connectors::{
    lines::LineRouter,
    lock_engine,
    mqtt::DEFAULT_BROKER,
    replay::LineSource,
    serial::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_PORT},
    shared_engine, EngineSink, MqttConfig, MqttSource, SerialConfig, SerialSource, SharedEngine,
    TelemetrySource,
};
use piezowatch_core::{
    envelope::Dispatch, ClimateSummary, DecoderMode, EngineConfig, SystemTime, TelemetryEngine,
};

/// PiezoWatch - decode and window piezo and climate telemetry
#[derive(Parser, Debug)]
#[command(name = "piezowatch")]
#[command(version)]
#[command(about = "Decode PiezoWatch sensor telemetry", long_about = None)]
struct Args {
    /// Subscribe to the MQTT broker
    #[arg(short, long, conflicts_with_all = ["file", "interactive", "serial"])]
    mqtt: bool,

    /// Read a node's serial console (default COM9 at 115200 baud)
    #[arg(short, long, num_args = 0..=2, value_names = ["PORT", "BAUD"], conflicts_with_all = ["file", "interactive"])]
    serial: Option<Vec<String>>,

    /// Replay a serial console capture
    #[arg(short, long, value_name = "FILE", conflicts_with = "interactive")]
    file: Option<PathBuf>,

    /// Paste envelopes on stdin; `quit` to exit
    #[arg(short, long)]
    interactive: bool,

    /// Decoder mode (overrides the config file)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Engine configuration (JSON)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Broker host
    #[arg(long, default_value = DEFAULT_BROKER)]
    broker: String,

    /// Broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Topic for untagged `{...}` lines in captures
    #[arg(long, value_name = "TOPIC")]
    default_topic: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Legacy,
    Binary,
}

impl From<ModeArg> for DecoderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Legacy => DecoderMode::Legacy,
            ModeArg::Binary => DecoderMode::Binary,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let engine = shared_engine(TelemetryEngine::new(&config));
    let mut sink = EngineSink::new(engine.clone(), SystemTime).on_dispatch(print_dispatch);

    let router = line_router(&config, args.default_topic.clone());

    let outcome = tokio::select! {
        outcome = run_source(&args, &config, router, &mut sink) => outcome,
        _ = tokio::signal::ctrl_c() => {
            println!("\nExiting...");
            Ok(())
        }
    };

    print_totals(&engine, sink.stats());
    outcome
}

async fn run_source(
    args: &Args,
    config: &EngineConfig,
    router: LineRouter,
    sink: &mut EngineSink<SystemTime>,
) -> Result<()> {
    if args.mqtt {
        let topics: Vec<String> = config.routes.iter().map(|r| r.topic.clone()).collect();
        let mqtt = MqttConfig::new(&args.broker, args.port).topics(topics);

        println!("Connecting to {}:{}", mqtt.host, mqtt.port);
        MqttSource::new(mqtt)?.run(sink).await?;
    } else if let Some(values) = &args.serial {
        let serial = serial_config(values)?;
        println!("Connecting to {} @ {} baud", serial.port, serial.baud_rate);
        SerialSource::connect(&serial, router)
            .with_context(|| format!("Make sure {} is available and not in use", serial.port))?
            .run(sink)
            .await?;
    } else if let Some(path) = &args.file {
        println!("Reading from: {}", path.display());
        let mut source = LineSource::open(path, router)
            .await
            .with_context(|| format!("Failed to open capture {}", path.display()))?;
        source.run(sink).await?;

        let report = source.report();
        log::info!(
            "{} lines, {} delivered, {} rejected, {} skipped",
            report.lines,
            report.delivered,
            report.rejected,
            report.skipped
        );
    } else {
        if args.interactive {
            println!("Paste JSON data (or 'quit' to exit):");
        }
        LineSource::stdin(router)
            .interactive(args.interactive)
            .run(sink)
            .await?;
    }
    Ok(())
}

/// `--serial [PORT] [BAUD]`
fn serial_config(values: &[String]) -> Result<SerialConfig> {
    let port = values.first().map_or(DEFAULT_SERIAL_PORT, String::as_str);
    let baud_rate = match values.get(1) {
        Some(baud) => baud
            .parse()
            .with_context(|| format!("Invalid baud rate {}", baud))?,
        None => DEFAULT_BAUD_RATE,
    };
    Ok(SerialConfig::new(port, baud_rate))
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    log::debug!("Engine config: {:?}", config);
    Ok(config)
}

/// Route tagged capture lines to the first piezo and first climate topic
fn line_router(config: &EngineConfig, default_topic: Option<String>) -> LineRouter {
    let table = config.topic_table();
    let first = |format| {
        table
            .routes()
            .iter()
            .find(|r| r.format == format)
            .map(|r| r.topic.clone())
    };

    let mut router = match (
        first(piezowatch_core::RecordFormat::Piezo),
        first(piezowatch_core::RecordFormat::TempHum),
    ) {
        (Some(piezo), Some(temp)) => LineRouter::new(piezo, temp),
        _ => LineRouter::default(),
    };
    if let Some(topic) = default_topic {
        router = router.default_topic(topic);
    }
    router
}

fn print_dispatch(topic: &str, dispatch: &Dispatch) {
    println!("\n{}", "=".repeat(60));
    println!("Topic: {} ({})", topic, dispatch.decoded_as.name());

    if let Some(ts) = dispatch.envelope_ts {
        println!("  Envelope Timestamp: {}", ts);
    }
    if let Some(interval) = dispatch.time_interval_ms {
        println!("  Time Interval: {}ms", interval);
    }

    if let Some(summary) = &dispatch.piezo {
        println!("{}", summary);
    }
    if let Some(climate) = dispatch.climate {
        println!("{}", ClimateSummary::new(climate, dispatch.binary_len));
    }
    if dispatch.piezo.is_none() && dispatch.stored > 0 {
        println!("  Stored {} samples", dispatch.stored);
    }
    if dispatch.unmapped > 0 {
        println!("  Dropped {} samples on unmapped channels", dispatch.unmapped);
    }
}

fn print_totals(engine: &SharedEngine, transport: &piezowatch_connectors::ConnectionStats) {
    let engine = lock_engine(engine);
    let stats = engine.stats();

    println!(
        "\n{} messages ({} failed), {} samples stored, {} in windows",
        stats.messages,
        stats.failures,
        stats.samples_stored,
        engine.store().total_len()
    );
    if transport.reconnects > 0 || transport.errors > 0 {
        println!(
            "{} reconnects, {} transport errors",
            transport.reconnects, transport.errors
        );
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .filter_module("piezowatch", log_level)
        .filter_module("piezowatch_core", log_level)
        .filter_module("piezowatch_connectors", log_level)
        .format_timestamp(None)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes() {
        let args = Args::parse_from(["piezowatch", "--file", "cap.log", "--mode", "legacy"]);
        assert_eq!(args.file, Some(PathBuf::from("cap.log")));
        assert!(matches!(args.mode, Some(ModeArg::Legacy)));
        assert!(!args.mqtt);
    }

    #[test]
    fn mqtt_conflicts_with_file() {
        assert!(Args::try_parse_from(["piezowatch", "--mqtt", "--file", "x"]).is_err());
    }

    #[test]
    fn serial_port_and_baud() {
        let args = Args::parse_from(["piezowatch", "--serial", "/dev/ttyUSB0", "9600"]);
        let config = serial_config(args.serial.as_deref().unwrap()).unwrap();
        assert_eq!(config, SerialConfig::new("/dev/ttyUSB0", 9_600));

        let args = Args::parse_from(["piezowatch", "--serial"]);
        let config = serial_config(args.serial.as_deref().unwrap()).unwrap();
        assert_eq!(config, SerialConfig::default());

        assert!(serial_config(&["COM3".to_string(), "fast".to_string()]).is_err());
        assert!(Args::try_parse_from(["piezowatch", "--serial", "--mqtt"]).is_err());
    }

    #[test]
    fn router_follows_config_topics() {
        let config = EngineConfig::from_json(
            r#"{ "routes": [
                { "topic": "lab/p", "format": "piezo", "channels": [0] },
                { "topic": "lab/t", "format": "temp_hum" }
            ] }"#,
        )
        .unwrap();

        let router = line_router(&config, None);
        assert_eq!(
            router.route("[TempHum] JSON: {}"),
            piezowatch_connectors::lines::LineAction::Message { topic: "lab/t", payload: "{}" }
        );
    }
}
