//! Integration tests for capture replay into a shared engine

use std::io::Write;

use base64::{engine::general_purpose::STANDARD, Engine};
use piezowatch_connectors::{
    lines::LineRouter, lock_engine, replay::LineSource, shared_engine, EngineSink,
    TelemetrySource,
};
use piezowatch_core::{ChannelKey, FixedTime, TelemetryEngine};

const BASE_TS: u32 = 1_732_012_345;

fn piezo_line(samples: &[i16]) -> String {
    let mut record = Vec::new();
    record.extend_from_slice(&BASE_TS.to_le_bytes());
    record.extend_from_slice(&100u16.to_le_bytes());
    record.push(samples.len() as u8);
    record.push(1);
    for v in samples {
        record.extend_from_slice(&v.to_le_bytes());
    }
    format!(
        r#"I (5120) piezo: [Piezo] JSON: {{"ts": 1732012345678, "time_interval": 100, "base64_sensordata": "{}"}}"#,
        STANDARD.encode(record)
    )
}

#[tokio::test]
async fn replays_serial_capture_file() {
    let mut capture = tempfile::NamedTempFile::new().unwrap();
    writeln!(capture, "rst:0x1 (POWERON_RESET),boot:0x13").unwrap();
    writeln!(capture, "{}", piezo_line(&[100, -32768, 300])).unwrap();
    writeln!(capture, "[TempHum] JSON: {{\"base64_sensordata\": \"OWk8ZykJhRo=\"}}").unwrap();
    writeln!(capture, "[Piezo] JSON: {{\"base64_sensordata\": \"AQ\"}}").unwrap();
    writeln!(capture).unwrap();
    capture.flush().unwrap();

    let engine = shared_engine(TelemetryEngine::default());
    let mut sink = EngineSink::new(engine.clone(), FixedTime::new(BASE_TS as i64 * 1000 + 1_000));
    let mut source = LineSource::open(capture.path(), LineRouter::default()).await.unwrap();

    source.run(&mut sink).await.unwrap();

    let report = source.report();
    assert_eq!((report.lines, report.delivered, report.rejected, report.skipped), (5, 3, 1, 2));
    assert_eq!(sink.stats().messages_received, 3);
    assert_eq!(sink.stats().messages_rejected, 1);

    let engine = lock_engine(&engine);
    let values: Vec<f64> = engine.snapshot(ChannelKey::ALL[0]).iter().map(|s| s.value).collect();
    assert_eq!(values, vec![1.0, 3.0]);
    assert_eq!(engine.last_climate().map(|c| c.humidity), Some(67.89));
}

#[tokio::test]
async fn missing_capture_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = LineSource::open(dir.path().join("absent.log"), LineRouter::default()).await;

    assert!(matches!(result, Err(piezowatch_connectors::ConnectorError::Io(_))));
}

#[tokio::test]
async fn untagged_lines_use_default_topic() {
    let line = piezo_line(&[250]);
    let bare = line.split("JSON: ").nth(1).unwrap().to_string() + "\n";

    let engine = shared_engine(TelemetryEngine::default());
    let mut sink = EngineSink::new(engine.clone(), FixedTime::new(BASE_TS as i64 * 1000));

    let router = LineRouter::default().default_topic("iot/piezo");
    LineSource::new(bare.as_bytes(), router).run(&mut sink).await.unwrap();

    assert_eq!(lock_engine(&engine).snapshot(ChannelKey::ALL[0])[0].value, 2.5);
}
