//! Line-oriented sources: capture files and stdin
//!
//! A [`LineSource`] reads lines from any async reader, routes them with a
//! [`LineRouter`] and hands messages to the sink. Interactive sources stop on
//! a quit word and accept bare envelopes on the piezo topic; file sources read
//! to the end and treat quit words as noise.
//!
//! Lines are decoded lossily: a serial console emits garbage bytes at boot,
//! and one bad line must not end the run.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::lines::{LineAction, LineRouter};
use crate::{ConnectorError, MessageSink, TelemetrySource};

/// Line counts from one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    /// Lines read
    pub lines: u64,
    /// Lines delivered to the sink
    pub delivered: u64,
    /// Of those, lines the sink rejected
    pub rejected: u64,
    /// Lines that were not telemetry
    pub skipped: u64,
}

/// Feeds routed lines from `R` into a sink
pub struct LineSource<R> {
    reader: R,
    router: LineRouter,
    interactive: bool,
    report: ReplayReport,
}

impl LineSource<BufReader<File>> {
    /// Replay a capture file
    pub async fn open(path: impl AsRef<Path>, router: LineRouter) -> Result<Self, ConnectorError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(BufReader::new(file), router))
    }
}

impl LineSource<BufReader<Stdin>> {
    /// Read pasted lines from stdin until a quit word or EOF
    pub fn stdin(router: LineRouter) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), router).interactive(true)
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineSource<R> {
    /// Non-interactive source over `reader`
    pub fn new(reader: R, router: LineRouter) -> Self {
        Self {
            reader,
            router,
            interactive: false,
            report: ReplayReport::default(),
        }
    }

    /// Stop on `quit`, `exit` or `q`, and deliver bare `{...}` lines
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        if interactive {
            self.router = self.router.accept_bare_json();
        }
        self
    }

    /// Counts so far
    pub fn report(&self) -> ReplayReport {
        self.report
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> TelemetrySource for LineSource<R> {
    async fn run<S: MessageSink + Send>(&mut self, sink: &mut S) -> Result<(), ConnectorError> {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if self.reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            self.report.lines += 1;
            let line = String::from_utf8_lossy(&buf);

            match self.router.route(&line) {
                LineAction::Message { topic, payload } => {
                    self.report.delivered += 1;
                    if !sink.on_message(topic, payload.as_bytes()) {
                        self.report.rejected += 1;
                    }
                }
                LineAction::Quit if self.interactive => {
                    log::debug!("Quit requested after {} lines", self.report.lines);
                    break;
                }
                LineAction::Status(status) => {
                    log::info!("{}", status);
                    self.report.skipped += 1;
                }
                LineAction::Skip => {
                    if !self.router.routes_bare_json() && line.trim_start().starts_with('{') {
                        log::warn!(
                            "Skipping untagged JSON on line {}; set a default topic to decode it",
                            self.report.lines
                        );
                    }
                    self.report.skipped += 1;
                }
                LineAction::Quit => self.report.skipped += 1,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        messages: Vec<(String, String)>,
    }

    impl MessageSink for Recorder {
        fn on_message(&mut self, topic: &str, payload: &[u8]) -> bool {
            self.messages
                .push((topic.to_string(), String::from_utf8_lossy(payload).into_owned()));
            payload != b"{}"
        }
    }

    const CAPTURE: &[u8] = b"boot: ok\n\
        [Piezo] JSON: {\"ts\": 1}\n\
        quit\n\
        [TempHum] JSON: {}\n";

    #[tokio::test]
    async fn replays_tagged_lines() {
        let mut sink = Recorder::default();
        let mut source = LineSource::new(CAPTURE, LineRouter::default());

        source.run(&mut sink).await.unwrap();

        assert_eq!(
            sink.messages,
            vec![
                ("iot/piezo".to_string(), "{\"ts\": 1}".to_string()),
                ("iot/temp".to_string(), "{}".to_string()),
            ]
        );
        assert_eq!(
            source.report(),
            ReplayReport { lines: 4, delivered: 2, rejected: 1, skipped: 2 }
        );
    }

    #[tokio::test]
    async fn interactive_stops_on_quit() {
        let mut sink = Recorder::default();
        let mut source = LineSource::new(CAPTURE, LineRouter::default()).interactive(true);

        source.run(&mut sink).await.unwrap();

        assert_eq!(sink.messages.len(), 1);
        assert_eq!(source.report().lines, 3);
    }

    #[tokio::test]
    async fn interactive_decodes_pasted_envelopes() {
        let pasted: &[u8] = b"{\"Sensor1\": {\"v\": 2}}\nq\n";

        let mut sink = Recorder::default();
        let mut source = LineSource::new(pasted, LineRouter::default()).interactive(true);
        source.run(&mut sink).await.unwrap();

        assert_eq!(
            sink.messages,
            vec![("iot/piezo".to_string(), "{\"Sensor1\": {\"v\": 2}}".to_string())]
        );

        // A capture without a default topic still skips them
        let mut sink = Recorder::default();
        let mut source = LineSource::new(pasted, LineRouter::default());
        source.run(&mut sink).await.unwrap();
        assert!(sink.messages.is_empty());
        assert_eq!(source.report().skipped, 2);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_the_run() {
        let noisy: &[u8] = b"\xff\xfe\x00boot\r\n[Modem] attached\r\n[TempHum] JSON: {}\r\n";

        let mut sink = Recorder::default();
        let mut source = LineSource::new(noisy, LineRouter::default());
        source.run(&mut sink).await.unwrap();

        assert_eq!(sink.messages, vec![("iot/temp".to_string(), "{}".to_string())]);
        assert_eq!(
            source.report(),
            ReplayReport { lines: 3, delivered: 1, rejected: 1, skipped: 2 }
        );
    }
}
