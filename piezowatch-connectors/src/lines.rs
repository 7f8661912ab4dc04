//! Serial console line routing
//!
//! Nodes echo every published envelope on their serial console with a tag
//! naming the record type. Captures of that console are mapped back to
//! transport topics here:
//!
//! | Line                          | Topic                  |
//! |-------------------------------|------------------------|
//! | `[Piezo] JSON: {...}`         | piezo topic            |
//! | `[TempHum] JSON: {...}`       | temp/hum topic         |
//! | `{...}`                       | default topic, if set  |
//! | `quit` / `exit` / `q`         | stop (interactive)     |
//! | `[Modem]`, `[TimeSync]`, ...  | node status, logged    |
//! | anything else                 | skipped                |

use piezowatch_core::constants::{DEFAULT_PIEZO_TOPIC, DEFAULT_TEMP_TOPIC};

const PIEZO_TAG: &str = "[Piezo] JSON:";
const TEMPHUM_TAG: &str = "[TempHum] JSON:";
const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];
/// Node firmware status tags worth surfacing to the operator
const STATUS_TAGS: [&str; 4] = ["[Modem]", "[TimeSync]", "[Setup]", "[Core"];

/// What to do with one captured line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction<'a> {
    /// Deliver `payload` as if received on `topic`
    Message { topic: &'a str, payload: &'a str },
    /// Operator asked to stop
    Quit,
    /// Node status output, not telemetry
    Status(&'a str),
    /// Not a telemetry line
    Skip,
}

/// Maps captured console lines to topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRouter {
    piezo_topic: String,
    temp_topic: String,
    default_topic: Option<String>,
}

impl Default for LineRouter {
    fn default() -> Self {
        Self::new(DEFAULT_PIEZO_TOPIC, DEFAULT_TEMP_TOPIC)
    }
}

impl LineRouter {
    /// Router delivering tagged lines to the given topics
    pub fn new(piezo_topic: impl Into<String>, temp_topic: impl Into<String>) -> Self {
        Self {
            piezo_topic: piezo_topic.into(),
            temp_topic: temp_topic.into(),
            default_topic: None,
        }
    }

    /// Topic for untagged `{...}` lines; without one they are skipped
    pub fn default_topic(mut self, topic: impl Into<String>) -> Self {
        self.default_topic = Some(topic.into());
        self
    }

    /// Send untagged `{...}` lines to the piezo topic unless a default
    /// topic is already set
    pub fn accept_bare_json(mut self) -> Self {
        if self.default_topic.is_none() {
            self.default_topic = Some(self.piezo_topic.clone());
        }
        self
    }

    /// Whether untagged `{...}` lines are delivered
    pub fn routes_bare_json(&self) -> bool {
        self.default_topic.is_some()
    }

    /// Classify one line
    pub fn route<'a>(&'a self, line: &'a str) -> LineAction<'a> {
        let line = line.trim();

        if QUIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w)) {
            return LineAction::Quit;
        }

        if let Some(payload) = tagged(line, PIEZO_TAG) {
            return LineAction::Message {
                topic: &self.piezo_topic,
                payload,
            };
        }
        if let Some(payload) = tagged(line, TEMPHUM_TAG) {
            return LineAction::Message {
                topic: &self.temp_topic,
                payload,
            };
        }

        match &self.default_topic {
            Some(topic) if line.starts_with('{') => LineAction::Message {
                topic,
                payload: line,
            },
            _ if STATUS_TAGS.iter().any(|tag| line.contains(tag)) => LineAction::Status(line),
            _ => LineAction::Skip,
        }
    }
}

/// JSON after `tag`, which may be preceded by a log prefix
fn tagged<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    line.find(tag)
        .map(|at| line[at + tag.len()..].trim())
        .filter(|payload| !payload.is_empty())
}
