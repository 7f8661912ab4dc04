//! Channel keys and topic routing
//!
//! ## Overview
//!
//! Wire order is not channel identity. A batch's channel slot 0 on one topic
//! and slot 0 on another topic can be different physical sensors, and a node
//! may send more channels than are wired to anything. The [`TopicTable`] maps
//! every `(topic, slot)` pair to a stable [`ChannelKey`] through an explicit
//! ordered list per topic:
//!
//! ```text
//! topic        format     slot 0     slot 1     slot 2     slot 3     slot 4..
//! iot/piezo    Piezo      piezo-01   piezo-02   piezo-03   piezo-04   (dropped)
//! iot/temp     TempHum    -
//! ```
//!
//! Lookups past the end of a topic's list return
//! [`DecodeError::UnmappedChannel`]; the dispatcher counts and drops those
//! samples instead of failing the message.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::constants::{
    topics::DEFAULT_PIEZO_TOPIC_CHANNELS, DEFAULT_PIEZO_TOPIC, DEFAULT_TEMP_TOPIC,
    MAX_PIEZO_CHANNELS,
};
use crate::errors::{DecodeError, DecodeResult};

/// Identifier of one physical piezo channel (0-based index into the sixteen
/// addressable channels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct ChannelKey(u8);

impl ChannelKey {
    /// Every addressable channel, in index order
    pub const ALL: [ChannelKey; MAX_PIEZO_CHANNELS] = {
        let mut keys = [ChannelKey(0); MAX_PIEZO_CHANNELS];
        let mut i = 0;
        while i < MAX_PIEZO_CHANNELS {
            keys[i] = ChannelKey(i as u8);
            i += 1;
        }
        keys
    };

    /// Key for channel `index`, if it is addressable
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < MAX_PIEZO_CHANNELS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Zero-based channel index
    pub const fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "piezo-{:02}", self.0 + 1)
    }
}

impl TryFrom<u8> for ChannelKey {
    type Error = DecodeError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(DecodeError::UnmappedChannel { slot: index as usize })
    }
}

impl From<ChannelKey> for u8 {
    fn from(key: ChannelKey) -> Self {
        key.0
    }
}

/// Binary record format carried on a topic
///
/// One format per topic; payloads are never sniffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RecordFormat {
    /// Multi-channel piezo batches
    Piezo,
    /// Single temperature/humidity readings
    TempHum,
}

/// Route for one transport topic
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicRoute {
    /// Transport topic, matched exactly
    pub topic: String,
    /// Record format carried on the topic
    pub format: RecordFormat,
    /// Channel key for each slot, in slot order
    #[cfg_attr(feature = "serde", serde(default))]
    pub channels: Vec<ChannelKey>,
}

impl TopicRoute {
    /// Route with no channels; see [`with_channels`](Self::with_channels)
    pub fn new(topic: impl Into<String>, format: RecordFormat) -> Self {
        Self {
            topic: topic.into(),
            format,
            channels: Vec::new(),
        }
    }

    /// Wire `channels` to slots 0.. in order
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = ChannelKey>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    /// Channel key for `slot`
    pub fn channel(&self, slot: usize) -> DecodeResult<ChannelKey> {
        self.channels
            .get(slot)
            .copied()
            .ok_or(DecodeError::UnmappedChannel { slot })
    }

    /// Number of slots that resolve to a key for a batch of `decoded` channels
    pub fn mapped_len(&self, decoded: usize) -> usize {
        self.channels.len().min(decoded)
    }
}

/// Static topic → route table, resolved once at configuration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTable {
    routes: Vec<TopicRoute>,
}

impl TopicTable {
    /// Table over `routes`; lookups take the first route with a matching topic
    pub fn new(routes: Vec<TopicRoute>) -> Self {
        Self { routes }
    }

    /// Route for `topic`
    pub fn route(&self, topic: &str) -> DecodeResult<&TopicRoute> {
        self.routes
            .iter()
            .find(|r| r.topic == topic)
            .ok_or(DecodeError::UnknownTopic)
    }

    /// Channel key for `slot` on `topic`
    pub fn resolve(&self, topic: &str, slot: usize) -> DecodeResult<ChannelKey> {
        self.route(topic)?.channel(slot)
    }

    /// Configured routes in order
    pub fn routes(&self) -> &[TopicRoute] {
        &self.routes
    }

    /// Every topic in the table, for subscribing
    pub fn topics(&self) -> impl Iterator<Item = &str> + '_ {
        self.routes.iter().map(|r| r.topic.as_str())
    }

    /// Every channel key referenced by any route
    pub fn channel_keys(&self) -> impl Iterator<Item = ChannelKey> + '_ {
        self.routes.iter().flat_map(|r| r.channels.iter().copied())
    }
}

impl Default for TopicTable {
    /// Piezo topic wired to the first four channels, plus the climate topic
    fn default() -> Self {
        Self::new(alloc::vec![
            TopicRoute::new(DEFAULT_PIEZO_TOPIC, RecordFormat::Piezo)
                .with_channels(ChannelKey::ALL[..DEFAULT_PIEZO_TOPIC_CHANNELS].iter().copied()),
            TopicRoute::new(DEFAULT_TEMP_TOPIC, RecordFormat::TempHum),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn sixteen_distinct_keys() {
        assert_eq!(ChannelKey::ALL.len(), 16);
        for (i, key) in ChannelKey::ALL.iter().enumerate() {
            assert_eq!(key.index() as usize, i);
        }
        assert!(ChannelKey::new(15).is_some());
        assert!(ChannelKey::new(16).is_none());
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(ChannelKey::ALL[0].to_string(), "piezo-01");
        assert_eq!(ChannelKey::ALL[15].to_string(), "piezo-16");
    }

    #[test]
    fn default_table_maps_four_piezo_slots() {
        let table = TopicTable::default();

        for slot in 0..4 {
            assert_eq!(table.resolve("iot/piezo", slot), Ok(ChannelKey::ALL[slot]));
        }
        assert_eq!(
            table.resolve("iot/piezo", 4),
            Err(DecodeError::UnmappedChannel { slot: 4 })
        );
        assert_eq!(table.route("iot/temp").map(|r| r.format), Ok(RecordFormat::TempHum));
    }

    #[test]
    fn unknown_topic() {
        let table = TopicTable::default();
        assert_eq!(table.route("iot/other").err(), Some(DecodeError::UnknownTopic));
    }

    #[test]
    fn mapped_len_truncates() {
        let route = TopicRoute::new("t", RecordFormat::Piezo)
            .with_channels(ChannelKey::ALL[..4].iter().copied());

        assert_eq!(route.mapped_len(2), 2);
        assert_eq!(route.mapped_len(8), 4);
    }
}
