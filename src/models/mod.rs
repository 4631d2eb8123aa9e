//! Canonical catalogue records
//!
//! Every upstream shape is mapped into these types. Field names on the wire
//! are the canonical field paths understood by the mapping tables (see
//! [`crate::genapi::fields`]), so a mapped JSON object deserializes straight
//! into a [`Channel`] or [`Episode`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of title a channel is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Podcast,
    Book,
}

impl ChannelKind {
    /// Parse a string into a ChannelKind, `None` for unknown values
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "podcast" => Some(ChannelKind::Podcast),
            "book" | "audiobook" => Some(ChannelKind::Book),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub link: String,
}

impl Image {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }
}

/// Provenance and bookkeeping attached to every mapped channel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelMeta {
    /// Identifier at the upstream API, used as the dedup key. May be empty.
    pub id: String,
    pub kind: Option<ChannelKind>,
    pub frequency: String,
    pub last_aired: Option<DateTime<Utc>>,
    /// Name of the source the channel was fetched from
    pub source: String,
    /// Composite key of the endpoint the channel was mapped from
    pub source_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Channel {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub link: String,
    pub copyright: String,
    pub explicit: bool,
    pub summary: String,
    pub subtitle: String,
    pub keywords: String,
    pub locked: bool,
    pub category: Vec<Category>,
    pub image: Image,
    #[serde(rename = "_meta")]
    pub meta: ChannelMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub image_url: String,
    pub duration_seconds: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Channels produced by one endpoint run or one merge step.
///
/// `raw` keeps the upstream payload the channels were mapped from; merged
/// lists carry no raw bytes.
#[derive(Debug, Clone, Default)]
pub struct ChannelList {
    pub channels: Vec<Channel>,
    pub raw: Vec<u8>,
}

impl ChannelList {
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EpisodeList {
    pub episodes: Vec<Episode>,
    pub raw: Vec<u8>,
}
