/*!
 Canonical field registry

 Mapping tables address canonical records by field path (`title`,
 `image.url`, `_meta.id`, ...). This module is the single list of those
 paths for each schema, together with:
  - the value kind each field is coerced to before deserialization
  - aliases (`guid` for the episode id, `pubDate` for the publish date)
  - read-only provenance fields that only the mapper itself may set

 Lookups are case-insensitive, so legacy tables written as `Image.URL` or
 `_Meta.LastAired` resolve to `image.url` and `_meta.lastAired`.
*/

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::ChannelKind;

/// Which canonical record a mapping table produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Schema {
    Channel,
    Episode,
}

/// Shape a mapped value is coerced into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Flag,
    Seconds,
    Timestamp,
    Categories,
    Kind,
}

/// Descriptor for a single canonical field.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub read_only: bool,
    pub aliases: &'static [&'static str],
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("read_only", &self.read_only)
            .finish()
    }
}

macro_rules! fd {
    ($name:expr, $kind:expr) => {
        fd!($name, $kind, read_only: false, aliases: [])
    };
    ($name:expr, $kind:expr, aliases: [$($alias:expr),* $(,)?]) => {
        fd!($name, $kind, read_only: false, aliases: [$($alias),*])
    };
    ($name:expr, $kind:expr, read_only: $ro:expr, aliases: [$($alias:expr),* $(,)?]) => {
        FieldDescriptor {
            name: $name,
            kind: $kind,
            read_only: $ro,
            aliases: &[$($alias),*],
        }
    };
}

pub const META_SOURCE: &str = "_meta.source";
pub const META_SOURCE_URL: &str = "_meta.sourceUrl";

static CHANNEL_FIELDS: &[FieldDescriptor] = &[
    fd!("title", FieldKind::Text),
    fd!("description", FieldKind::Text),
    fd!("author", FieldKind::Text),
    fd!("language", FieldKind::Text),
    fd!("link", FieldKind::Text),
    fd!("copyright", FieldKind::Text),
    fd!("explicit", FieldKind::Flag),
    fd!("summary", FieldKind::Text),
    fd!("subtitle", FieldKind::Text),
    fd!("keywords", FieldKind::Text),
    fd!("locked", FieldKind::Flag),
    fd!("category", FieldKind::Categories, aliases: ["categories"]),
    fd!("image.url", FieldKind::Text, aliases: ["imageUrl", "image.href"]),
    fd!("image.title", FieldKind::Text),
    fd!("image.link", FieldKind::Text),
    // Metadata
    fd!("_meta.id", FieldKind::Text),
    fd!("_meta.kind", FieldKind::Kind),
    fd!("_meta.frequency", FieldKind::Text),
    fd!("_meta.lastAired", FieldKind::Timestamp),
    fd!(META_SOURCE, FieldKind::Text, read_only: true, aliases: []),
    fd!(META_SOURCE_URL, FieldKind::Text, read_only: true, aliases: []),
];

static EPISODE_FIELDS: &[FieldDescriptor] = &[
    fd!("id", FieldKind::Text, aliases: ["guid"]),
    fd!("title", FieldKind::Text),
    fd!("description", FieldKind::Text),
    fd!("audioUrl", FieldKind::Text, aliases: ["enclosure.url", "link"]),
    fd!("imageUrl", FieldKind::Text, aliases: ["image.url"]),
    fd!("durationSeconds", FieldKind::Seconds, aliases: ["duration"]),
    fd!("publishedAt", FieldKind::Timestamp, aliases: ["pubDate", "published"]),
];

impl Schema {
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        match self {
            Schema::Channel => CHANNEL_FIELDS,
            Schema::Episode => EPISODE_FIELDS,
        }
    }

    /// Find the descriptor for a canonical name or alias, ignoring case
    pub fn lookup(&self, name: &str) -> Option<&'static FieldDescriptor> {
        let name = name.trim();
        self.fields().iter().find(|fd| {
            fd.name.eq_ignore_ascii_case(name)
                || fd.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields().iter().map(|fd| fd.name).collect()
    }
}

impl FieldKind {
    /// Bring a resolved value into the shape the canonical type expects.
    ///
    /// Returns `None` when the value carries nothing usable for this kind
    /// (an unparseable date, an unknown channel kind); the field is then
    /// left at its zero value. Values that cannot be coerced at all are
    /// passed through unchanged and rejected by deserialization.
    pub fn coerce(&self, value: Value) -> Option<Value> {
        match self {
            FieldKind::Text => Some(match value {
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => other,
            }),
            FieldKind::Flag => Some(match &value {
                Value::String(s) => match parse_flag(s) {
                    Some(flag) => Value::Bool(flag),
                    None => value,
                },
                Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
                _ => value,
            }),
            FieldKind::Seconds => match &value {
                Value::Number(n) => match (n.as_u64(), n.as_f64()) {
                    (Some(secs), _) => Some(Value::from(secs)),
                    (None, Some(f)) if f >= 0.0 => Some(Value::from(f.round() as u64)),
                    _ => None,
                },
                Value::String(s) => parse_seconds(s).map(Value::from),
                _ => Some(value),
            },
            FieldKind::Timestamp => match &value {
                Value::String(s) => parse_timestamp(s).map(|d| Value::String(d.to_rfc3339())),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .map(|d| Value::String(d.to_rfc3339())),
                _ => Some(value),
            },
            FieldKind::Categories => Some(match value {
                Value::String(text) => serde_json::json!([{ "text": text }]),
                other => other,
            }),
            FieldKind::Kind => match &value {
                Value::String(s) => ChannelKind::parse(s)
                    .and_then(|kind| serde_json::to_value(kind).ok()),
                _ => None,
            },
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" | "y" | "on" => Some(true),
        "no" | "false" | "0" | "n" | "off" | "" | "clean" => Some(false),
        _ => None,
    }
}

/// Plain seconds (`"1815"`) or a clock duration (`"30:15"`, `"1:02:03"`)
fn parse_seconds(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Some(secs);
    }
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }
    parts.iter().try_fold(0u64, |total, part| {
        let n = part.trim().parse::<u64>().ok()?;
        total.checked_mul(60)?.checked_add(n)
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_rfc2822(s))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}
