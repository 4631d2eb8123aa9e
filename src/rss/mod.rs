//! Podcast RSS 2.0 output
//!
//! Feeds are written line by line with `quick_xml::escape` for all text and
//! attribute values.

use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

use crate::config::RssConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Episode};

const NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:atom", "http://www.w3.org/2005/Atom"),
    ("xmlns:itunes", "http://www.itunes.com/dtds/podcast-1.0.dtd"),
    ("xmlns:itunesu", "http://www.itunesu.com/feed"),
    ("xmlns:googleplay", "http://www.google.com/schemas/play-podcasts/1.0"),
];

/// Serializes a channel and its episodes into a feed
#[derive(Debug, Clone)]
pub struct RssFeedWriter {
    language: String,
    owner_name: String,
}

impl RssFeedWriter {
    pub fn new(config: &RssConfig) -> Self {
        Self {
            language: config.language.clone(),
            owner_name: config.owner_name.clone(),
        }
    }

    /// Render the feed document.
    ///
    /// # Errors
    /// [`AppError::Rss`] when the channel has no title, which feed readers
    /// require.
    pub fn render(&self, channel: &Channel, episodes: &[Episode]) -> AppResult<String> {
        if channel.title.trim().is_empty() {
            return Err(AppError::Rss {
                message: format!("channel '{}' has no title", channel.meta.id),
            });
        }

        let mut out = String::with_capacity(1024 + episodes.len() * 512);
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"");
        for (name, uri) in NAMESPACES {
            out.push_str(&format!(" {name}=\"{uri}\""));
        }
        out.push_str(">\n  <channel>\n");

        let language = if channel.language.is_empty() {
            &self.language
        } else {
            &channel.language
        };
        let author = if channel.author.is_empty() {
            &self.owner_name
        } else {
            &channel.author
        };

        element(&mut out, 4, "title", &channel.title);
        element(&mut out, 4, "description", &channel.description);
        element(&mut out, 4, "language", language);
        if !channel.link.is_empty() {
            element(&mut out, 4, "link", &channel.link);
        }
        if !channel.copyright.is_empty() {
            element(&mut out, 4, "copyright", &channel.copyright);
        }
        element(&mut out, 4, "itunes:author", author);
        if !channel.summary.is_empty() {
            element(&mut out, 4, "itunes:summary", &channel.summary);
        }
        if !channel.subtitle.is_empty() {
            element(&mut out, 4, "itunes:subtitle", &channel.subtitle);
        }
        if !channel.keywords.is_empty() {
            element(&mut out, 4, "itunes:keywords", &channel.keywords);
        }
        element(&mut out, 4, "itunes:explicit", yes_no(channel.explicit));
        element(&mut out, 4, "itunes:locked", yes_no(channel.locked));
        if let Some(last_aired) = channel.meta.last_aired {
            element(&mut out, 4, "lastBuildDate", &last_aired.to_rfc2822());
        }

        out.push_str(&format!(
            "    <itunes:owner>\n      <itunes:name>{}</itunes:name>\n    </itunes:owner>\n",
            escape(self.owner_name.as_str())
        ));

        for category in &channel.category {
            out.push_str(&format!(
                "    <itunes:category text=\"{}\"/>\n",
                escape(category.text.as_str())
            ));
        }

        if !channel.image.is_empty() {
            let title = if channel.image.title.is_empty() {
                &channel.title
            } else {
                &channel.image.title
            };
            out.push_str(&format!(
                "    <itunes:image href=\"{}\"/>\n",
                escape(channel.image.url.as_str())
            ));
            out.push_str("    <image>\n");
            element(&mut out, 6, "url", &channel.image.url);
            element(&mut out, 6, "title", title);
            if !channel.image.link.is_empty() {
                element(&mut out, 6, "link", &channel.image.link);
            }
            out.push_str("    </image>\n");
        }

        for episode in episodes {
            write_item(&mut out, episode);
        }

        out.push_str("  </channel>\n</rss>\n");
        Ok(out)
    }
}

fn write_item(out: &mut String, episode: &Episode) {
    out.push_str("    <item>\n");
    element(out, 6, "title", &episode.title);
    element(out, 6, "description", &episode.description);
    if !episode.id.is_empty() {
        out.push_str(&format!(
            "      <guid isPermaLink=\"false\">{}</guid>\n",
            escape(episode.id.as_str())
        ));
    }
    if !episode.audio_url.is_empty() {
        element(out, 6, "link", &episode.audio_url);
        out.push_str(&format!(
            "      <enclosure url=\"{}\" type=\"audio/mpeg\" length=\"{}\"/>\n",
            escape(episode.audio_url.as_str()),
            episode.duration_seconds.unwrap_or(0).saturating_mul(1000)
        ));
    }
    if let Some(seconds) = episode.duration_seconds {
        element(out, 6, "itunes:duration", &format_duration(seconds));
    }
    if let Some(published) = episode.published_at {
        element(out, 6, "pubDate", &format_pub_date(published));
    }
    if !episode.image_url.is_empty() {
        out.push_str(&format!(
            "      <itunes:image href=\"{}\"/>\n",
            escape(episode.image_url.as_str())
        ));
    }
    out.push_str("    </item>\n");
}

fn element(out: &mut String, indent: usize, name: &str, text: &str) {
    out.push_str(&format!(
        "{:indent$}<{name}>{}</{name}>\n",
        "",
        escape(text),
        indent = indent
    ));
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn format_pub_date(date: DateTime<Utc>) -> String {
    date.to_rfc2822()
}

/// `H:MM:SS`, hours not zero-padded
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
