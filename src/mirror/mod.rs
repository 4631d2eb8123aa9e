//! Feed mirroring
//!
//! Renders the merged channels of every source into one RSS file each,
//! named after the sanitized channel title.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use staleness_cache::sanitize_segment;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::models::Channel;
use crate::rss::RssFeedWriter;
use crate::sources::{FetchSummary, SourceAggregator};

pub const FEED_EXTENSION: &str = "xml";

/// Result of a mirror run
#[derive(Debug, Default)]
pub struct MirrorReport {
    pub written: Vec<PathBuf>,
    /// Channel title and the error that kept its feed from being written
    pub failed: Vec<(String, AppError)>,
    pub summary: FetchSummary,
}

/// Writes channel feeds below an output directory
#[derive(Debug, Clone)]
pub struct FeedMirror {
    writer: RssFeedWriter,
    output_dir: PathBuf,
}

impl FeedMirror {
    pub fn new<P: Into<PathBuf>>(writer: RssFeedWriter, output_dir: P) -> Self {
        Self {
            writer,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_dir
    }

    /// File a channel's feed is written to. Titles that sanitize to a name
    /// already in `taken` get the channel id appended.
    pub fn feed_path(&self, channel: &Channel, taken: &HashSet<PathBuf>) -> PathBuf {
        let stem = sanitize_segment(&channel.title, false);
        let path = self.output_dir.join(format!("{stem}.{FEED_EXTENSION}"));
        if !taken.contains(&path) || channel.meta.id.is_empty() {
            return path;
        }
        let id = sanitize_segment(&channel.meta.id, false);
        self.output_dir.join(format!("{stem}-{id}.{FEED_EXTENSION}"))
    }

    /// Render the feed of channel `id` from `source`.
    ///
    /// # Errors
    /// [`AppError::NotFound`] for an unknown source or channel, and any
    /// error from listing episodes or rendering.
    pub async fn render_channel(
        &self,
        aggregator: &SourceAggregator,
        source: &str,
        id: &str,
    ) -> AppResult<String> {
        let catalog = aggregator
            .source(source)
            .ok_or_else(|| AppError::not_found("source", source))?;

        let collected = catalog.find_all_channels().await;
        let channel = collected
            .lists
            .iter()
            .flat_map(|list| list.channels.iter())
            .find(|channel| channel.meta.id == id)
            .ok_or_else(|| AppError::not_found("channel", id))?;

        let episodes = catalog.list_episodes(id).await?;
        self.writer.render(channel, &episodes.episodes)
    }

    /// Write a feed for every merged channel of every source.
    ///
    /// Channels whose episodes cannot be fetched or rendered are reported
    /// and skipped. Failing to write into the output directory aborts the
    /// run.
    pub async fn mirror_all(&self, aggregator: &SourceAggregator) -> AppResult<MirrorReport> {
        fs::create_dir_all(&self.output_dir).await?;

        let (channels, summary) = aggregator.find_all_channels().await;
        let mut report = MirrorReport {
            summary,
            ..Default::default()
        };
        let mut taken = HashSet::new();

        for channel in &channels.channels {
            match self.render_merged(aggregator, channel).await {
                Ok(feed) => {
                    let path = self.feed_path(channel, &taken);
                    fs::write(&path, &feed).await?;
                    debug!(
                        title = %channel.title,
                        path = %path.display(),
                        size = feed.len(),
                        "Wrote rss-file"
                    );
                    taken.insert(path.clone());
                    report.written.push(path);
                }
                Err(e) => {
                    warn!(title = %channel.title, id = %channel.meta.id, error = %e, "Failed to create rss-feed");
                    report.failed.push((channel.title.clone(), e));
                }
            }
        }

        info!(
            "Mirrored {} feeds to {} ({} failed)",
            report.written.len(),
            self.output_dir.display(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn render_merged(&self, aggregator: &SourceAggregator, channel: &Channel) -> AppResult<String> {
        if channel.meta.id.is_empty() {
            return Err(AppError::not_found("channel id", channel.title.clone()));
        }
        let source = aggregator
            .source(&channel.meta.source)
            .ok_or_else(|| AppError::not_found("source", channel.meta.source.clone()))?;

        debug!(title = %channel.title, source = %channel.meta.source, "Fetching episodes for channel");
        let episodes = source.list_episodes(&channel.meta.id).await?;
        self.writer.render(channel, &episodes.episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RssConfig;
    use crate::models::ChannelMeta;

    fn mirror(dir: &Path) -> FeedMirror {
        FeedMirror::new(RssFeedWriter::new(&RssConfig::default()), dir)
    }

    fn channel(id: &str, title: &str) -> Channel {
        Channel {
            title: title.to_string(),
            meta: ChannelMeta {
                id: id.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_feed_path_is_sanitized_title() {
        let mirror = mirror(Path::new("feeds"));
        let path = mirror.feed_path(&channel("1", "Krim & Kaffe: Sesong 2"), &HashSet::new());
        assert_eq!(path, PathBuf::from("feeds/Krim-Kaffe-Sesong-2.xml"));
    }

    #[test]
    fn test_feed_path_never_leaves_output_directory() {
        let mirror = mirror(Path::new("feeds"));
        let path = mirror.feed_path(&channel("1", "../../etc/passwd"), &HashSet::new());
        assert_eq!(path.parent(), Some(Path::new("feeds")));
    }

    #[test]
    fn test_colliding_titles_get_the_id() {
        let mirror = mirror(Path::new("feeds"));
        let mut taken = HashSet::new();
        taken.insert(mirror.feed_path(&channel("1", "Krim"), &taken));

        let second = mirror.feed_path(&channel("2", "Krim!"), &taken);
        assert_eq!(second, PathBuf::from("feeds/Krim-2.xml"));
    }
}
