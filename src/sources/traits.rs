//! Catalogue source abstraction

use async_trait::async_trait;

use crate::config::SourceKind;
use crate::errors::{ApiError, ApiResult};
use crate::models::{ChannelList, EpisodeList};

/// Channel lists gathered from every listing endpoint of a source, with the
/// errors of the endpoints that failed
#[derive(Debug, Default)]
pub struct CollectedChannels {
    pub lists: Vec<ChannelList>,
    pub errors: Vec<ApiError>,
}

impl CollectedChannels {
    /// Nothing was fetched and at least one endpoint failed
    pub fn is_failure(&self) -> bool {
        self.lists.is_empty() && !self.errors.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.lists.iter().map(ChannelList::len).sum()
    }
}

/// An upstream catalogue of podcasts and audiobooks
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Name the source was configured with; also its cache namespace
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Run every channel listing endpoint.
    ///
    /// One failing endpoint does not stop the others; its error is collected
    /// next to whatever the rest returned.
    async fn find_all_channels(&self) -> CollectedChannels;

    /// Episodes of the channel with upstream id `id`
    async fn list_episodes(&self, id: &str) -> ApiResult<EpisodeList>;

    /// Channels matching `query`
    async fn search_titles(&self, query: &str) -> ApiResult<ChannelList>;
}
