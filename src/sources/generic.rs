//! Source driven entirely by endpoint definitions

use async_trait::async_trait;
use tracing::{debug, warn};

use super::traits::{CatalogSource, CollectedChannels};
use crate::config::{ChannelEndpointConfig, SourceKind};
use crate::errors::{ApiError, ApiResult};
use crate::genapi::{Endpoint, EndpointConfig, GenApi, RequestParams, Schema};
use crate::models::{ChannelList, EpisodeList};

pub const EPISODES_CACHE_PREFIX: &str = "episodes-";
pub const SEARCH_CACHE_PREFIX: &str = "search-";

/// Parameter carrying the channel id for episode listings
pub const EPISODES_PARAM: &str = "podID";
/// Parameter carrying the search text
pub const SEARCH_PARAM: &str = "query";

struct ChannelEndpoint {
    name: String,
    cache_key: String,
    endpoint: Endpoint,
}

/// A catalogue whose endpoints are compiled from configuration
pub struct GenericSource {
    api: GenApi,
    kind: SourceKind,
    channel_endpoints: Vec<ChannelEndpoint>,
    episodes_endpoint: Option<Endpoint>,
    search_endpoint: Option<Endpoint>,
}

impl GenericSource {
    /// Compile all endpoint definitions against `api`.
    ///
    /// # Errors
    /// Configuration or template errors from any endpoint; nothing is
    /// fetched.
    pub fn new(
        api: GenApi,
        kind: SourceKind,
        channel_endpoints: &[ChannelEndpointConfig],
        episodes_endpoint: Option<&EndpointConfig>,
        search_endpoint: Option<&EndpointConfig>,
    ) -> ApiResult<Self> {
        let compiled = channel_endpoints
            .iter()
            .map(|config| {
                Ok(ChannelEndpoint {
                    name: config.name.clone(),
                    cache_key: config.cache_key().to_string(),
                    endpoint: api.compile(&config.endpoint, Schema::Channel)?,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let episodes_endpoint = episodes_endpoint
            .map(|config| api.compile(config, Schema::Episode))
            .transpose()?;
        let search_endpoint = search_endpoint
            .map(|config| api.compile(config, Schema::Channel))
            .transpose()?;

        debug!(
            source = api.name(),
            channel_endpoints = compiled.len(),
            episodes = episodes_endpoint.is_some(),
            search = search_endpoint.is_some(),
            "Compiled source endpoints"
        );

        Ok(Self {
            api,
            kind,
            channel_endpoints: compiled,
            episodes_endpoint,
            search_endpoint,
        })
    }

    pub fn api(&self) -> &GenApi {
        &self.api
    }

    /// Names of the channel listing endpoints, in run order
    pub fn channel_endpoint_names(&self) -> Vec<&str> {
        self.channel_endpoints.iter().map(|e| e.name.as_str()).collect()
    }
}

#[async_trait]
impl CatalogSource for GenericSource {
    fn name(&self) -> &str {
        self.api.name()
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn find_all_channels(&self) -> CollectedChannels {
        let mut collected = CollectedChannels::default();
        let params = RequestParams::new();

        for channel_endpoint in &self.channel_endpoints {
            match self
                .api
                .run_channels(&channel_endpoint.endpoint, &params, &channel_endpoint.cache_key)
                .await
            {
                Ok(list) => {
                    debug!(
                        source = self.api.name(),
                        endpoint = %channel_endpoint.name,
                        count = list.len(),
                        "Got channels"
                    );
                    collected.lists.push(list);
                }
                Err(e) => {
                    warn!(
                        source = self.api.name(),
                        endpoint = %channel_endpoint.name,
                        error = %e,
                        "Channel endpoint failed"
                    );
                    collected.errors.push(e);
                }
            }
        }

        collected
    }

    async fn list_episodes(&self, id: &str) -> ApiResult<EpisodeList> {
        let endpoint = self
            .episodes_endpoint
            .as_ref()
            .ok_or_else(|| ApiError::missing_endpoint("ListEpisodes"))?;
        let params = RequestParams::new().with(EPISODES_PARAM, id);
        let list = self
            .api
            .run_episodes(endpoint, &params, EPISODES_CACHE_PREFIX)
            .await?;
        debug!(source = self.api.name(), id, count = list.episodes.len(), "Got episodes");
        Ok(list)
    }

    async fn search_titles(&self, query: &str) -> ApiResult<ChannelList> {
        let endpoint = self
            .search_endpoint
            .as_ref()
            .ok_or_else(|| ApiError::missing_endpoint("SearchTitles"))?;
        let params = RequestParams::new().with(SEARCH_PARAM, query);
        let list = self
            .api
            .run_channels(endpoint, &params, SEARCH_CACHE_PREFIX)
            .await?;
        debug!(source = self.api.name(), query, count = list.len(), "Got search results");
        Ok(list)
    }
}
