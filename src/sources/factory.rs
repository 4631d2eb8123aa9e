//! Source factory
//!
//! Turns a [`SourceConfig`] into a ready [`CatalogSource`], sharing one
//! transport, cache and template environment between all sources.

use std::sync::Arc;
use std::time::Duration;

use staleness_cache::StalenessCache;
use tracing::info;

use super::generic::GenericSource;
use super::traits::CatalogSource;
use super::untold;
use crate::config::{Config, SourceConfig, SourceKind};
use crate::errors::{ApiError, ApiResult};
use crate::genapi::{GenApi, PathResolver, TemplateExpander};
use crate::utils::HttpTransport;

/// Collaborators shared by every source
#[derive(Clone)]
pub struct SourceContext {
    pub client: Arc<dyn HttpTransport>,
    pub cache: Option<Arc<dyn StalenessCache>>,
    pub cache_ttl: Duration,
    pub resolver: PathResolver,
    pub templates: Arc<TemplateExpander>,
}

impl SourceContext {
    pub fn new(client: Arc<dyn HttpTransport>, cache: Option<Arc<dyn StalenessCache>>, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache,
            cache_ttl,
            resolver: PathResolver::default(),
            templates: Arc::new(TemplateExpander::new()),
        }
    }

    /// Use `resolver` (and its modifier registry) for every source
    #[must_use]
    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }
}

pub struct SourceFactory;

impl SourceFactory {
    /// Build one source.
    ///
    /// # Errors
    /// Configuration errors for missing names or URLs and for invalid
    /// endpoint definitions.
    pub fn create(config: &SourceConfig, context: &SourceContext) -> ApiResult<Arc<dyn CatalogSource>> {
        let config = match config.kind {
            SourceKind::Untold => untold::apply_preset(config),
            SourceKind::Generic => config.clone(),
        };

        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| ApiError::configuration(format!("source '{}' needs a base_url", config.name)))?;

        let mut builder = GenApi::builder()
            .name(config.name.clone())
            .base_url(base_url)
            .headers(config.headers.clone())
            .cache_ttl(config.cache_ttl.unwrap_or(context.cache_ttl))
            .client(context.client.clone())
            .resolver(context.resolver.clone())
            .templates(context.templates.clone());
        if let Some(token) = &config.token {
            builder = builder.header("authorization", token.clone());
        }
        if let Some(cache) = &context.cache {
            builder = builder.cache(cache.clone());
        }
        let api = builder.build()?;

        let source = GenericSource::new(
            api,
            config.kind,
            &config.channel_endpoints,
            config.episodes_endpoint.as_ref(),
            config.search_endpoint.as_ref(),
        )?;

        info!(
            "Configured source '{}' ({:?}) with channel endpoints {:?}",
            config.name,
            config.kind,
            source.channel_endpoint_names()
        );
        Ok(Arc::new(source))
    }

    /// Build every enabled source in configuration order
    pub fn create_all(config: &Config, context: &SourceContext) -> ApiResult<Vec<Arc<dyn CatalogSource>>> {
        config
            .enabled_sources()
            .map(|source| Self::create(source, context))
            .collect()
    }
}
