//! Endpoint runner
//!
//! [`GenApi`] holds everything one upstream source needs (name, base URL,
//! headers, transport, cache) and runs compiled endpoints against it:
//! build the URL, consult the staleness cache, fetch on a miss, persist the
//! body, then decode with the endpoint's mapping. Decoding always starts
//! from raw bytes, so mapping changes apply to cached payloads too.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use staleness_cache::{CacheError, StalenessCache};
use tracing::{debug, error, warn};
use url::Url;

use super::endpoint::{Endpoint, EndpointConfig, RequestParams};
use super::fields::Schema;
use super::mapper::FieldMapper;
use super::path::PathResolver;
use super::template::TemplateExpander;
use crate::config::defaults;
use crate::errors::{ApiError, ApiResult};
use crate::models::{ChannelList, EpisodeList};
use crate::utils::{HttpRequest, HttpTransport, StandardHttpClient, UrlUtils};

/// Where a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOrigin {
    Cache,
    Network,
}

/// Raw bytes of one endpoint run
#[derive(Debug)]
pub struct FetchedPayload {
    pub body: Vec<u8>,
    pub origin: PayloadOrigin,
    /// File the body was written to, for network fetches with a cache
    pub cache_path: Option<PathBuf>,
    /// Set when the body was fetched but could not be cached
    pub cache_error: Option<CacheError>,
}

/// Decoded records plus the payload they came from
#[derive(Debug)]
pub struct EndpointRun<T> {
    pub records: Vec<T>,
    pub raw: Vec<u8>,
    pub origin: PayloadOrigin,
    pub cache_error: Option<CacheError>,
}

/// Generic API adapter for one upstream source
pub struct GenApi {
    name: String,
    base_url: Url,
    headers: Vec<(String, String)>,
    cache_ttl: Duration,
    client: Arc<dyn HttpTransport>,
    cache: Option<Arc<dyn StalenessCache>>,
    resolver: PathResolver,
    templates: Arc<TemplateExpander>,
}

impl GenApi {
    /// Engine with default TTL, no headers and no cache
    pub fn new(name: &str, base_url: &str, client: Arc<dyn HttpTransport>) -> ApiResult<Self> {
        Self::builder()
            .name(name)
            .base_url(base_url)
            .client(client)
            .build()
    }

    #[must_use]
    pub fn builder() -> GenApiBuilder {
        GenApiBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn templates(&self) -> &TemplateExpander {
        &self.templates
    }

    /// Compile an endpoint definition with this engine's resolver and
    /// template environment
    pub fn compile(&self, config: &EndpointConfig, schema: Schema) -> ApiResult<Endpoint> {
        Endpoint::compile(config, schema, &self.resolver, &self.templates)
    }

    fn mapper(&self) -> FieldMapper<'_> {
        FieldMapper::new(
            &self.resolver,
            &self.templates,
            &self.name,
            self.base_url.as_str(),
        )
    }

    fn template_vars(&self, endpoint: &Endpoint, params: &RequestParams) -> Map<String, Value> {
        let mut vars = params.to_vars();
        vars.insert(
            "endpoint".to_string(),
            json!({
                "method": endpoint.http_method().as_str(),
                "path": endpoint.path(),
                "query": endpoint.query(),
            }),
        );
        vars.insert(
            "api".to_string(),
            json!({ "name": self.name, "baseUrl": self.base_url.as_str() }),
        );
        vars
    }

    /// Build the concrete request URL.
    ///
    /// The endpoint path is appended to the base path. Base query
    /// parameters are templated in place and the endpoint query is appended
    /// after them, never replacing existing parameters.
    pub fn build_url(&self, endpoint: &Endpoint, params: &RequestParams) -> ApiResult<Url> {
        let vars = self.template_vars(endpoint, params);
        let mut url = self.base_url.clone();

        if !endpoint.path().is_empty() {
            let joined = format!(
                "{}/{}",
                url.path().trim_end_matches('/'),
                endpoint.path().trim_start_matches('/')
            );
            let path = self.templates.expand(&joined, &path_vars(vars.clone(), params)?)?;
            url.set_path(&path);
        }

        let base_pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if !base_pairs.is_empty() {
            let mut expanded = Vec::with_capacity(base_pairs.len());
            for (key, value) in &base_pairs {
                expanded.push((
                    self.templates.expand(key, &vars)?,
                    self.templates.expand(value, &vars)?,
                ));
            }
            url.query_pairs_mut().clear().extend_pairs(expanded);
        }

        if !endpoint.query().is_empty() {
            let query = self.templates.expand(endpoint.query(), &vars)?;
            let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }
        }

        Ok(url)
    }

    fn build_request(
        &self,
        endpoint: &Endpoint,
        params: &RequestParams,
        url: Url,
    ) -> ApiResult<HttpRequest> {
        let body = if endpoint.body().is_empty() {
            None
        } else {
            let vars = self.template_vars(endpoint, params);
            Some(self.templates.expand(endpoint.body(), &vars)?.into_bytes())
        };

        Ok(HttpRequest {
            method: endpoint.http_method().clone(),
            url,
            headers: self.headers.clone(),
            body,
        })
    }

    /// Cache entry for `key`: `[name, key]`, with `.json` added when the
    /// key has no extension. `None` when caching is off or the key is empty.
    fn cache_entry(&self, key: &str) -> Option<Vec<String>> {
        if self.cache.is_none() || key.is_empty() {
            return None;
        }
        let mut file = key.to_string();
        if Path::new(key).extension().is_none() {
            file.push_str(".json");
        }
        Some(vec![self.name.clone(), file])
    }

    fn cutoff(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.cache_ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Fetch the raw payload for `endpoint`, from cache when fresh.
    ///
    /// Performs at most one HTTP request. Statuses >= 400 are errors and
    /// their bodies are never cached. A failed cache write is reported in
    /// [`FetchedPayload::cache_error`] without dropping the body.
    pub async fn fetch(
        &self,
        endpoint: &Endpoint,
        params: &RequestParams,
        cache_key_prefix: &str,
    ) -> ApiResult<FetchedPayload> {
        self.fetch_inner(endpoint, params, cache_key_prefix, true)
            .await
    }

    async fn fetch_inner(
        &self,
        endpoint: &Endpoint,
        params: &RequestParams,
        cache_key_prefix: &str,
        use_cache: bool,
    ) -> ApiResult<FetchedPayload> {
        let cache_key = params.cache_key(cache_key_prefix);
        let url = self.build_url(endpoint, params)?;
        let entry = self.cache_entry(&cache_key);

        if let (true, Some(cache), Some(entry)) = (use_cache, &self.cache, &entry) {
            match cache.retrieve(entry, self.cutoff()).await {
                Ok(Some(body)) if !body.is_empty() => {
                    debug!(source = %self.name, cache_key = %cache_key, "Using cache");
                    return Ok(FetchedPayload {
                        body,
                        origin: PayloadOrigin::Cache,
                        cache_path: None,
                        cache_error: None,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(source = %self.name, cache_key = %cache_key, error = %e, "Failed to get cached item");
                }
            }
        }
        debug!(source = %self.name, cache_key = %cache_key, "Not using cache");

        let request = self.build_request(endpoint, params, url)?;
        let method = request.method.clone();
        let safe_url = UrlUtils::obfuscate_credentials(request.url.as_str());
        debug!(method = %method, uri = %safe_url, "Performing request");

        let response = self.client.execute(request).await?;
        debug!(
            method = %method,
            uri = %safe_url,
            status = response.status,
            content_type = response.content_type.as_deref().unwrap_or(""),
            content_length = response.content_length,
            "Got response"
        );

        if response.is_error() {
            error!(
                method = %method,
                uri = %safe_url,
                status = response.status,
                body = %String::from_utf8_lossy(&response.body),
                "Unsuccessful status code"
            );
            return Err(ApiError::Status {
                status: response.status,
                url: safe_url,
            });
        }

        let (cache_path, cache_error) = match (&self.cache, &entry) {
            (Some(cache), Some(entry)) => match cache.write(entry, &response.body).await {
                Ok(path) => (Some(path), None),
                Err(e) => {
                    error!(source = %self.name, cache_key = %cache_key, error = %e, "Failed to write cached item");
                    (None, Some(e))
                }
            },
            _ => (None, None),
        };

        Ok(FetchedPayload {
            body: response.body,
            origin: PayloadOrigin::Network,
            cache_path,
            cache_error,
        })
    }

    /// Map raw bytes with `endpoint`'s mapping table
    pub fn decode<T: DeserializeOwned>(&self, endpoint: &Endpoint, raw: &[u8]) -> ApiResult<Vec<T>> {
        self.mapper().decode(endpoint, raw)
    }

    /// Fetch and decode.
    ///
    /// A cached payload that no longer decodes is refetched once from the
    /// network instead of failing.
    pub async fn run_endpoint<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        params: &RequestParams,
        cache_key_prefix: &str,
    ) -> ApiResult<EndpointRun<T>> {
        let payload = self
            .fetch_inner(endpoint, params, cache_key_prefix, true)
            .await?;

        let (payload, records) = match self.decode(endpoint, &payload.body) {
            Ok(records) => (payload, records),
            Err(e) if payload.origin == PayloadOrigin::Cache => {
                warn!(
                    source = %self.name,
                    endpoint = %endpoint.composite_key(),
                    error = %e,
                    "Cached payload does not decode, fetching again"
                );
                let payload = self
                    .fetch_inner(endpoint, params, cache_key_prefix, false)
                    .await?;
                let records = self.decode(endpoint, &payload.body)?;
                (payload, records)
            }
            Err(e) => return Err(e),
        };

        Ok(EndpointRun {
            records,
            raw: payload.body,
            origin: payload.origin,
            cache_error: payload.cache_error,
        })
    }

    /// Run a channel endpoint
    pub async fn run_channels(
        &self,
        endpoint: &Endpoint,
        params: &RequestParams,
        cache_key_prefix: &str,
    ) -> ApiResult<ChannelList> {
        let run = self.run_endpoint(endpoint, params, cache_key_prefix).await?;
        Ok(ChannelList {
            channels: run.records,
            raw: run.raw,
        })
    }

    /// Run an episode endpoint
    pub async fn run_episodes(
        &self,
        endpoint: &Endpoint,
        params: &RequestParams,
        cache_key_prefix: &str,
    ) -> ApiResult<EpisodeList> {
        let run = self.run_endpoint(endpoint, params, cache_key_prefix).await?;
        Ok(EpisodeList {
            episodes: run.records,
            raw: run.raw,
        })
    }
}

/// `vars` with every string parameter percent-encoded as one path segment,
/// so values cannot add segments or climb out of the endpoint path.
fn path_vars(mut vars: Map<String, Value>, params: &RequestParams) -> ApiResult<Map<String, Value>> {
    for (name, value) in params.iter() {
        if let Value::String(raw) = value {
            if raw == "." || raw == ".." {
                return Err(ApiError::configuration(format!(
                    "parameter '{name}' cannot be used as a path segment: '{raw}'"
                )));
            }
            let encoded = url::form_urlencoded::byte_serialize(raw.as_bytes())
                .collect::<String>()
                .replace('+', "%20");
            vars.insert(name.to_string(), Value::String(encoded));
        }
    }
    Ok(vars)
}

/// Builder for [`GenApi`]
#[derive(Default)]
pub struct GenApiBuilder {
    name: Option<String>,
    base_url: Option<String>,
    headers: Vec<(String, String)>,
    cache_ttl: Option<Duration>,
    client: Option<Arc<dyn HttpTransport>>,
    cache: Option<Arc<dyn StalenessCache>>,
    resolver: Option<PathResolver>,
    templates: Option<Arc<TemplateExpander>>,
}

impl GenApiBuilder {
    #[must_use]
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Base URL; a missing scheme defaults to https
    #[must_use]
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Header sent with every request
    #[must_use]
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn client(mut self, client: Arc<dyn HttpTransport>) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn StalenessCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Resolver carrying the modifier registry to use
    #[must_use]
    pub fn resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn templates(mut self, templates: Arc<TemplateExpander>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    /// Configuration errors for a missing name or an unusable base URL.
    pub fn build(self) -> ApiResult<GenApi> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::configuration("name is required"))?;

        let base_url = self
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::configuration(format!("{name}: base URL is required")))?;
        let base_url = UrlUtils::parse_base(&base_url)?;

        let client = match self.client {
            Some(client) => client,
            None => Arc::new(StandardHttpClient::new(
                defaults::DEFAULT_CONNECT_TIMEOUT,
                Some(defaults::DEFAULT_REQUEST_TIMEOUT),
                defaults::DEFAULT_USER_AGENT,
            )?) as Arc<dyn HttpTransport>,
        };

        Ok(GenApi {
            name,
            base_url,
            headers: self.headers,
            cache_ttl: self.cache_ttl.unwrap_or(defaults::DEFAULT_CACHE_TTL),
            client,
            cache: self.cache,
            resolver: self.resolver.unwrap_or_default(),
            templates: self.templates.unwrap_or_default(),
        })
    }
}
