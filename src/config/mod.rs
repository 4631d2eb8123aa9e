//! Application configuration
//!
//! Loaded from a TOML file; every section and field has a default so a
//! minimal file only needs its `[[sources]]`.
//!
//! ```toml
//! [cache]
//! directory = "./data/cache"
//! ttl = "1440h"
//!
//! [[sources]]
//! name = "untold"
//! kind = "untold"
//! token = "Bearer ..."
//!
//! [[sources]]
//! name = "example"
//! base_url = "api.example.com"
//!
//! [[sources.channel_endpoints]]
//! name = "popular"
//! path = "/v2/shows/popular"
//! root_path = "data.items"
//! mapping = { title = "name", "_meta.id" = "id" }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use staleness_cache::sanitize_segment;
use tracing::info;

use crate::genapi::EndpointConfig;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub rss: RssConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base directory of the staleness cache
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,
    /// Maximum age of a cached payload
    #[serde(default = "default_cache_ttl", with = "duration_serde::duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    /// Deadline for a whole request, including reading the body
    #[serde(
        default = "default_request_timeout",
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RssConfig {
    #[serde(default = "default_rss_language")]
    pub language: String,
    #[serde(default = "default_rss_owner_name")]
    pub owner_name: String,
    /// Where `mirror` writes one feed file per channel
    #[serde(default = "default_feeds_directory")]
    pub output_directory: PathBuf,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            language: default_rss_language(),
            owner_name: default_rss_owner_name(),
            output_directory: default_feeds_directory(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Endpoints come entirely from configuration
    #[default]
    Generic,
    /// Built-in Untold catalogue; configured endpoints are added to it
    Untold,
}

/// One upstream catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Headers sent with every request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Sent as the `authorization` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Overrides `[cache] ttl` for this source
    #[serde(
        default,
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub cache_ttl: Option<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_endpoints: Vec<ChannelEndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes_endpoint: Option<EndpointConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_endpoint: Option<EndpointConfig>,
}

/// A named endpoint listing channels
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelEndpointConfig {
    pub name: String,
    /// Cache key of the listing; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
}

impl ChannelEndpointConfig {
    pub fn cache_key(&self) -> &str {
        self.cache_key.as_deref().unwrap_or(&self.name)
    }
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIRECTORY)
}

fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_request_timeout() -> Option<Duration> {
    Some(DEFAULT_REQUEST_TIMEOUT)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_rss_language() -> String {
    DEFAULT_RSS_LANGUAGE.to_string()
}

fn default_rss_owner_name() -> String {
    DEFAULT_RSS_OWNER_NAME.to_string()
}

fn default_feeds_directory() -> PathBuf {
    PathBuf::from(DEFAULT_FEEDS_DIRECTORY)
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Read `config_file`, or write the default configuration to it when it
    /// does not exist yet.
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> Result<Self> {
        let config_file = config_file.as_ref();
        let config: Config = if config_file.exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            if let Some(parent) = config_file.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file.display());
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not need the engine. Mapping tables are
    /// validated when sources are built.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut cache_dirs: HashMap<String, &str> = HashMap::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("every source needs a name");
            }
            if !names.insert(source.name.as_str()) {
                bail!("duplicate source name '{}'", source.name);
            }
            // Sources share the cache tree, one directory per sanitized name
            let cache_dir = sanitize_segment(&source.name, false);
            if let Some(other) = cache_dirs.insert(cache_dir.clone(), &source.name) {
                bail!(
                    "sources '{}' and '{}' would share the cache directory '{}'",
                    other,
                    source.name,
                    cache_dir
                );
            }
            if source.kind == SourceKind::Generic && source.base_url.is_none() {
                bail!("source '{}' needs a base_url", source.name);
            }

            let mut endpoint_names = HashSet::new();
            for endpoint in &source.channel_endpoints {
                if !endpoint_names.insert(endpoint.name.as_str()) {
                    bail!(
                        "source '{}' has more than one channel endpoint named '{}'",
                        source.name,
                        endpoint.name
                    );
                }
            }
        }
        Ok(())
    }

    /// Enabled sources in configuration order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[cache]
directory = "/var/cache/audio-mirror"
ttl = "2h"

[http]
connect_timeout = 5
user_agent = "test-agent"

[[sources]]
name = "untold"
kind = "untold"
token = "Bearer abc"
cache_ttl = "30m"

[[sources]]
name = "example"
base_url = "api.example.com"
headers = { accept = "application/json" }

[[sources.channel_endpoints]]
name = "popular"
path = "/v2/shows/popular"
root_path = "data.items"
mapping = { title = "name", "_meta.id" = "id" }

[sources.episodes_endpoint]
path = "/v2/shows/{{ podID }}/episodes"
mapping = { title = "title", audioUrl = "enclosure" }
"#;

    #[test]
    fn test_parse_example() {
        let config: Config = toml::from_str(EXAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.cache.directory, PathBuf::from("/var/cache/audio-mirror"));
        assert_eq!(config.cache.ttl, Duration::from_secs(2 * 60 * 60));
        assert_eq!(config.http.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.http.request_timeout, Some(DEFAULT_REQUEST_TIMEOUT));
        assert_eq!(config.rss.language, DEFAULT_RSS_LANGUAGE);

        let untold = config.source("untold").unwrap();
        assert_eq!(untold.kind, SourceKind::Untold);
        assert_eq!(untold.cache_ttl, Some(Duration::from_secs(30 * 60)));
        assert!(untold.enabled);

        let example = config.source("example").unwrap();
        assert_eq!(example.kind, SourceKind::Generic);
        assert_eq!(example.headers.get("accept").map(String::as_str), Some("application/json"));
        let popular = &example.channel_endpoints[0];
        assert_eq!(popular.cache_key(), "popular");
        assert_eq!(popular.endpoint.root_path, "data.items");
        assert_eq!(popular.endpoint.mapping.get("_meta.id").map(String::as_str), Some("id"));
        assert!(example.episodes_endpoint.is_some());
        assert!(example.search_endpoint.is_none());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.http.user_agent, DEFAULT_USER_AGENT);
        assert!(config.sources.is_empty());
    }

    #[rstest::rstest]
    #[case::extension_dropped("podcasts.no", "podcasts.se")]
    #[case::space_and_dash("a b", "a-b")]
    #[case::accents("Blåbær", "Blabaer")]
    fn test_names_sharing_a_cache_directory_are_rejected(#[case] first: &str, #[case] second: &str) {
        let config = Config {
            sources: [first, second]
                .into_iter()
                .map(|name| SourceConfig {
                    name: name.to_string(),
                    enabled: true,
                    base_url: Some("api.example.com".to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("share the cache directory"), "{err}");
    }

    #[test]
    fn test_distinct_cache_directories_pass() {
        let config: Config = toml::from_str(
            r#"
[[sources]]
name = "podcasts-no"
base_url = "x"
[[sources]]
name = "podcasts-se"
base_url = "y"
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let duplicate: Config = toml::from_str(
            r#"
[[sources]]
name = "a"
base_url = "x"
[[sources]]
name = "a"
base_url = "y"
"#,
        )
        .unwrap();
        assert!(duplicate.validate().is_err());

        let missing_url: Config = toml::from_str("[[sources]]\nname = \"a\"\n").unwrap();
        assert!(missing_url.validate().is_err());

        let bad_duration = toml::from_str::<Config>("[cache]\nttl = \"soon\"\n");
        assert!(bad_duration.is_err());
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.cache.ttl, DEFAULT_CACHE_TTL);

        let reloaded = Config::load_from_file(&path).unwrap();
        assert_eq!(reloaded.cache.directory, config.cache.directory);
        assert_eq!(reloaded.http.request_timeout, config.http.request_timeout);
    }
}
