//! Untold catalogue preset
//!
//! Untold has no endpoint that lists every title, so the channel list is
//! assembled from the "original" and "followed" listings. Followed entries
//! wrap the podcast in a `podcast` object, hence the prefixed mapping.

use std::collections::BTreeMap;

use crate::config::{ChannelEndpointConfig, SourceConfig};
use crate::genapi::EndpointConfig;

pub const UNTOLD_BASE_URL: &str = "https://api.fole.app.iterate.no";

const APP_HEADERS: &[(&str, &str)] = &[
    ("accept", "*/*"),
    ("x-app-os", "ios"),
    ("user-agent", "Untold/2 CFNetwork/1496.0.7 Darwin/23.5.0"),
    ("accept-language", "nb-NO,nb;q=0.9"),
    ("x-app-version", "1.8.2"),
];

/// Mapping for a podcast object at the top of each element
pub fn channel_mapping() -> BTreeMap<String, String> {
    [
        ("title", "name"),
        ("description", "description"),
        ("image.url", "cover.lg"),
        ("author", "producer"),
        ("_meta.frequency", "frequency"),
        ("_meta.lastAired", "lastEpisodeDate"),
        ("_meta.id", "id"),
        ("locked", r#"@literal:"yes""#),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `mapping` with every path moved below `prefix`; escapes are kept as-is
pub fn prefixed_mapping(mapping: &BTreeMap<String, String>, prefix: &str) -> BTreeMap<String, String> {
    mapping
        .iter()
        .map(|(field, expression)| {
            let expression = if expression.starts_with('@') {
                expression.clone()
            } else {
                format!("{prefix}{expression}")
            };
            (field.clone(), expression)
        })
        .collect()
}

pub fn channel_endpoints() -> Vec<ChannelEndpointConfig> {
    let mapping = channel_mapping();
    vec![
        ChannelEndpointConfig {
            name: "originals".to_string(),
            cache_key: None,
            endpoint: EndpointConfig::new("/api/v1/podcasts/original").with_mapping(mapping.clone()),
        },
        ChannelEndpointConfig {
            name: "followed".to_string(),
            cache_key: None,
            endpoint: EndpointConfig::new("/api/v1/podcasts/followed")
                .with_mapping(prefixed_mapping(&mapping, "podcast.")),
        },
    ]
}

pub fn episodes_endpoint() -> EndpointConfig {
    EndpointConfig::new("/api/v1/podcasts/{{ podID }}/episodes").with_mapping([
        ("id", "id"),
        ("title", "title"),
        ("description", "description"),
        ("audioUrl", "soundUrl"),
        ("imageUrl", "cover.lg"),
        ("durationSeconds", "duration"),
        ("publishedAt", "published"),
    ])
}

pub fn search_endpoint() -> EndpointConfig {
    EndpointConfig::new("/api/v1/podcasts/search")
        .with_query("term={{ query }}")
        .with_mapping(channel_mapping())
}

/// Fill in everything a `kind = "untold"` source leaves out.
///
/// Configured headers win over the app headers, configured channel endpoints
/// replace preset ones of the same name and are otherwise appended.
pub fn apply_preset(config: &SourceConfig) -> SourceConfig {
    let mut resolved = config.clone();

    if resolved.base_url.is_none() {
        resolved.base_url = Some(UNTOLD_BASE_URL.to_string());
    }

    let mut headers: BTreeMap<String, String> = APP_HEADERS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    headers.extend(config.headers.clone());
    resolved.headers = headers;

    let mut endpoints = channel_endpoints();
    for endpoint in &config.channel_endpoints {
        match endpoints.iter_mut().find(|e| e.name == endpoint.name) {
            Some(existing) => *existing = endpoint.clone(),
            None => endpoints.push(endpoint.clone()),
        }
    }
    resolved.channel_endpoints = endpoints;

    if resolved.episodes_endpoint.is_none() {
        resolved.episodes_endpoint = Some(episodes_endpoint());
    }
    if resolved.search_endpoint.is_none() {
        resolved.search_endpoint = Some(search_endpoint());
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;

    #[test]
    fn test_followed_mapping_is_prefixed() {
        let followed = prefixed_mapping(&channel_mapping(), "podcast.");
        assert_eq!(followed["title"], "podcast.name");
        assert_eq!(followed["image.url"], "podcast.cover.lg");
        assert_eq!(followed["_meta.id"], "podcast.id");
        assert_eq!(followed["locked"], r#"@literal:"yes""#);
    }

    #[test]
    fn test_apply_preset_fills_defaults() {
        let config = SourceConfig {
            name: "untold".to_string(),
            kind: SourceKind::Untold,
            enabled: true,
            ..Default::default()
        };
        let resolved = apply_preset(&config);

        assert_eq!(resolved.base_url.as_deref(), Some(UNTOLD_BASE_URL));
        assert_eq!(resolved.headers["x-app-os"], "ios");
        let names: Vec<&str> = resolved
            .channel_endpoints
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["originals", "followed"]);
        assert_eq!(
            resolved.episodes_endpoint.unwrap().path,
            "/api/v1/podcasts/{{ podID }}/episodes"
        );
        assert_eq!(resolved.search_endpoint.unwrap().query, "term={{ query }}");
    }

    #[test]
    fn test_apply_preset_keeps_overrides() {
        let config = SourceConfig {
            name: "untold".to_string(),
            kind: SourceKind::Untold,
            headers: [("x-app-version".to_string(), "2.0.0".to_string())].into(),
            channel_endpoints: vec![
                ChannelEndpointConfig {
                    name: "followed".to_string(),
                    cache_key: Some("mine".to_string()),
                    endpoint: EndpointConfig::new("/api/v2/followed"),
                },
                ChannelEndpointConfig {
                    name: "recommended".to_string(),
                    cache_key: None,
                    endpoint: EndpointConfig::new("/api/v1/podcasts/recommended")
                        .with_mapping(channel_mapping()),
                },
            ],
            ..Default::default()
        };
        let resolved = apply_preset(&config);

        assert_eq!(resolved.headers["x-app-version"], "2.0.0");
        assert_eq!(resolved.channel_endpoints.len(), 3);
        assert_eq!(resolved.channel_endpoints[1].endpoint.path, "/api/v2/followed");
        assert_eq!(resolved.channel_endpoints[1].cache_key(), "mine");
        assert_eq!(resolved.channel_endpoints[2].name, "recommended");
    }
}
