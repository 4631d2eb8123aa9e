//! Endpoint runs against a scripted transport and an on-disk cache

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use staleness_cache::{FileCache, StalenessCache};
use tempfile::TempDir;

use audio_mirror::errors::ApiError;
use audio_mirror::genapi::{EndpointConfig, GenApi, PayloadOrigin, RequestParams, Schema};
use audio_mirror::models::Channel;

mod common;
use common::ScriptedTransport;

const LIST_PATH: &str = "/api/v1/list";
const LIST_BODY: &str = r#"[{"name":"Krim","id":"1"},{"name":"Kaffe","id":"2"}]"#;

struct Fixture {
    _dir: TempDir,
    cache: Arc<FileCache>,
    transport: Arc<ScriptedTransport>,
    api: GenApi,
}

fn fixture(transport: ScriptedTransport) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(FileCache::new(dir.path()));
    let transport = Arc::new(transport);
    let api = GenApi::builder()
        .name("untold")
        .base_url("https://api.example.com")
        .cache_ttl(Duration::from_secs(60 * 60))
        .client(transport.clone())
        .cache(cache.clone())
        .build()
        .unwrap();
    Fixture {
        _dir: dir,
        cache,
        transport,
        api,
    }
}

fn list_config() -> EndpointConfig {
    EndpointConfig::new(LIST_PATH).with_mapping([("title", "name"), ("_meta.id", "id")])
}

fn entry(file: &str) -> Vec<String> {
    vec!["untold".to_string(), file.to_string()]
}

#[tokio::test]
async fn test_miss_fetches_and_writes_cache() {
    let f = fixture(ScriptedTransport::new().route(LIST_PATH, 200, LIST_BODY));
    let endpoint = f.api.compile(&list_config(), Schema::Channel).unwrap();

    let run = f
        .api
        .run_endpoint::<Channel>(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap();

    assert_eq!(run.origin, PayloadOrigin::Network);
    assert_eq!(run.records.len(), 2);
    assert_eq!(f.transport.request_count(), 1);

    let cached = f
        .cache
        .retrieve(&entry("originals.json"), Utc::now() - chrono::Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(cached.as_deref(), Some(LIST_BODY.as_bytes()));
}

#[tokio::test]
async fn test_fresh_cache_skips_network() {
    let f = fixture(ScriptedTransport::new());
    f.cache
        .write(&entry("originals.json"), LIST_BODY.as_bytes())
        .await
        .unwrap();
    let endpoint = f.api.compile(&list_config(), Schema::Channel).unwrap();

    let list = f
        .api
        .run_channels(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list.channels[0].title, "Krim");
    assert_eq!(list.raw, LIST_BODY.as_bytes());
    assert_eq!(f.transport.request_count(), 0);
}

#[tokio::test]
async fn test_stale_cache_is_refetched() {
    let f = fixture(ScriptedTransport::new().route(LIST_PATH, 200, LIST_BODY));
    let path = f
        .cache
        .write(&entry("originals.json"), br#"[{"name":"Old"}]"#)
        .await
        .unwrap();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(2 * 60 * 60))
        .unwrap();
    let endpoint = f.api.compile(&list_config(), Schema::Channel).unwrap();

    let list = f
        .api
        .run_channels(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap();

    assert_eq!(list.channels[0].title, "Krim");
    assert_eq!(f.transport.request_count(), 1);
}

#[tokio::test]
async fn test_error_status_is_not_cached() {
    let f = fixture(ScriptedTransport::new().route(LIST_PATH, 503, "unavailable"));
    let endpoint = f.api.compile(&list_config(), Schema::Channel).unwrap();

    let err = f
        .api
        .run_channels(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert!(err.to_string().starts_with("unsuccessful status-code: 503"));
    let cached = f
        .cache
        .retrieve(&entry("originals.json"), chrono::DateTime::<Utc>::MIN_UTC)
        .await
        .unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_cache_write_failure_keeps_payload() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let transport = Arc::new(ScriptedTransport::new().route(LIST_PATH, 200, LIST_BODY));
    let api = GenApi::builder()
        .name("untold")
        .base_url("https://api.example.com")
        .client(transport.clone())
        .cache(Arc::new(FileCache::new(&blocker)))
        .build()
        .unwrap();
    let endpoint = api.compile(&list_config(), Schema::Channel).unwrap();

    let run = api
        .run_endpoint::<Channel>(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap();

    assert_eq!(run.records.len(), 2);
    assert!(run.cache_error.is_some());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_undecodable_cache_is_refetched() {
    let f = fixture(ScriptedTransport::new().route(LIST_PATH, 200, LIST_BODY));
    f.cache
        .write(&entry("originals.json"), br#"{"not":"an array"}"#)
        .await
        .unwrap();
    let endpoint = f.api.compile(&list_config(), Schema::Channel).unwrap();

    let run = f
        .api
        .run_endpoint::<Channel>(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap();

    assert_eq!(run.origin, PayloadOrigin::Network);
    assert_eq!(run.records.len(), 2);
    assert_eq!(f.transport.request_count(), 1);
}

#[tokio::test]
async fn test_parameters_template_url_and_cache_key() {
    let f = fixture(ScriptedTransport::new().route("/api/v1/podcasts/42/episodes", 200, "[]"));
    let endpoint = f
        .api
        .compile(
            &EndpointConfig::new("/api/v1/podcasts/{{ podID }}/episodes")
                .with_query("limit=50&from={{ api.name }}"),
            Schema::Episode,
        )
        .unwrap();
    let params = RequestParams::new().with("podID", "42");

    let payload = f.api.fetch(&endpoint, &params, "episodes-").await.unwrap();

    let requests = f.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url.as_str(),
        "https://api.example.com/api/v1/podcasts/42/episodes?limit=50&from=untold"
    );
    let cache_path = payload.cache_path.unwrap();
    assert_eq!(
        cache_path.file_name().and_then(|n| n.to_str()),
        Some("episodes-podID-42.json")
    );
}

#[tokio::test]
async fn test_transport_failure_surfaces() {
    let f = fixture(ScriptedTransport::new());
    let endpoint = f.api.compile(&list_config(), Schema::Channel).unwrap();

    let err = f
        .api
        .run_channels(&endpoint, &RequestParams::new(), "originals")
        .await
        .unwrap_err();
    assert!(err.is_transport());
}
