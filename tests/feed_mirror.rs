//! Mirroring every channel into feed files

use std::sync::Arc;
use std::time::Duration;

use audio_mirror::config::{RssConfig, SourceConfig, SourceKind};
use audio_mirror::errors::AppError;
use audio_mirror::mirror::FeedMirror;
use audio_mirror::rss::RssFeedWriter;
use audio_mirror::sources::{SourceAggregator, SourceContext, SourceFactory};

mod common;
use common::ScriptedTransport;

const ORIGINALS: &str = r#"[
    {"id":"1","name":"Krim & Kaffe","producer":"Untold"},
    {"id":"2","name":"Historietimen"}
]"#;
const FOLLOWED: &str = r#"[
    {"podcast":{"id":"2","name":"Historietimen"}},
    {"podcast":{"id":"3","name":"Sovelyder"}}
]"#;
const EPISODES: &str = r#"[{"id":"e1","title":"Pilot","soundUrl":"https://cdn/e1.mp3","duration":1815}]"#;

fn aggregator() -> SourceAggregator {
    let transport = Arc::new(
        ScriptedTransport::new()
            .route("/api/v1/podcasts/original", 200, ORIGINALS)
            .route("/api/v1/podcasts/followed", 200, FOLLOWED)
            .route("/api/v1/podcasts/1/episodes", 200, EPISODES)
            .route("/api/v1/podcasts/2/episodes", 200, "[]"),
    );
    let config = SourceConfig {
        name: "untold".to_string(),
        kind: SourceKind::Untold,
        enabled: true,
        ..Default::default()
    };
    let context = SourceContext::new(transport, None, Duration::from_secs(60));
    SourceAggregator::new(vec![SourceFactory::create(&config, &context).unwrap()])
}

fn mirror(dir: &std::path::Path) -> FeedMirror {
    FeedMirror::new(RssFeedWriter::new(&RssConfig::default()), dir)
}

#[tokio::test]
async fn test_mirror_writes_one_file_per_channel() {
    let temp_dir = tempfile::tempdir().unwrap();
    let output = temp_dir.path().join("feeds");

    let report = mirror(&output).mirror_all(&aggregator()).await.unwrap();

    assert_eq!(report.summary.to_string(), "1 sources fetched, 0 failed");
    assert_eq!(report.written.len(), 2);
    assert!(output.join("Krim-Kaffe.xml").is_file());
    assert!(output.join("Historietimen.xml").is_file());

    let feed = std::fs::read_to_string(output.join("Krim-Kaffe.xml")).unwrap();
    assert!(feed.contains("<title>Krim &amp; Kaffe</title>"));
    assert!(feed.contains("<itunes:duration>0:30:15</itunes:duration>"));

    // No episode route for channel 3: reported, not fatal
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "Sovelyder");
    assert!(matches!(report.failed[0].1, AppError::Api(_)));
    assert!(!output.join("Sovelyder.xml").exists());
}

#[tokio::test]
async fn test_single_channel_feed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mirror = mirror(temp_dir.path());
    let aggregator = aggregator();

    let feed = mirror.render_channel(&aggregator, "untold", "1").await.unwrap();
    assert!(feed.contains("<guid isPermaLink=\"false\">e1</guid>"));

    assert!(matches!(
        mirror.render_channel(&aggregator, "missing", "1").await,
        Err(AppError::NotFound { .. })
    ));
    assert!(matches!(
        mirror.render_channel(&aggregator, "untold", "404").await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unwritable_output_directory_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let result = mirror(&blocker.join("feeds")).mirror_all(&aggregator()).await;
    assert!(matches!(result, Err(AppError::Io(_))));
}
