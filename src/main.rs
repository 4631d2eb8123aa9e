use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use staleness_cache::{FileCache, StalenessCache};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_mirror::{
    config::{
        Config,
        defaults::{DEFAULT_CONFIG_FILE, DEFAULT_LOG_LEVEL},
    },
    mirror::FeedMirror,
    rss::RssFeedWriter,
    sources::{SourceAggregator, SourceContext, SourceFactory},
    utils::{HttpTransport, StandardHttpClient},
};

#[derive(Parser)]
#[command(name = "audio-mirror")]
#[command(version)]
#[command(about = "Mirrors podcast and audiobook catalogues from JSON APIs into RSS feeds")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Cache directory (overrides config file)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the merged channels of every enabled source
    Channels,
    /// List the episodes of one channel
    Episodes { source: String, id: String },
    /// Write the RSS feed of one channel to stdout
    Rss { source: String, id: String },
    /// Write a feed file for every channel of every enabled source
    Mirror {
        /// Output directory (overrides `[rss] output_directory`)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Search one source for titles
    Search { source: String, query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("audio_mirror={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting audio-mirror v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config.display());

    if let Some(cache_dir) = cli.cache_dir {
        config.cache.directory = cache_dir;
    }

    let client: Arc<dyn HttpTransport> = Arc::new(StandardHttpClient::new(
        config.http.connect_timeout,
        config.http.request_timeout,
        &config.http.user_agent,
    )?);
    let cache: Arc<dyn StalenessCache> = Arc::new(
        FileCache::builder()
            .base_directory(&config.cache.directory)
            .build()?,
    );
    let context = SourceContext::new(client, Some(cache), config.cache.ttl);
    let aggregator = SourceAggregator::new(SourceFactory::create_all(&config, &context)?);

    if aggregator.sources().is_empty() {
        warn!("No sources are enabled in {}", cli.config.display());
    }

    match cli.command {
        Command::Channels => {
            let (channels, summary) = aggregator.find_all_channels().await;
            info!("{summary}");
            for (source, error) in summary.errors() {
                warn!("Source {source}: {error}");
            }
            println!("{}", serde_json::to_string_pretty(&channels.channels)?);
        }
        Command::Episodes { source, id } => {
            let source = aggregator
                .source(&source)
                .with_context(|| format!("unknown source '{source}'"))?;
            let episodes = source.list_episodes(&id).await?;
            println!("{}", serde_json::to_string_pretty(&episodes.episodes)?);
        }
        Command::Search { source, query } => {
            let source = aggregator
                .source(&source)
                .with_context(|| format!("unknown source '{source}'"))?;
            let channels = source.search_titles(&query).await?;
            println!("{}", serde_json::to_string_pretty(&channels.channels)?);
        }
        Command::Rss { source, id } => {
            let mirror = FeedMirror::new(
                RssFeedWriter::new(&config.rss),
                &config.rss.output_directory,
            );
            let feed = mirror.render_channel(&aggregator, &source, &id).await?;
            print!("{feed}");
        }
        Command::Mirror { output } => {
            let output = output.unwrap_or_else(|| config.rss.output_directory.clone());
            let mirror = FeedMirror::new(RssFeedWriter::new(&config.rss), output);
            let report = mirror.mirror_all(&aggregator).await?;
            info!("{}", report.summary);
            for (title, error) in &report.failed {
                warn!("Channel {title}: {error}");
            }
            println!(
                "{} feeds written to {}",
                report.written.len(),
                mirror.output_directory().display()
            );
        }
    }

    Ok(())
}
