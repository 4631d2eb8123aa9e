/// Configuration default values
///
/// All defaults live here so they can be changed in one place.
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Cache defaults
pub const DEFAULT_CACHE_DIRECTORY: &str = "./data/cache";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1440 * 60 * 60); // 60 days

// HTTP defaults
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_AGENT: &str = concat!("audio-mirror/", env!("CARGO_PKG_VERSION"));

// RSS defaults
pub const DEFAULT_RSS_LANGUAGE: &str = "en";
pub const DEFAULT_RSS_OWNER_NAME: &str = "audio-mirror";
pub const DEFAULT_FEEDS_DIRECTORY: &str = "./feeds";
