//! # Staleness Cache
//!
//! A small filesystem key/value cache. Entries are addressed by an ordered
//! list of key segments (for example `["untold", "originals.json"]`) which
//! are sanitized into a nested path below a base directory.
//!
//! Freshness is decided on read: an entry is served only if the file's
//! modification time is at or after the cutoff the caller passes in. There
//! is no expiry metadata, no eviction and no locking; stale files simply stay
//! on disk until something external removes them.
//!
//! ## Usage
//!
//! ```rust
//! use staleness_cache::{FileCache, StalenessCache};
//! use chrono::{Duration, Utc};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = FileCache::builder().base_directory("/var/cache/audio-mirror").build()?;
//! let key = vec!["untold".to_string(), "originals.json".to_string()];
//!
//! cache.write(&key, br#"[{"id":"1"}]"#).await?;
//!
//! // Only accept entries written within the last day
//! if let Some(bytes) = cache.retrieve(&key, Utc::now() - Duration::days(1)).await? {
//!     println!("cached: {} bytes", bytes.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key sanitization
//!
//! Given base `base`:
//!
//! | key                                        | path                         |
//! |--------------------------------------------|------------------------------|
//! | `["foo", "../bar", "myfile.ext"]`          | `base/foo/-bar/myfile.ext`   |
//! | `["/foo", "../bar", "myfile.ext"]`         | `base/-foo/-bar/myfile.ext`  |
//! | `["/../foo", "../../////bar../", "myfile.ext"]` | `base/-foo/-bar-/myfile.ext` |

pub mod cache;
pub mod error;
pub mod sanitize;

pub use cache::{FileCache, FileCacheBuilder, StalenessCache};
pub use error::{CacheError, Result};
pub use sanitize::{sanitize_segment, sanitized_path};
