//! Filesystem-backed cache implementation.

use crate::{
    error::{CacheError, Result},
    sanitize::sanitized_path,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncReadExt};
use tracing::{debug, trace};

/// Key/value store addressed by an ordered list of key segments.
///
/// Implementations decide freshness lazily on read; nothing is ever evicted
/// by the cache itself.
#[async_trait]
pub trait StalenessCache: Send + Sync {
    /// Returns the stored bytes, or `None` when there is no entry or the
    /// entry was last written strictly before `not_older_than`.
    async fn retrieve(
        &self,
        key: &[String],
        not_older_than: DateTime<Utc>,
    ) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous content, and returns
    /// the location it was written to.
    async fn write(&self, key: &[String], value: &[u8]) -> Result<PathBuf>;
}

/// Cache storing one flat file per key under a base directory.
///
/// There is no locking: concurrent writers to the same key race and the last
/// write wins.
#[derive(Clone, Debug)]
pub struct FileCache {
    base_dir: PathBuf,
}

impl FileCache {
    /// Create a cache rooted at `base_dir`. The directory is created lazily on
    /// the first write.
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a new builder for configuring the cache.
    #[must_use]
    pub fn builder() -> FileCacheBuilder {
        FileCacheBuilder::default()
    }

    /// Base directory all entries live under.
    pub fn base_directory(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve the file path for `key` without touching the filesystem.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidKey`] for an empty key, which would
    /// otherwise address the base directory itself.
    pub fn create_file_path<S: AsRef<str>>(&self, key: &[S]) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey {
                reason: "at least one key segment is required".to_string(),
            });
        }
        Ok(sanitized_path(&self.base_dir, key))
    }
}

#[async_trait]
impl StalenessCache for FileCache {
    async fn retrieve(
        &self,
        key: &[String],
        not_older_than: DateTime<Utc>,
    ) -> Result<Option<Vec<u8>>> {
        let file_path = self.create_file_path(key)?;

        let mut file = match fs::File::open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("Cache entry {:?} does not exist", file_path);
                return Ok(None);
            }
            Err(e) => return Err(CacheError::io(&file_path, e)),
        };

        let metadata = file
            .metadata()
            .await
            .map_err(|e| CacheError::io(&file_path, e))?;
        let modified: DateTime<Utc> = metadata
            .modified()
            .map_err(|e| CacheError::io(&file_path, e))?
            .into();

        if modified < not_older_than {
            debug!(
                "Cache entry {:?} is stale (modified {}, cutoff {})",
                file_path, modified, not_older_than
            );
            return Ok(None);
        }

        let mut content = Vec::with_capacity(metadata.len() as usize);
        file.read_to_end(&mut content)
            .await
            .map_err(|e| CacheError::io(&file_path, e))?;
        Ok(Some(content))
    }

    async fn write(&self, key: &[String], value: &[u8]) -> Result<PathBuf> {
        let file_path = self.create_file_path(key)?;

        if let Some(dir) = file_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::DirectoryCreation {
                    path: dir.to_path_buf(),
                    source: e,
                })?;
        }

        fs::write(&file_path, value)
            .await
            .map_err(|e| CacheError::Write {
                path: file_path.clone(),
                source: e,
            })?;

        debug!("Wrote {} bytes to cache entry {:?}", value.len(), file_path);
        Ok(file_path)
    }
}

/// Builder for [`FileCache`].
#[derive(Debug, Default)]
pub struct FileCacheBuilder {
    base_directory: Option<PathBuf>,
}

impl FileCacheBuilder {
    /// Set the base directory for cache entries.
    #[must_use]
    pub fn base_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base_directory = Some(path.into());
        self
    }

    /// Build the `FileCache`.
    ///
    /// # Errors
    /// Returns an error if the base directory is not set or is empty.
    pub fn build(self) -> Result<FileCache> {
        let base_dir = self
            .base_directory
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| CacheError::Configuration {
                message: "Base directory is required".to_string(),
            })?;

        tracing::info!("FileCache initialized - base_dir: {:?}", base_dir);
        Ok(FileCache::new(base_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::time::{Duration as StdDuration, SystemTime};

    fn key(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_write_then_retrieve() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let cache = FileCache::new(temp_dir.path());

        let path = cache.write(&key(&["untold", "originals.json"]), b"[1,2]").await?;
        assert_eq!(path, temp_dir.path().join("untold").join("originals.json"));

        let cutoff = Utc::now() - Duration::hours(1);
        let content = cache.retrieve(&key(&["untold", "originals.json"]), cutoff).await?;
        assert_eq!(content.as_deref(), Some(&b"[1,2]"[..]));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let temp_dir = tempfile::tempdir()?;
        let cache = FileCache::new(temp_dir.path().join("not-created-yet"));

        let content = cache
            .retrieve(&key(&["source", "nothing.json"]), Utc::now() - Duration::days(1))
            .await?;
        assert!(content.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_older_than_cutoff_is_stale(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let cache = FileCache::new(temp_dir.path());
        let entry = key(&["source", "old.json"]);

        let path = cache.write(&entry, b"{}").await?;
        let two_hours_ago = SystemTime::now() - StdDuration::from_secs(2 * 60 * 60);
        std::fs::File::options()
            .write(true)
            .open(&path)?
            .set_modified(two_hours_ago)?;

        let stale = cache.retrieve(&entry, Utc::now() - Duration::hours(1)).await?;
        assert!(stale.is_none());

        let fresh = cache.retrieve(&entry, Utc::now() - Duration::hours(3)).await?;
        assert_eq!(fresh.as_deref(), Some(&b"{}"[..]));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_content(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let cache = FileCache::new(temp_dir.path());
        let entry = key(&["source", "entry"]);

        cache.write(&entry, b"first").await?;
        cache.write(&entry, b"second").await?;

        let content = cache.retrieve(&entry, Utc::now() - Duration::minutes(5)).await?;
        assert_eq!(content.as_deref(), Some(&b"second"[..]));
        Ok(())
    }

    #[tokio::test]
    async fn test_hostile_key_stays_inside_base() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let temp_dir = tempfile::tempdir()?;
        let base = temp_dir.path().join("cache");
        let cache = FileCache::new(&base);

        let path = cache.write(&key(&["../../escape", "/etc/passwd"]), b"x").await?;
        assert!(path.starts_with(&base));
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let cache = FileCache::new("base");
        let empty: [&str; 0] = [];
        assert!(matches!(
            cache.create_file_path(&empty),
            Err(CacheError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_builder_requires_base_directory() {
        assert!(FileCache::builder().build().is_err());
        let cache = FileCache::builder().base_directory("base").build();
        assert!(cache.is_ok());
    }
}
