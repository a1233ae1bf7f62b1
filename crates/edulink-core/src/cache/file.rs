use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, warn};

use super::store::{CacheBackend, CacheError, CachedData};
use crate::utils::sanitize_file_name;

/// Cache backed by one JSON file per key inside a directory.
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Keys are API method names and fixed dedup keys; anything outside
    /// `[A-Za-z0-9._-]` is replaced so a key can never escape the directory.
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", sanitize_file_name(key)))
    }

    fn io_error(key: &str, source: std::io::Error) -> CacheError {
        CacheError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl CacheBackend for FileCache {
    fn initialise(&self) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|e| {
            CacheError::Unavailable(format!(
                "cannot create cache directory {}: {}",
                self.cache_dir.display(),
                e
            ))
        })
    }

    fn exists(&self, key: &str) -> bool {
        match self.load(key) {
            Ok(Some(entry)) => !entry.is_expired_at(self.now()),
            Ok(None) => false,
            Err(e) => {
                debug!(key, error = %e, "Unreadable cache entry treated as absent");
                false
            }
        }
    }

    fn load(&self, key: &str) -> Result<Option<CachedData<Value>>, CacheError> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| Self::io_error(key, e))?;
        let entry = serde_json::from_str(&contents).map_err(|source| CacheError::Serde {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(entry))
    }

    fn store(&self, key: &str, entry: CachedData<Value>) -> Result<(), CacheError> {
        let path = self.cache_path(key);
        let contents = serde_json::to_string_pretty(&entry).map_err(|source| CacheError::Serde {
            key: key.to_string(),
            source,
        })?;

        // Write then rename so a crash mid-write never leaves a torn dedup file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| Self::io_error(key, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            warn!(key, error = %e, "Failed to move cache file into place");
            let _ = std::fs::remove_file(&tmp);
            return Err(Self::io_error(key, e));
        }
        Ok(())
    }
}
