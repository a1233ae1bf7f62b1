use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::store::{CacheBackend, CacheError, CachedData};

/// In-process cache. Used for dry runs and as the test double for the
/// persistent store.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CachedData<Value>>>,
    clock_offset: Mutex<Duration>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock_offset: Mutex::new(Duration::zero()),
        }
    }

    /// Move this cache's clock forward. Entries expire as if `by` had elapsed.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.clock_offset.lock() {
            *offset += by;
        }
    }

    fn poisoned() -> CacheError {
        CacheError::Unavailable("memory cache lock poisoned".to_string())
    }
}

impl CacheBackend for MemoryCache {
    fn initialise(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        let now = self.now();
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .get(key)
                    .map(|entry| !entry.is_expired_at(now))
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn load(&self, key: &str) -> Result<Option<CachedData<Value>>, CacheError> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, entry: CachedData<Value>) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        let offset = self
            .clock_offset
            .lock()
            .map(|offset| *offset)
            .unwrap_or_else(|_| Duration::zero());
        Utc::now() + offset
    }
}
