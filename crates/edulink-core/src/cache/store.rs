use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode cache entry '{key}': {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A stored value plus the bookkeeping needed for expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
    /// `None` means the entry never expires.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl<T> CachedData<T> {
    pub fn new(data: T, ttl: Option<Duration>) -> Self {
        Self::new_at(data, Utc::now(), ttl)
    }

    pub fn new_at(data: T, now: DateTime<Utc>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            cached_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
        }
    }

    pub fn age_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display_at(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes_at(now);
        if minutes < 1 {
            // Clock skew lands here too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Storage contract every cache backend satisfies.
///
/// Values cross this boundary as JSON so the trait stays object safe; the
/// `Cache` facade handles typed encoding.
pub trait CacheBackend: Send + Sync {
    /// Prepare the backend (create directories, check connectivity).
    fn initialise(&self) -> Result<(), CacheError>;

    /// True when the key holds an unexpired entry.
    fn exists(&self, key: &str) -> bool;

    fn load(&self, key: &str) -> Result<Option<CachedData<Value>>, CacheError>;

    fn store(&self, key: &str, entry: CachedData<Value>) -> Result<(), CacheError>;

    /// The backend's notion of "now", used to stamp and expire entries.
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Typed handle over a shared backend. Clone is cheap.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wrap a backend the caller keeps a handle to.
    pub fn from_shared<B: CacheBackend + 'static>(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn initialise(&self) -> Result<(), CacheError> {
        debug!("Initialising cache");
        self.backend.initialise()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.backend.exists(key)
    }

    /// Read and decode a value. Missing and expired keys are `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(entry) = self.backend.load(key)? else {
            return Ok(None);
        };

        let now = self.backend.now();
        if entry.is_expired_at(now) {
            debug!(key, "Cache entry expired");
            return Ok(None);
        }

        debug!(key, age = %entry.age_display_at(now), "Cache hit");
        serde_json::from_value(entry.data)
            .map(Some)
            .map_err(|source| CacheError::Serde {
                key: key.to_string(),
                source,
            })
    }

    /// Encode and store a value. `ttl` of `None` keeps it forever.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let data = serde_json::to_value(value).map_err(|source| CacheError::Serde {
            key: key.to_string(),
            source,
        })?;
        let entry = CachedData::new_at(data, self.backend.now(), ttl);
        self.backend.store(key, entry)
    }
}
