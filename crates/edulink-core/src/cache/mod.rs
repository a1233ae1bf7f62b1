//! Key/value cache with per-entry expiry.
//!
//! The cache has two jobs:
//! - response cache for API calls that rarely change (school details, lookups)
//! - durable store for the dedup state carried between runs
//!
//! Backends implement `CacheBackend`; callers go through the typed `Cache` facade.
//! `FileCache` keeps one JSON file per key on disk, `MemoryCache` lives in process.

pub mod file;
pub mod memory;
pub mod store;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use store::{Cache, CacheBackend, CacheError, CachedData};
