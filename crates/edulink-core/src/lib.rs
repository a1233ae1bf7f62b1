//! Core library for edulink-digest.
//!
//! Pulls behaviour and achievement records for a parent's children from the
//! EduLink JSON-RPC API, suppresses everything already reported by an earlier
//! run, and assembles one report per child.
//!
//! - `api`: JSON-RPC client with cache-aside for slow-changing calls
//! - `auth`: login session and OS keychain credentials
//! - `cache`: key/value store with TTL (file and in-memory backends)
//! - `dedup`: persisted sets of already-reported event IDs
//! - `report`: per-pass aggregation, lookup tables and HTML rendering
//! - `notify`: delivery policy plus Mailgun and file notifiers
//! - `web`: companion HTTP server with a report preview

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod models;
pub mod notify;
pub mod report;
pub mod utils;
pub mod web;

pub use api::{ApiError, RpcClient};
pub use cache::{Cache, CacheError, FileCache, MemoryCache};
pub use config::{Config, Settings};
pub use dedup::{DedupTracker, EventKind, SeenIds};
pub use report::{FailurePolicy, PassOptions, PassOutcome, ReportAggregator};
