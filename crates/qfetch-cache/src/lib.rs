//! On-disk result cache for a remote analytical query engine
//!
//! This crate is the caching side of qfetch: query results are persisted
//! as content-addressed Parquet artifacts so repeated queries skip the
//! round-trip to the remote engine.
//!
//! # Features
//!
//! - **Content addressing**: entries are keyed by a digest of the exact
//!   query text (no normalization)
//! - **Age-based freshness**: validity is evaluated at read time against
//!   the artifact's modification time; nothing expires in the background
//! - **Corruption fallback**: unreadable entries degrade to a live fetch
//! - **Maintenance**: recursive, age-filtered purging across every cache
//!   directory under a root
//! - **Statistics**: hit/miss/stale/refresh counters
//!
//! # Example
//!
//! ```ignore
//! use qfetch_cache::{CacheConfig, CacheManager};
//! use std::time::Duration;
//!
//! let manager = CacheManager::new(CacheConfig::default(), connector)?;
//!
//! // Served from disk when a fresh entry exists, fetched live otherwise.
//! let batches = manager
//!     .get_data("SELECT * FROM trades", Duration::from_secs(24 * 3600), false)
//!     .await?;
//! ```

pub mod config;
pub mod key;
pub mod maintenance;
pub mod manager;
pub mod stats;
pub mod store;

pub use config::{CacheConfig, ARTIFACT_EXT, DEFAULT_CACHE_DIR};
pub use key::CacheKey;
pub use maintenance::{purge, PurgeReport};
pub use manager::CacheManager;
pub use stats::CacheStats;
pub use store::{CacheStore, EntryInfo};
