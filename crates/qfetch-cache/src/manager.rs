//! Get-or-fetch orchestration over the cache store and the remote engine
//!
//! Per request: derive the key, serve a fresh readable entry from disk,
//! otherwise fetch live, repopulate the store and return. The manager
//! never retries; retry policy belongs to the connector.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arrow::record_batch::RecordBatch;
use qfetch_core::{result, Connector, Result};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::key::CacheKey;
use crate::stats::CacheStats;
use crate::store::CacheStore;

/// Cache manager for remote query results.
///
/// Not single-flight: two callers asking for the same stale key will both
/// fetch and both overwrite (last write wins). Callers that need
/// at-most-one-fetch semantics must add their own per-key exclusion.
pub struct CacheManager {
    store: CacheStore,
    connector: Arc<dyn Connector>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl CacheManager {
    /// Create a manager over `config.cache_dir`, creating the directory if
    /// missing.
    pub fn new(config: CacheConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let store = CacheStore::open(&config.cache_dir)?;
        Ok(Self {
            store,
            connector,
            config,
            stats: Arc::new(CacheStats::new()),
        })
    }

    /// Get results for `query`, using the configured default freshness
    /// window.
    pub async fn get(&self, query: &str) -> Result<Vec<RecordBatch>> {
        self.get_data(query, self.config.default_max_age, false).await
    }

    /// Get results for `query`, serving from cache when a readable entry
    /// younger than `max_age` exists and `force_refresh` is not set.
    ///
    /// An unreadable entry is logged and treated as a miss; the entry is
    /// left in place for maintenance. A failure to persist the fetched
    /// result is logged and does not affect the returned data. Empty
    /// results are returned but never persisted. Remote failures surface
    /// as [`qfetch_core::QueryError::Fetch`].
    pub async fn get_data(
        &self,
        query: &str,
        max_age: Duration,
        force_refresh: bool,
    ) -> Result<Vec<RecordBatch>> {
        let key = CacheKey::derive(query);

        if force_refresh {
            self.stats.record_refresh();
        } else {
            match self.store.age(&key) {
                Ok(age) if age < max_age => {
                    let start = Instant::now();
                    match self.store.load(&key) {
                        Ok(batches) => {
                            self.stats.record_hit();
                            info!(
                                key = %key,
                                rows = result::row_count(&batches),
                                elapsed_ms = start.elapsed().as_millis() as u64,
                                "served from cache"
                            );
                            return Ok(batches);
                        }
                        Err(e) => {
                            // Corrupt or half-written artifact: fall back
                            // to a live fetch, leave the file for
                            // maintenance to collect.
                            warn!(key = %key, error = %e, "unreadable cache entry, fetching live");
                        }
                    }
                }
                Ok(_) => {
                    self.stats.record_stale();
                    debug!(key = %key, "cache entry is stale");
                }
                Err(_) => {
                    debug!(key = %key, "cache miss");
                }
            }
        }

        self.stats.record_miss();
        let start = Instant::now();
        let batches = self.connector.execute(query).await?;
        info!(
            key = %key,
            rows = result::row_count(&batches),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fetched from engine"
        );

        if result::is_empty(&batches) {
            // An empty result is indistinguishable from a connector that
            // degraded to empty on failure; returning it is fine, caching
            // it is not.
            debug!(key = %key, "empty result, not cached");
        } else if let Err(e) = self.store.save(&key, &batches) {
            warn!(key = %key, error = %e, "failed to persist result");
        }

        Ok(batches)
    }

    /// The store this manager reads and writes.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Hit/miss counters for this manager.
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use async_trait::async_trait;
    use qfetch_core::ConnectorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_batch(values: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    /// Connector returning a canned result and counting invocations.
    struct StubConnector {
        batches: Vec<RecordBatch>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubConnector {
        fn returning(batches: Vec<RecordBatch>) -> Arc<Self> {
            Arc::new(Self {
                batches,
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                batches: vec![],
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for StubConnector {
        async fn execute(
            &self,
            _query: &str,
        ) -> std::result::Result<Vec<RecordBatch>, ConnectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ConnectorError::Execution("engine unavailable".to_string()))
            } else {
                Ok(self.batches.clone())
            }
        }
    }

    fn manager_in(
        dir: &tempfile::TempDir,
        connector: Arc<StubConnector>,
    ) -> CacheManager {
        let config = CacheConfig::new(dir.path().join("qfetch_cache"));
        CacheManager::new(config, connector).unwrap()
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![create_test_batch(vec![1, 2, 3])]);
        let manager = manager_in(&dir, Arc::clone(&connector));

        // Empty cache: fetches and stores.
        let first = manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        assert_eq!(result::row_count(&first), 3);
        assert_eq!(connector.calls(), 1);
        assert!(manager.store().exists(&CacheKey::derive("SELECT 1")));

        // Second call within the window: no connector invocation.
        let second = manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(connector.calls(), 1);

        assert_eq!(manager.stats().hits(), 1);
        assert_eq!(manager.stats().misses(), 1);
    }

    #[tokio::test]
    async fn test_zero_max_age_forces_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![create_test_batch(vec![1])]);
        let manager = manager_in(&dir, Arc::clone(&connector));

        manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        manager
            .get_data("SELECT 1", Duration::ZERO, false)
            .await
            .unwrap();

        assert_eq!(connector.calls(), 2);
        assert_eq!(manager.stats().stale(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![create_test_batch(vec![1])]);
        let manager = manager_in(&dir, Arc::clone(&connector));

        manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        manager.get_data("SELECT 1", HOUR, true).await.unwrap();

        assert_eq!(connector.calls(), 2);
        assert_eq!(manager.stats().refreshes(), 1);
    }

    #[tokio::test]
    async fn test_distinct_queries_are_distinct_entries() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![create_test_batch(vec![1])]);
        let manager = manager_in(&dir, Arc::clone(&connector));

        manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        // Differs only by whitespace: still a distinct entry.
        manager.get_data("SELECT  1", HOUR, false).await.unwrap();

        assert_eq!(connector.calls(), 2);
        assert_eq!(manager.store().list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_returned_but_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![]);
        let manager = manager_in(&dir, Arc::clone(&connector));

        let batches = manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        assert!(result::is_empty(&batches));
        assert!(!manager.store().exists(&CacheKey::derive("SELECT 1")));

        // With nothing cached, the next call fetches again.
        manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_falls_back_to_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![create_test_batch(vec![7])]);
        let manager = manager_in(&dir, Arc::clone(&connector));

        let key = CacheKey::derive("SELECT 1");
        std::fs::write(manager.store().entry_path(&key), b"garbage").unwrap();

        let batches = manager.get_data("SELECT 1", HOUR, false).await.unwrap();
        assert_eq!(result::row_count(&batches), 1);
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test]
    async fn test_connector_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::failing();
        let manager = manager_in(&dir, Arc::clone(&connector));

        let err = manager.get_data("SELECT 1", HOUR, false).await.unwrap_err();
        assert!(matches!(err, qfetch_core::QueryError::Fetch(_)));
        // A failed fetch never leaves an artifact behind.
        assert!(!manager.store().exists(&CacheKey::derive("SELECT 1")));
    }

    #[tokio::test]
    async fn test_get_uses_default_max_age() {
        let dir = tempfile::tempdir().unwrap();
        let connector = StubConnector::returning(vec![create_test_batch(vec![1])]);
        let config = CacheConfig::new(dir.path().join("qfetch_cache"))
            .with_default_max_age(Duration::ZERO);
        let manager = CacheManager::new(config, connector.clone() as Arc<dyn Connector>).unwrap();

        manager.get("SELECT 1").await.unwrap();
        manager.get("SELECT 1").await.unwrap();

        // Zero default window: every get goes live.
        assert_eq!(connector.calls(), 2);
    }
}
