//! Result Caching Example
//!
//! Demonstrates get-or-fetch caching with freshness windows, forced
//! refresh and statistics, against an in-process connector.

use anyhow::Result;
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use qfetch_cache::{CacheConfig, CacheManager};
use qfetch_core::{Connector, ConnectorError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Stand-in for the remote engine: returns a fixed result and counts how
/// often it is asked.
struct DemoEngine {
    calls: AtomicUsize,
}

#[async_trait]
impl Connector for DemoEngine {
    async fn execute(&self, _query: &str) -> Result<Vec<RecordBatch>, ConnectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec!["Alice", "Bob", "Charlie"])),
            ],
        )
        .map_err(|e| ConnectorError::Execution(e.to_string()))?;

        Ok(vec![batch])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Result Caching Example ===\n");

    let cache_root = tempfile::tempdir()?;
    let engine = Arc::new(DemoEngine {
        calls: AtomicUsize::new(0),
    });

    let config = CacheConfig::new(cache_root.path().join("qfetch_cache"));
    let manager = CacheManager::new(config, Arc::clone(&engine) as Arc<dyn Connector>)?;

    let sql = "SELECT id, name FROM users WHERE active = true";
    let day = Duration::from_secs(24 * 3600);

    // First call: cache is empty, so the engine is consulted.
    let first = manager.get_data(sql, day, false).await?;
    println!(
        "First call:  {} rows, {} engine call(s)",
        qfetch_core::result::row_count(&first),
        engine.calls.load(Ordering::SeqCst)
    );

    // Second call within the window: served from disk.
    let second = manager.get_data(sql, day, false).await?;
    println!(
        "Second call: {} rows, {} engine call(s)",
        qfetch_core::result::row_count(&second),
        engine.calls.load(Ordering::SeqCst)
    );

    // A zero freshness window always goes live.
    manager.get_data(sql, Duration::ZERO, false).await?;
    println!(
        "Zero max-age: {} engine call(s)",
        engine.calls.load(Ordering::SeqCst)
    );

    // Forced refresh bypasses even a fresh entry.
    manager.get_data(sql, day, true).await?;
    println!(
        "Forced:      {} engine call(s)\n",
        engine.calls.load(Ordering::SeqCst)
    );

    let stats = manager.stats();
    println!("Cache statistics:");
    println!("  Hits:      {}", stats.hits());
    println!("  Misses:    {}", stats.misses());
    println!("  Stale:     {}", stats.stale());
    println!("  Refreshes: {}", stats.refreshes());
    println!("  Hit rate:  {:.1}%", stats.hit_rate() * 100.0);

    Ok(())
}
