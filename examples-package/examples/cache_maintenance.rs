//! Cache Maintenance Example
//!
//! Demonstrates recursive discovery and age-filtered purging of cache
//! directories under a project tree.

use anyhow::Result;
use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use qfetch_cache::{purge, CacheKey, CacheStore, DEFAULT_CACHE_DIR};
use std::sync::Arc;
use std::time::Duration;

fn sample_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
    RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![42]))]).unwrap()
}

fn main() -> Result<()> {
    println!("=== Cache Maintenance Example ===\n");

    // A project tree with caches in two working directories.
    let root = tempfile::tempdir()?;
    let top = CacheStore::open(root.path().join(DEFAULT_CACHE_DIR))?;
    let nested = CacheStore::open(root.path().join("reports").join(DEFAULT_CACHE_DIR))?;

    top.save(&CacheKey::derive("SELECT 1"), &[sample_batch()])?;
    top.save(&CacheKey::derive("SELECT 2"), &[sample_batch()])?;
    nested.save(&CacheKey::derive("SELECT 3"), &[sample_batch()])?;
    println!("Planted 3 entries across 2 cache directories\n");

    // Age-filtered pass: everything is brand new, so nothing goes.
    let report = purge(root.path(), DEFAULT_CACHE_DIR, Some(Duration::from_secs(3600)));
    println!(
        "Purge of entries older than 1h removed {} file(s)",
        report.total()
    );

    // Unfiltered pass: removes everything and tidies the directories.
    let report = purge(root.path(), DEFAULT_CACHE_DIR, None);
    println!("Full purge removed {} file(s):", report.total());
    for (folder, count) in report.removed() {
        println!("  - {folder}: {count} file(s)");
    }
    println!(
        "Cache directories left behind: {}",
        root.path().join(DEFAULT_CACHE_DIR).exists()
            || root.path().join("reports").join(DEFAULT_CACHE_DIR).exists()
    );

    Ok(())
}
