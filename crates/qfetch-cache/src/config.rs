//! Cache configuration options

use std::path::PathBuf;
use std::time::Duration;

/// Conventional cache directory name, shared by every process that caches
/// into its own working directory. Maintenance discovers directories by
/// this name.
pub const DEFAULT_CACHE_DIR: &str = "qfetch_cache";

/// File extension of cached result artifacts.
pub const ARTIFACT_EXT: &str = "parquet";

/// Configuration for the result cache.
///
/// Constructed once at the boundary and passed to the components that need
/// it; there is no process-wide default instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding cached result artifacts.
    pub cache_dir: PathBuf,
    /// Freshness window used when the caller does not pass one.
    pub default_max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            default_max_age: Duration::from_secs(60 * 60), // 1 hour
        }
    }
}

impl CacheConfig {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Set the default freshness window.
    pub fn with_default_max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age = max_age;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(config.default_max_age, Duration::from_secs(3600));
    }

    #[test]
    fn test_builder_pattern() {
        let config = CacheConfig::default()
            .with_cache_dir("/tmp/results")
            .with_default_max_age(Duration::from_secs(60));

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/results"));
        assert_eq!(config.default_max_age, Duration::from_secs(60));
    }
}
