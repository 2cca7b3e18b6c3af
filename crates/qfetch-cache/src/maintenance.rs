//! Bulk cache maintenance across a directory tree
//!
//! A cache directory can exist at many points under a project tree (one
//! per invoking working directory). Maintenance discovers every directory
//! matching the conventional name, deletes entries (optionally filtered by
//! age) and tidies emptied directories. Destructive and irreversible; the
//! interactive confirmation gate lives in the CLI, not here.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ARTIFACT_EXT;

/// Per-directory removal counts from a [`purge`] pass.
///
/// Keys are each discovered cache directory's parent path relative to the
/// purge root (`.` for the root itself), so callers can print meaningful
/// summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    removed: BTreeMap<String, usize>,
}

impl PurgeReport {
    /// Removal counts keyed by directory label.
    pub fn removed(&self) -> &BTreeMap<String, usize> {
        &self.removed
    }

    /// Total files removed across all discovered directories.
    pub fn total(&self) -> usize {
        self.removed.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    fn record(&mut self, label: &str) {
        *self.removed.entry(label.to_string()).or_insert(0) += 1;
    }
}

/// Recursively delete cached artifacts below `root`.
///
/// Every directory named `cache_dir_name` under `root` is processed. With
/// `older_than` unset all entries are deleted; with it set, only entries
/// at least that old. Directories left empty are removed. All failures
/// are per-entry and non-fatal: they are logged and the pass continues.
pub fn purge(root: &Path, cache_dir_name: &str, older_than: Option<Duration>) -> PurgeReport {
    let mut report = PurgeReport::default();

    let cache_dirs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.depth() > 0
                && entry.file_type().is_dir()
                && entry.file_name() == OsStr::new(cache_dir_name)
        })
        .map(|entry| entry.into_path())
        .collect();

    for dir in cache_dirs {
        let label = dir_label(root, &dir);
        purge_dir(&dir, &label, older_than, &mut report);

        // Tidy up: drop the directory once nothing is left in it. Racing
        // a concurrent cache population is tolerated, hence best-effort.
        if let Ok(mut entries) = fs::read_dir(&dir) {
            if entries.next().is_none() {
                let _ = fs::remove_dir(&dir);
            }
        }
    }

    debug!(root = %root.display(), total = report.total(), "purge complete");
    report
}

fn purge_dir(dir: &Path, label: &str, older_than: Option<Duration>, report: &mut PurgeReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot enumerate cache directory");
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some(ARTIFACT_EXT) {
            continue;
        }
        if let Some(min_age) = older_than {
            match entry_age(&entry) {
                Some(age) if age >= min_age => {}
                // Young enough to keep, or age unknown: skip.
                _ => continue,
            }
        }
        match fs::remove_file(&path) {
            Ok(()) => report.record(label),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to delete cache entry"),
        }
    }
}

fn entry_age(entry: &fs::DirEntry) -> Option<Duration> {
    let modified = entry.metadata().ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

fn dir_label(root: &Path, cache_dir: &Path) -> String {
    cache_dir
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| {
            if rel.as_os_str().is_empty() {
                ".".to_string()
            } else {
                rel.display().to_string()
            }
        })
        .unwrap_or_else(|| ".".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CACHE_DIR;
    use crate::key::CacheKey;

    /// Plant a fake artifact; purge never parses file contents.
    fn plant_entry(cache_dir: &Path, query: &str) -> PathBuf {
        fs::create_dir_all(cache_dir).unwrap();
        let path = cache_dir.join(format!("{}.{ARTIFACT_EXT}", CacheKey::derive(query)));
        fs::write(&path, b"parquet bytes").unwrap();
        path
    }

    #[test]
    fn test_purge_all_across_directories() {
        let root = tempfile::tempdir().unwrap();
        let top = root.path().join(DEFAULT_CACHE_DIR);
        let nested = root.path().join("reports").join("q3").join(DEFAULT_CACHE_DIR);
        plant_entry(&top, "SELECT 1");
        plant_entry(&top, "SELECT 2");
        plant_entry(&nested, "SELECT 3");

        let report = purge(root.path(), DEFAULT_CACHE_DIR, None);

        assert_eq!(report.total(), 3);
        assert_eq!(report.removed().get("."), Some(&2));
        let nested_label = Path::new("reports").join("q3").display().to_string();
        assert_eq!(report.removed().get(&nested_label), Some(&1));

        // Emptied directories are removed.
        assert!(!top.exists());
        assert!(!nested.exists());
    }

    #[test]
    fn test_purge_age_filter() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = root.path().join(DEFAULT_CACHE_DIR);
        let old = plant_entry(&cache_dir, "SELECT old");
        std::thread::sleep(Duration::from_millis(300));
        let young = plant_entry(&cache_dir, "SELECT young");

        let report = purge(root.path(), DEFAULT_CACHE_DIR, Some(Duration::from_millis(150)));

        assert_eq!(report.total(), 1);
        assert!(!old.exists());
        assert!(young.exists());
        // A directory that still holds entries survives.
        assert!(cache_dir.exists());
    }

    #[test]
    fn test_purge_ignores_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = root.path().join(DEFAULT_CACHE_DIR);
        plant_entry(&cache_dir, "SELECT 1");
        fs::write(cache_dir.join("README.txt"), b"keep me").unwrap();

        let report = purge(root.path(), DEFAULT_CACHE_DIR, None);

        assert_eq!(report.total(), 1);
        assert!(cache_dir.join("README.txt").exists());
        // Not empty, so the directory stays.
        assert!(cache_dir.exists());
    }

    #[test]
    fn test_purge_only_matching_directory_names() {
        let root = tempfile::tempdir().unwrap();
        let cache_dir = root.path().join(DEFAULT_CACHE_DIR);
        let other_dir = root.path().join("other_cache");
        plant_entry(&cache_dir, "SELECT 1");
        let untouched = plant_entry(&other_dir, "SELECT 2");

        let report = purge(root.path(), DEFAULT_CACHE_DIR, None);

        assert_eq!(report.total(), 1);
        assert!(untouched.exists());
    }

    #[test]
    fn test_purge_missing_root_is_empty_report() {
        let root = tempfile::tempdir().unwrap();
        let report = purge(&root.path().join("nope"), DEFAULT_CACHE_DIR, None);
        assert!(report.is_empty());
        assert_eq!(report.total(), 0);
    }
}
