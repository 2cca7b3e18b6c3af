//! On-disk store of content-addressed result artifacts
//!
//! One Parquet file per distinct query string, named by the query's hex
//! digest. Freshness is derived entirely from the file's modification
//! time; there is no index file and no lock file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use qfetch_core::{QueryError, Result};
use tracing::debug;

use crate::config::ARTIFACT_EXT;
use crate::key::CacheKey;

/// Metadata for one cached artifact, as reported by [`CacheStore::list`].
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub key: CacheKey,
    pub size_bytes: u64,
    pub modified: SystemTime,
}

/// A directory of cached query results.
///
/// The directory (and its parents) is created on first use. The store is
/// process-local: no locking is performed against other writers.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open a store rooted at `dir`, creating the directory if missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{ARTIFACT_EXT}"))
    }

    /// Whether an artifact exists for `key`.
    pub fn exists(&self, key: &CacheKey) -> bool {
        self.entry_path(key).is_file()
    }

    /// Age of the artifact for `key`, from its modification time.
    ///
    /// Fails with `NotFound` if the artifact is absent. A modification
    /// time in the future (clock skew) reads as zero age.
    pub fn age(&self, key: &CacheKey) -> Result<Duration> {
        let path = self.entry_path(key);
        let metadata = fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QueryError::NotFound(key.to_string())
            } else {
                QueryError::IoError(e)
            }
        })?;
        let modified = metadata.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default())
    }

    /// Load the cached result for `key`.
    ///
    /// Any failure to open or decode the artifact is a `ReadError`; the
    /// caller treats it as a miss rather than propagating it.
    pub fn load(&self, key: &CacheKey) -> Result<Vec<RecordBatch>> {
        let path = self.entry_path(key);
        let read_err = |e: &dyn std::fmt::Display| {
            QueryError::ReadError(format!("{}: {e}", path.display()))
        };

        let file = File::open(&path).map_err(|e| read_err(&e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| read_err(&e))?;
        let reader = builder.build().map_err(|e| read_err(&e))?;

        let batches = reader
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| read_err(&e))?;

        debug!(key = %key, rows = qfetch_core::result::row_count(&batches), "loaded cached result");
        Ok(batches)
    }

    /// Persist a result for `key`, overwriting any previous artifact.
    ///
    /// The artifact is written to a temporary sibling and renamed into
    /// place so a concurrent reader never observes a half-written file.
    /// Refuses empty results: an empty artifact is indistinguishable from
    /// "nothing fetched yet".
    pub fn save(&self, key: &CacheKey, batches: &[RecordBatch]) -> Result<()> {
        let Some(schema) = batches.first().map(|batch| batch.schema()) else {
            return Err(QueryError::WriteError(
                "refusing to persist an empty result".to_string(),
            ));
        };

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(
            ".{key}.{ARTIFACT_EXT}.tmp.{}",
            std::process::id()
        ));

        let result = self.write_artifact(&tmp, schema, batches).and_then(|()| {
            fs::rename(&tmp, &path)
                .map_err(|e| QueryError::WriteError(format!("{}: {e}", path.display())))
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result?;

        debug!(key = %key, rows = qfetch_core::result::row_count(batches), "persisted result");
        Ok(())
    }

    fn write_artifact(
        &self,
        tmp: &Path,
        schema: SchemaRef,
        batches: &[RecordBatch],
    ) -> Result<()> {
        let write_err = |e: &dyn std::fmt::Display| {
            QueryError::WriteError(format!("{}: {e}", tmp.display()))
        };

        let file = File::create(tmp).map_err(|e| write_err(&e))?;
        let props = WriterProperties::builder().build();
        let mut writer =
            ArrowWriter::try_new(file, schema, Some(props)).map_err(|e| write_err(&e))?;
        for batch in batches {
            writer.write(batch).map_err(|e| write_err(&e))?;
        }
        writer.close().map_err(|e| write_err(&e))?;
        Ok(())
    }

    /// List all artifacts as `(key, size, mtime)` triples, unordered.
    ///
    /// Files that do not parse as cache entries (foreign files, leftover
    /// temp files) are skipped.
    pub fn list(&self) -> Result<Vec<EntryInfo>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(ARTIFACT_EXT) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(CacheKey::from_hex)
            else {
                continue;
            };
            let metadata = dir_entry.metadata()?;
            entries.push(EntryInfo {
                key,
                size_bytes: metadata.len(),
                modified: metadata.modified()?,
            });
        }
        Ok(entries)
    }

    /// Read the schema of a cached artifact without loading row data.
    /// Parquet is self-describing, so this only touches the file footer.
    pub fn schema(&self, key: &CacheKey) -> Result<SchemaRef> {
        let path = self.entry_path(key);
        let read_err = |e: &dyn std::fmt::Display| {
            QueryError::ReadError(format!("{}: {e}", path.display()))
        };

        let file = File::open(&path).map_err(|e| read_err(&e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| read_err(&e))?;
        Ok(builder.schema().clone())
    }

    /// Delete the artifact for `key`. Idempotent; absent entries are a
    /// no-op.
    pub fn delete(&self, key: &CacheKey) -> Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QueryError::IoError(e)),
        }
    }
}
