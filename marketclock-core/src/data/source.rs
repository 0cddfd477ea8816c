//! Versioned snapshots of reference data.
//!
//! A [`DataSource`] reports a version identifier for its current content
//! and hands out loaded snapshots. Callers compare versions to decide when
//! to reload; the engine never caches across snapshots.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{MarketClockError, Result};
use crate::store::{AccessLevel, CsvStore, ReferenceStore};

/// A loaded snapshot and the version it was loaded at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub store: CsvStore,
}

impl Snapshot {
    pub fn access_level(&self) -> AccessLevel {
        self.store.access_level()
    }
}

pub trait DataSource {
    /// Identifier of the current content, `None` when it cannot be told.
    fn version(&self) -> Result<Option<String>>;

    /// Compare the current version against a previously stored one.
    ///
    /// Returns whether the content changed and the current version. Unknown
    /// versions on either side count as a change.
    fn check_for_changes(&self, stored: Option<&str>) -> Result<(bool, Option<String>)> {
        let current = self.version()?;
        let changed = match (stored, current.as_deref()) {
            (Some(stored), Some(current)) => stored != current,
            _ => true,
        };
        Ok((changed, current))
    }

    fn snapshot(&self) -> Result<Snapshot>;
}

/// Snapshot directory on the local filesystem.
///
/// The version is a BLAKE3 hash over every file name and its contents,
/// visited in sorted order, so it changes exactly when the data does.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn data_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_files(&self.dir, &mut files)?;
        files.sort();
        Ok(files)
    }
}

impl DataSource for DirectorySource {
    fn version(&self) -> Result<Option<String>> {
        if !self.dir.is_dir() {
            return Ok(None);
        }
        let mut hasher = blake3::Hasher::new();
        for path in self.data_files()? {
            let relative = path.strip_prefix(&self.dir).unwrap_or(&path);
            hasher.update(relative.to_string_lossy().as_bytes());
            hasher.update(&[0u8]);
            let content = fs::read(&path).map_err(|source| MarketClockError::Io {
                path: path.clone(),
                source,
            })?;
            hasher.update(&(content.len() as u64).to_le_bytes());
            hasher.update(&content);
        }
        let version = hasher.finalize().to_hex().to_string();
        debug!(dir = %self.dir.display(), %version, "computed snapshot version");
        Ok(Some(version))
    }

    fn snapshot(&self) -> Result<Snapshot> {
        let version = self.version()?;
        let store = CsvStore::open(&self.dir)?;
        info!(
            dir = %self.dir.display(),
            version = version.as_deref().unwrap_or("unknown"),
            "snapshot ready"
        );
        Ok(Snapshot {
            version,
            loaded_at: Utc::now(),
            store,
        })
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|source| MarketClockError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| MarketClockError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if is_data_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_data_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("csv") | Some("json")
    )
}
