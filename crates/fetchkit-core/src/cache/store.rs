//! Persistent, bounded response cache
//!
//! One directory of bincode-encoded entry files, one mutex. Every public
//! operation and the post-store eviction pass serialize through the same
//! lock, which gives linearizable cache semantics at the cost of
//! serializing unrelated URLs' cache traffic.
//!
//! Robustness contract: `find`/`find_all` never raise. A missing,
//! unreadable, or corrupt entry degrades to a cache miss, so a damaged
//! cache can never break the un-cached request path. `store`/`remove`/
//! `remove_all` do raise [`Error::CacheStorage`] on I/O failure.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::cache::entry::CacheEntry;
use crate::cache::key::{entry_file_name, ENTRY_EXTENSION};
use crate::error::Error;
use crate::Result;

/// Configuration for a [`CacheStore`]
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory that holds the entry files; created lazily on first store
    pub directory: PathBuf,
    /// Maximum total size of all entry files in bytes; 0 disables the
    /// size bound (and with it the post-store eviction pass)
    pub max_size_bytes: u64,
    /// Age beyond which an entry is considered expired
    pub ttl: Duration,
    /// Request headers projected into an entry's vary keys
    pub vary_headers: Vec<String>,
}

impl CacheConfig {
    /// Create a config with sensible defaults for the given directory
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            max_size_bytes: 10 * 1024 * 1024, // 10 MiB
            ttl: Duration::from_secs(60 * 60),
            vary_headers: Vec::new(),
        }
    }

    /// Set the maximum total cache size
    pub fn with_max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Set the entry time-to-live
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the request headers that distinguish otherwise-identical entries
    pub fn with_vary_headers(mut self, vary_headers: Vec<String>) -> Self {
        self.vary_headers = vary_headers;
        self
    }
}

/// File-based response cache with TTL expiry and size eviction
///
/// The store exclusively owns its directory: all mutation goes through the
/// public operations here, each of which holds the store-wide lock for its
/// full duration.
pub struct CacheStore {
    config: CacheConfig,
    lock: Mutex<()>,
}

impl CacheStore {
    /// Create a store over the configured directory
    ///
    /// No I/O happens here; the directory is created on first [`store`](Self::store).
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Persist an entry under its canonical URL, then run the eviction pass
    pub async fn store(&self, url: &str, entry: &CacheEntry) -> Result<()> {
        let _guard = self.lock.lock().await;

        fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| Error::CacheStorage {
                message: format!(
                    "failed to create cache directory {}",
                    self.config.directory.display()
                ),
                source: Some(anyhow::Error::new(e)),
            })?;

        let bytes = entry.encode().map_err(|e| Error::CacheStorage {
            message: format!("failed to serialize cache entry for {}", url),
            source: Some(anyhow::Error::new(e)),
        })?;

        let path = self.entry_path(url);
        write_atomic(&path, &bytes).await?;
        tracing::debug!(url, size = bytes.len(), "stored cache entry");

        if self.config.max_size_bytes > 0 {
            self.evict().await;
        }
        Ok(())
    }

    /// Look up the entry for `{url, vary_keys}`
    ///
    /// Expired entries are deleted on the way out (lazy expiry). Never
    /// raises: any read or decode failure is a miss.
    pub async fn find(&self, url: &str, vary_keys: &HashMap<String, String>) -> Option<CacheEntry> {
        let _guard = self.lock.lock().await;
        self.read_entry(url)
            .await
            .filter(|entry| entry.matches(url, vary_keys))
    }

    /// All live entries stored under `url`, regardless of vary keys
    ///
    /// Never raises; failures degrade to an empty result.
    pub async fn find_all(&self, url: &str) -> Vec<CacheEntry> {
        let _guard = self.lock.lock().await;
        self.read_entry(url).await.into_iter().collect()
    }

    /// Delete the entry for `url`, if any
    ///
    /// Removing an absent entry is not an error; any other deletion
    /// failure raises [`Error::CacheStorage`].
    pub async fn remove(&self, url: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        remove_entry_file(&self.entry_path(url)).await
    }

    /// Delete every entry in the store
    pub async fn remove_all(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut dir = match fs::read_dir(&self.config.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(Error::CacheStorage {
                    message: format!(
                        "failed to list cache directory {}",
                        self.config.directory.display()
                    ),
                    source: Some(anyhow::Error::new(e)),
                })
            }
        };
        loop {
            let dirent = dir.next_entry().await.map_err(|e| Error::CacheStorage {
                message: "failed to walk cache directory".to_string(),
                source: Some(anyhow::Error::new(e)),
            })?;
            let Some(dirent) = dirent else { break };
            let path = dirent.path();
            if is_entry_file(&path) {
                remove_entry_file(&path).await?;
            }
        }
        Ok(())
    }

    /// Read and validate the entry file for `url`, enforcing lazy expiry.
    /// Caller must hold the store lock.
    async fn read_entry(&self, url: &str) -> Option<CacheEntry> {
        let path = self.entry_path(url);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(url, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry = match CacheEntry::decode(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(url, error = %e, "corrupt cache entry, discarding");
                let _ = fs::remove_file(&path).await;
                return None;
            }
        };

        if self.is_expired(&entry) {
            tracing::debug!(url, "cache entry expired, removing");
            let _ = fs::remove_file(&path).await;
            return None;
        }
        Some(entry)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let ttl = chrono::Duration::from_std(self.config.ttl).unwrap_or(chrono::Duration::MAX);
        Utc::now().signed_duration_since(entry.stored_at) > ttl
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.config.directory.join(entry_file_name(url))
    }

    /// Enforce the size and TTL bounds over the whole directory.
    ///
    /// Entry files are ranked by last-modified time, most recent first. The
    /// running total is accumulated in that order; the first file that
    /// would push the total past `max_size_bytes` is deleted along with
    /// every file ranked after it. A second pass removes retained files
    /// whose age exceeds the TTL. Caller must hold the store lock.
    ///
    /// Eviction deletions are best-effort: a file that cannot be removed is
    /// logged and left for the next pass rather than failing the store
    /// operation that triggered this one.
    async fn evict(&self) {
        let mut files = match self.list_entry_files().await {
            Some(files) => files,
            None => return,
        };

        // Most-recently-touched first
        files.sort_by(|a, b| b.modified.cmp(&a.modified));

        let mut total: u64 = 0;
        let mut over_budget = false;
        let mut retained = Vec::new();
        for file in files {
            if !over_budget && total + file.size <= self.config.max_size_bytes {
                total += file.size;
                retained.push(file);
            } else {
                // Everything from the first overflow onward goes, even
                // files small enough to have fit on their own.
                over_budget = true;
                tracing::debug!(path = %file.path.display(), size = file.size, "evicting entry over size budget");
                if let Err(e) = fs::remove_file(&file.path).await {
                    if e.kind() != ErrorKind::NotFound {
                        tracing::warn!(path = %file.path.display(), error = %e, "failed to evict cache entry");
                    }
                }
            }
        }

        let now = SystemTime::now();
        for file in retained {
            let age = now
                .duration_since(file.modified)
                .unwrap_or(Duration::ZERO);
            if age > self.config.ttl {
                tracing::debug!(path = %file.path.display(), "evicting entry past its time-to-live");
                if let Err(e) = fs::remove_file(&file.path).await {
                    if e.kind() != ErrorKind::NotFound {
                        tracing::warn!(path = %file.path.display(), error = %e, "failed to evict cache entry");
                    }
                }
            }
        }
    }

    async fn list_entry_files(&self) -> Option<Vec<EntryFile>> {
        let mut dir = match fs::read_dir(&self.config.directory).await {
            Ok(dir) => dir,
            Err(_) => return None,
        };
        let mut files = Vec::new();
        while let Ok(Some(dirent)) = dir.next_entry().await {
            let path = dirent.path();
            if !is_entry_file(&path) {
                continue;
            }
            let Ok(metadata) = dirent.metadata().await else {
                continue;
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            files.push(EntryFile {
                path,
                size: metadata.len(),
                modified,
            });
        }
        Some(files)
    }
}

struct EntryFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

fn is_entry_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == ENTRY_EXTENSION)
        .unwrap_or(false)
}

/// Write `bytes` to `path` without ever exposing a partial file: the data
/// goes to a sibling temp file first and only becomes visible through the
/// final rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await.map_err(|e| Error::CacheStorage {
        message: format!("failed to write cache entry {}", tmp.display()),
        source: Some(anyhow::Error::new(e)),
    })?;
    fs::rename(&tmp, path).await.map_err(|e| Error::CacheStorage {
        message: format!("failed to publish cache entry {}", path.display()),
        source: Some(anyhow::Error::new(e)),
    })
}

async fn remove_entry_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::CacheStorage {
            message: format!("failed to remove cache entry {}", path.display()),
            source: Some(anyhow::Error::new(e)),
        }),
    }
}
