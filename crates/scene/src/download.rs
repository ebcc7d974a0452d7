//! Asset fetching.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::DownloadError;

/// Source of raw asset bytes, addressed by relative path.
pub trait Downloader: Send + Sync + 'static {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, DownloadError>> + Send;
}

/// Reads assets from a directory tree. A missing file is a 404.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    root: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Downloader for DirectoryDownloader {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, DownloadError> {
        let full = self.root.join(path);
        debug!(path = %full.display(), "reading asset");
        tokio::fs::read(&full).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DownloadError::Status {
                path: path.to_string(),
                status: 404,
            },
            _ => DownloadError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            },
        })
    }
}

/// Remembers every successful fetch and serves it when the inner downloader
/// later fails. Disabled caches pass straight through.
#[derive(Debug)]
pub struct OfflineCache<D> {
    inner: D,
    enabled: bool,
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl<D: Downloader> OfflineCache<D> {
    pub fn new(inner: D, enabled: bool) -> Self {
        Self {
            inner,
            enabled,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the cache, e.g. from a previous session.
    pub async fn insert(&self, path: impl Into<String>, bytes: Vec<u8>) {
        self.entries.lock().await.insert(path.into(), bytes);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl<D: Downloader> Downloader for OfflineCache<D> {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, DownloadError> {
        if !self.enabled {
            return self.inner.fetch(path).await;
        }
        match self.inner.fetch(path).await {
            Ok(bytes) => {
                self.entries
                    .lock()
                    .await
                    .insert(path.to_string(), bytes.clone());
                Ok(bytes)
            }
            Err(e) => match self.entries.lock().await.get(path) {
                Some(bytes) => {
                    warn!(path, error = %e, "serving asset from offline cache");
                    Ok(bytes.clone())
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves a fixed map of assets; everything else is a 404.
    struct MapDownloader(HashMap<String, Vec<u8>>);

    impl Downloader for MapDownloader {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, DownloadError> {
            self.0.get(path).cloned().ok_or(DownloadError::Status {
                path: path.to_string(),
                status: 404,
            })
        }
    }

    #[tokio::test]
    async fn test_directory_missing_file_is_404() {
        let downloader = DirectoryDownloader::new(std::env::temp_dir());
        let err = downloader
            .fetch("brep-scene-no-such-asset.json")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.tag(), "download");
    }

    #[tokio::test]
    async fn test_offline_cache_falls_back() {
        let cache = OfflineCache::new(MapDownloader(HashMap::new()), true);
        assert!(cache.fetch("a.json").await.is_err());
        cache.insert("a.json", b"{}".to_vec()).await;
        assert_eq!(cache.fetch("a.json").await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_offline_cache_remembers_fetches() {
        let assets = HashMap::from([("b.json".to_string(), b"[]".to_vec())]);
        let cache = OfflineCache::new(MapDownloader(assets), true);
        cache.fetch("b.json").await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_passes_through() {
        let cache = OfflineCache::new(MapDownloader(HashMap::new()), false);
        cache.insert("a.json", b"{}".to_vec()).await;
        assert!(cache.fetch("a.json").await.is_err());
    }
}
