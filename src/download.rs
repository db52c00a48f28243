//! Delivery of cleaned files and the transient handles that go with them
//!
//! A delivered download may hold a transient resource (a registry entry served
//! over HTTP). Its release is attached to a [`ReleaseGuard`] which runs the
//! release exactly once: when the scheduled grace delay elapses, or when the
//! guard is dropped, whichever comes first.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::error::ChainError;

type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

/// Release obligation of one transient handle
pub struct ReleaseGuard {
    label: String,
    release: Option<ReleaseFn>,
}

impl ReleaseGuard {
    pub fn new(label: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            release: Some(Box::new(release)),
        }
    }

    /// Guard for deliveries that hold nothing transient
    pub fn noop(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            release: None,
        }
    }

    pub fn release(mut self) {
        self.run();
    }

    /// Release after `grace`, giving the client time to start the download
    pub fn schedule(self, grace: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            self.release();
        })
    }

    fn run(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            debug!("Released transient handle {}", self.label);
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("label", &self.label)
            .field("pending", &self.release.is_some())
            .finish()
    }
}

/// A delivered file
#[derive(Debug)]
pub struct Delivery {
    /// Path or URL where the file can be retrieved
    pub locator: String,
    pub guard: ReleaseGuard,
}

/// Last stage of a chain: hand the cleaned CSV to the user
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, file_name: &str, contents: &str) -> Result<Delivery, ChainError>;
}

/// Writes deliveries straight into a directory
#[derive(Debug, Clone)]
pub struct FileDownloadSink {
    dir: PathBuf,
}

impl FileDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl DownloadSink for FileDownloadSink {
    #[instrument(skip(self, contents))]
    async fn deliver(&self, file_name: &str, contents: &str) -> Result<Delivery, ChainError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, contents).await?;
        info!("Wrote {}", path.display());
        Ok(Delivery {
            locator: path.to_string_lossy().into_owned(),
            guard: ReleaseGuard::noop(file_name),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub file_name: String,
    pub contents: String,
}

/// In-memory table of downloadable blobs, addressed by generated ids
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    blobs: Mutex<HashMap<String, Blob>>,
}

impl BlobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, file_name: &str, contents: &str) -> String {
        let id = format!("blob-{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.blobs().insert(
            id.clone(),
            Blob {
                file_name: file_name.to_string(),
                contents: contents.to_string(),
            },
        );
        id
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Blob> {
        self.blobs().get(id).cloned()
    }

    /// Returns whether the blob was still registered
    pub fn revoke(&self, id: &str) -> bool {
        self.blobs().remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn blobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, Blob>> {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registers deliveries in a [`BlobRegistry`] and hands out their URLs
#[derive(Debug, Clone)]
pub struct BlobDownloadSink {
    registry: BlobRegistry,
    url_prefix: String,
}

impl BlobDownloadSink {
    pub fn new(registry: BlobRegistry, url_prefix: impl Into<String>) -> Self {
        Self {
            registry,
            url_prefix: url_prefix.into(),
        }
    }
}

#[async_trait]
impl DownloadSink for BlobDownloadSink {
    async fn deliver(&self, file_name: &str, contents: &str) -> Result<Delivery, ChainError> {
        let id = self.registry.create(file_name, contents);
        let registry = self.registry.clone();
        let revoke_id = id.clone();
        Ok(Delivery {
            locator: format!("{}/{id}", self.url_prefix),
            guard: ReleaseGuard::new(id, move || {
                registry.revoke(&revoke_id);
            }),
        })
    }
}
