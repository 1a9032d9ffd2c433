//! Object storage for voice samples and rendered audio.
//!
//! [`FsObjectStore`] keeps objects under a root directory and hands out
//! public locations of the form `<url_prefix>/<key>`.  `fetch` accepts those
//! locations back, plus plain filesystem paths and `http(s)://` URLs.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::StorageConfig;

const HTTP_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    /// Keys must be relative and must not climb out of the store root.
    #[error("invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("storage I/O error on {location}: {message}")]
    Io { location: String, message: String },

    #[error("failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },

    /// The record store behind a repository failed.
    #[error("record store error: {0}")]
    Backend(String),
}

impl StorageError {
    fn io(location: impl Into<String>, e: std::io::Error) -> Self {
        let location = location.into();
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(location)
        } else {
            StorageError::Io {
                location,
                message: e.to_string(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectStore trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the object at `location` (as returned by [`put`](Self::put),
    /// a path, or a URL).
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `bytes` under `key` and return its public location.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
}

// ---------------------------------------------------------------------------
// FsObjectStore
// ---------------------------------------------------------------------------

pub struct FsObjectStore {
    root: PathBuf,
    url_prefix: String,
    http: reqwest::Client,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root, &config.url_prefix)
    }

    /// Public location for `key`.
    pub fn location_for(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    /// Filesystem path of a stored object, after key validation.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Map a location back to a local path; `None` for remote URLs.
    fn local_path(&self, location: &str) -> Result<Option<PathBuf>, StorageError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            return Ok(None);
        }
        let prefix = format!("{}/", self.url_prefix);
        match location.strip_prefix(&prefix) {
            Some(key) => self.path_for(key).map(Some),
            None => Ok(Some(PathBuf::from(location))),
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let fetch_err = |message: String| StorageError::Fetch {
            location: url.to_string(),
            message,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(url.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| fetch_err(e.to_string()))?;
        let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        match self.local_path(location)? {
            Some(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::io(location, e)),
            None => self.fetch_url(location).await,
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent.display().to_string(), e))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| StorageError::io(path.display().to_string(), e))?;
        log::debug!("storage: wrote {} bytes to {}", bytes.len(), path.display());
        Ok(self.location_for(key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
