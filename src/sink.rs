//! Destinations for finished collages.
//!
//! The deployment decides once, at startup, whether collages are written to the
//! local disk and served by this process, or uploaded to an HTTP object store.
//! Either way the caller gets back the URL the end user will open.

use std::path::{Path, PathBuf};

use reqwest::{header, Client, StatusCode};

use crate::config::{Config, StorageBackend};
use crate::error::{Error, Result};

/// Where encoded collages go.
#[derive(Debug, Clone)]
pub enum ImageSink {
    LocalDisk(LocalDisk),
    RemoteObjectStore(RemoteObjectStore),
}

impl ImageSink {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.storage_backend {
            StorageBackend::LocalFilesystem => Ok(Self::LocalDisk(LocalDisk::new(
                config.media_dir(),
                config.public_base_url(),
            ))),
            StorageBackend::RemoteObjectStore => {
                let endpoint = config.remote.endpoint.clone().ok_or_else(|| {
                    anyhow::anyhow!("remote-object-store backend requires remote.endpoint")
                })?;
                Ok(Self::RemoteObjectStore(RemoteObjectStore::new(
                    endpoint,
                    config.remote.api_key.clone(),
                    config.remote.public_base_url.clone(),
                )))
            }
        }
    }

    /// Persist `png` under `key` and return its public URL.
    pub async fn deliver(&self, key: &str, png: Vec<u8>) -> Result<String> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.starts_with('.') {
            return Err(Error::Internal(format!("invalid object key: {:?}", key)));
        }

        match self {
            Self::LocalDisk(sink) => sink.put(key, png).await,
            Self::RemoteObjectStore(sink) => sink.put(key, png).await,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::LocalDisk(_) => StorageBackend::LocalFilesystem,
            Self::RemoteObjectStore(_) => StorageBackend::RemoteObjectStore,
        }
    }

    /// Directory that has to be served at `/media` for delivered URLs to resolve.
    pub fn local_root(&self) -> Option<&Path> {
        match self {
            Self::LocalDisk(sink) => Some(&sink.root),
            Self::RemoteObjectStore(_) => None,
        }
    }
}

/// Writes collages to `root`; their URLs point at this server's `/media` route.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDisk {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    async fn put(&self, key: &str, png: Vec<u8>) -> Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(key);
        tokio::fs::write(&path, png).await?;
        tracing::info!("Wrote collage to {}", path.display());

        Ok(join_url(&self.public_base_url, &format!("media/{}", key)))
    }
}

/// Uploads collages with `PUT <endpoint>/<key>`.
#[derive(Debug, Clone)]
pub struct RemoteObjectStore {
    endpoint: String,
    api_key: Option<String>,
    public_base_url: Option<String>,
    client: Client,
}

impl RemoteObjectStore {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            public_base_url,
            client: Client::new(),
        }
    }

    async fn put(&self, key: &str, png: Vec<u8>) -> Result<String> {
        let url = join_url(&self.endpoint, key);
        let mut req = self
            .client
            .put(&url)
            .header(header::CONTENT_TYPE, "image/png")
            .body(png);
        if let Some(ref api_key) = self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized),
                _ => Err(Error::Delivery(format!("{}: {}", status, body))),
            };
        }

        tracing::info!("Uploaded collage to {}", url);
        let base = self.public_base_url.as_deref().unwrap_or(&self.endpoint);
        Ok(join_url(base, key))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://a/b/", "/c.png"), "http://a/b/c.png");
        assert_eq!(join_url("http://a/b", "c.png"), "http://a/b/c.png");
    }

    #[test]
    fn from_config_picks_the_configured_backend() {
        let config = Config::default();
        let sink = ImageSink::from_config(&config).unwrap();
        assert_eq!(sink.backend(), StorageBackend::LocalFilesystem);
        assert_eq!(sink.local_root(), Some(config.media_dir().as_path()));

        let config = Config {
            storage_backend: StorageBackend::RemoteObjectStore,
            remote: crate::config::RemoteStoreConfig {
                endpoint: Some("http://objects.test".to_string()),
                ..Default::default()
            },
            ..Config::default()
        };
        let sink = ImageSink::from_config(&config).unwrap();
        assert_eq!(sink.backend(), StorageBackend::RemoteObjectStore);
        assert!(sink.local_root().is_none());
    }

    #[tokio::test]
    async fn deliver_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ImageSink::LocalDisk(LocalDisk::new(dir.path(), "http://localhost"));

        for key in ["", "../escape.png", "a/b.png", ".hidden"] {
            let err = sink.deliver(key, vec![1, 2, 3]).await.unwrap_err();
            assert!(matches!(err, Error::Internal(_)), "key {:?}", key);
        }
    }
}
