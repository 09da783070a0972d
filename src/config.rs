//! Service configuration.
//!
//! Values are resolved once at startup: built-in defaults, then an optional JSON
//! file, then `PHOTOSTRIP_*` environment variables. The resulting [`Config`] is
//! passed explicitly to everything that needs it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use photostrip_core::{Composer, ResizeFilter, DEFAULT_SIDE_LENGTH};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "photostrip";
const CONFIG_FILE: &str = "config.json";

/// Largest request body accepted for an image upload (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where finished collages are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Written under the data directory and served by this process at `/media`.
    #[default]
    #[serde(alias = "local")]
    LocalFilesystem,
    /// Uploaded to an HTTP object store.
    #[serde(alias = "remote")]
    RemoteObjectStore,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalFilesystem => "local-filesystem",
            Self::RemoteObjectStore => "remote-object-store",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "local-filesystem" | "local" => Some(Self::LocalFilesystem),
            "remote-object-store" | "remote" => Some(Self::RemoteObjectStore),
            _ => None,
        }
    }
}

/// Settings for [`StorageBackend::RemoteObjectStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStoreConfig {
    /// Base URL objects are `PUT` under, e.g. `https://objects.example.com/strips`.
    pub endpoint: Option<String>,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Public base URL of uploaded objects. Defaults to `endpoint`.
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Side of the square collage in pixels.
    pub side_length: u32,
    pub storage_backend: StorageBackend,
    /// Holds the pending image database and locally delivered collages.
    pub data_dir: PathBuf,
    pub bind_address: String,
    pub port: u16,
    /// Base URL under which this server is reachable. Defaults to the bind address.
    pub public_base_url: Option<String>,
    pub remote: RemoteStoreConfig,
    pub resize_filter: ResizeFilter,
    /// RGBA fill for band area not covered by a too-short image.
    pub background: [u8; 4],
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            side_length: DEFAULT_SIDE_LENGTH,
            storage_backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            public_base_url: None,
            remote: RemoteStoreConfig::default(),
            resize_filter: ResizeFilter::default(),
            background: [0, 0, 0, 255],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Resolve configuration from `path` (or the default config file, if it
    /// exists) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match get_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Override fields from `PHOTOSTRIP_*` variables returned by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("PHOTOSTRIP_SIDE_LENGTH") {
            self.side_length = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid PHOTOSTRIP_SIDE_LENGTH: {}", value))?;
        }

        if let Some(value) = lookup("PHOTOSTRIP_STORAGE_BACKEND") {
            self.storage_backend = StorageBackend::from_str(value.trim())
                .ok_or_else(|| anyhow::anyhow!("Invalid PHOTOSTRIP_STORAGE_BACKEND: {}", value))?;
        }

        if let Some(value) = lookup("PHOTOSTRIP_DATA_DIR") {
            self.data_dir = PathBuf::from(value);
        }

        if let Some(value) = lookup("PHOTOSTRIP_PUBLIC_URL") {
            self.public_base_url = Some(value);
        }

        if let Some(value) = lookup("PHOTOSTRIP_REMOTE_ENDPOINT") {
            self.remote.endpoint = Some(value);
        }

        if let Some(value) = lookup("PHOTOSTRIP_REMOTE_API_KEY") {
            self.remote.api_key = Some(value);
        }

        if let Some(value) = lookup("PHOTOSTRIP_REMOTE_PUBLIC_URL") {
            self.remote.public_base_url = Some(value);
        }

        if let Some(value) = lookup("PHOTOSTRIP_RESIZE_FILTER") {
            self.resize_filter = ResizeFilter::from_str(value.trim())
                .ok_or_else(|| anyhow::anyhow!("Invalid PHOTOSTRIP_RESIZE_FILTER: {}", value))?;
        }

        if let Some(value) = lookup("PHOTOSTRIP_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid PHOTOSTRIP_MAX_UPLOAD_BYTES: {}", value))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.side_length == 0 {
            anyhow::bail!("side_length must be at least 1 pixel");
        }

        if self.storage_backend == StorageBackend::RemoteObjectStore
            && self.remote.endpoint.is_none()
        {
            anyhow::bail!("remote-object-store backend requires remote.endpoint");
        }

        Ok(())
    }

    pub fn composer(&self) -> Composer {
        Composer::new(self.side_length)
            .with_filter(self.resize_filter)
            .with_background(self.background)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("photostrip.db")
    }

    /// Directory locally delivered collages are written to.
    pub fn media_dir(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    pub fn public_base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.bind_address, self.port))
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".photostrip"))
}

/// `<config dir>/photostrip/config.json`, when the platform has a config dir.
pub fn get_config_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Some(path)
}
