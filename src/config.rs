//! Application configuration
//!
//! Central location for configuration constants, resource limits and
//! validation boundaries, plus the on-disk `AppConfig` the shell
//! provides at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::Result;

// ===== Catalog Listing Limits =====

/// Default page size for catalog listings.
/// Matches the cap the wardrobe screens request when browsing a category.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Maximum page size a caller may request for any listing.
/// Prevents a single query from materializing the whole catalog.
pub const MAX_LIST_LIMIT: usize = 1_000;

// ===== Blob Store Limits =====

/// Maximum length for a stored object's file name component.
/// Matches the common filesystem limit of 255 bytes per path segment.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Cache lifetime in seconds recorded against uploaded objects.
/// Stored as object metadata so a fronting CDN or shell webview can
/// honor it when serving public URLs.
pub const UPLOAD_CACHE_CONTROL_SECS: u32 = 3_600;

/// Content type for catalog item images. Every item that survives the
/// cutout pipeline is a PNG with an alpha channel.
pub const ITEM_CONTENT_TYPE: &str = "image/png";

/// Timeout in seconds for a single blob store operation.
/// A store that cannot complete a write in this window is treated as
/// unavailable rather than left to hang the ingestion pipeline.
pub const DEFAULT_STORE_IO_TIMEOUT_SECS: u64 = 10;

// ===== Capture Limits =====

/// Maximum size in bytes for a captured photo (10 MiB).
/// Anything larger is rejected before it reaches the cutout service.
pub const MAX_CAPTURE_BYTES: usize = 10 * 1024 * 1024;

// ===== Cutout Service Limits =====

/// Timeout in seconds for a background removal request.
/// Cutout inference on a cold model can take several seconds; beyond
/// this the request is abandoned and surfaced as a timeout.
pub const DEFAULT_REMOVAL_TIMEOUT_SECS: u64 = 30;

/// Form field name the cutout service expects the image under.
pub const REMOVAL_IMAGE_FIELD: &str = "image";

// ===== Startup Configuration =====

/// Catalog database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("fitted.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Blob store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding the category prefixes
    #[serde(default = "default_storage_root")]
    pub root_dir: PathBuf,
    /// Base URL public object URLs are built from
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Timeout in seconds for a single store operation
    #[serde(default = "default_store_io_timeout")]
    pub io_timeout_secs: u64,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_base_url() -> String {
    "http://localhost:8000/uploads".to_string()
}

fn default_store_io_timeout() -> u64 {
    DEFAULT_STORE_IO_TIMEOUT_SECS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_root(),
            public_base_url: default_public_base_url(),
            io_timeout_secs: default_store_io_timeout(),
        }
    }
}

/// Cutout service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Endpoint of the background-removal service
    #[serde(default = "default_removal_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds
    #[serde(default = "default_removal_timeout")]
    pub timeout_secs: u64,
}

fn default_removal_endpoint() -> String {
    "http://127.0.0.1:5000/remove-background".to_string()
}

fn default_removal_timeout() -> u64 {
    DEFAULT_REMOVAL_TIMEOUT_SECS
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            endpoint: default_removal_endpoint(),
            timeout_secs: default_removal_timeout(),
        }
    }
}

/// Catalog reader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Page size for listings
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub removal: RemovalConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Load configuration from disk or create a default file
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, creating default config");
            let default = Self::default();
            default.save(path).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(path).await?;
        let config: AppConfig = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to disk
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;

        tracing::info!("Config saved to {:?}", path);
        Ok(())
    }
}
