//! Path-addressed blob storage for item images
//!
//! Objects live under category prefixes relative to a root directory,
//! e.g. "shirts/1724572800000.png". Uploads never overwrite: the final
//! path is claimed with a hard link, so of two racing uploads exactly
//! one wins and the other gets a conflict.
//!
//! Each object carries sidecar metadata (JSON under ".meta/") holding
//! the generated object id, content type, size and checksum. The id is
//! what the catalog uses as the item's primary key.

use crate::config::{DEFAULT_STORE_IO_TIMEOUT_SECS, MAX_FILENAME_LENGTH, UPLOAD_CACHE_CONTROL_SECS};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Directory for sidecar metadata, skipped by listings
const META_DIR: &str = ".meta";

/// Metadata stored alongside every uploaded object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Store-assigned object id, propagated into the catalog row
    pub id: String,
    /// Prefixed relative path, e.g. "shirts/1724572800000.png"
    pub path: String,
    pub content_type: String,
    pub size: i64,
    /// SHA-256 of the stored bytes
    pub checksum: String,
    pub cache_control: u32,
    pub created_at: DateTime<Utc>,
}

impl ObjectMeta {
    /// File name component of the object path
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Path-addressed blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base_url: String,
    io_timeout: Duration,
}

impl BlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url,
            io_timeout: Duration::from_secs(DEFAULT_STORE_IO_TIMEOUT_SECS),
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Initialize the blob store (create directories if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(self.root.join(META_DIR)).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Upload data to a prefixed path, failing if the path is taken.
    ///
    /// The bytes land in a hidden temp file first and are linked into
    /// the final path, so readers never observe a partial object and
    /// an existing object is never replaced.
    pub async fn upload(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectMeta> {
        self.bounded("upload", self.upload_inner(path, data, content_type))
            .await
    }

    async fn upload_inner(&self, path: &str, data: &[u8], content_type: &str) -> Result<ObjectMeta> {
        let dest = self.resolve(path)?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Hidden temp name keeps half-written files out of listings
        let temp_path = dest
            .parent()
            .unwrap_or(&self.root)
            .join(format!(".upload-{}", Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        // hard_link fails when the destination exists: this is the
        // non-overwrite guarantee, even with two uploads racing
        match fs::hard_link(&temp_path, &dest).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(AppError::UploadConflict(path.to_string()));
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(e.into());
            }
        }
        fs::remove_file(&temp_path).await?;

        let meta = ObjectMeta {
            id: Uuid::new_v4().to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as i64,
            checksum: checksum(data),
            cache_control: UPLOAD_CACHE_CONTROL_SECS,
            created_at: Utc::now(),
        };
        self.write_meta(&meta).await?;

        tracing::debug!("Uploaded object: {} ({} bytes)", path, data.len());
        Ok(meta)
    }

    /// Read an object's bytes
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.bounded("read", self.read_inner(path)).await
    }

    async fn read_inner(&self, path: &str) -> Result<Vec<u8>> {
        let file_path = self.resolve(path)?;

        if !file_path.exists() {
            return Err(AppError::StoreUnavailable(format!(
                "Object not found: {}",
                path
            )));
        }

        let data = fs::read(&file_path).await?;
        tracing::debug!("Read object: {} ({} bytes)", path, data.len());
        Ok(data)
    }

    /// Check whether an object exists
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let file_path = self.resolve(path)?;
        Ok(file_path.exists())
    }

    /// Remove an object and its sidecar metadata
    pub async fn remove(&self, path: &str) -> Result<()> {
        self.bounded("remove", self.remove_inner(path)).await
    }

    async fn remove_inner(&self, path: &str) -> Result<()> {
        let file_path = self.resolve(path)?;

        if !file_path.exists() {
            return Ok(()); // Already removed
        }

        fs::remove_file(&file_path).await?;
        let _ = fs::remove_file(self.meta_path(path)).await;

        tracing::debug!("Removed object: {}", path);
        Ok(())
    }

    /// List objects under a prefix, name order, up to `limit`.
    ///
    /// Dot-entries (placeholders, in-flight temp files) are skipped.
    /// Objects missing their sidecar are logged and skipped rather
    /// than failing the whole listing.
    pub async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<ObjectMeta>> {
        self.bounded("list", self.list_inner(prefix, limit)).await
    }

    async fn list_inner(&self, prefix: &str, limit: usize) -> Result<Vec<ObjectMeta>> {
        let dir = self.resolve(prefix)?;

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if !entry_path.is_file() {
                continue;
            }
            let Some(name) = entry_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name.to_string());
        }

        names.sort();
        names.truncate(limit);

        let mut objects = Vec::with_capacity(names.len());
        for name in names {
            let object_path = format!("{}/{}", prefix, name);
            match self.read_meta(&object_path).await {
                Ok(meta) => objects.push(meta),
                Err(e) => {
                    tracing::warn!("Skipping object without metadata: {} ({})", object_path, e)
                }
            }
        }

        Ok(objects)
    }

    /// Fully-qualified public URL for an object path
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), path)
    }

    /// Resolve a prefixed relative path against the root, rejecting
    /// anything that could escape it or collide with hidden entries.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() {
            return Err(invalid_path(path));
        }

        let mut resolved = self.root.clone();
        for component in path.split('/') {
            if component.is_empty()
                || component == "."
                || component == ".."
                || component.starts_with('.')
                || component.contains('\\')
                || component.len() > MAX_FILENAME_LENGTH
            {
                return Err(invalid_path(path));
            }
            resolved.push(component);
        }

        Ok(resolved)
    }

    fn meta_path(&self, path: &str) -> PathBuf {
        let mut meta = self.root.join(META_DIR);
        for component in path.split('/') {
            meta.push(component);
        }
        // Append rather than replace, so "100.png" maps to "100.png.json"
        let mut raw = meta.into_os_string();
        raw.push(".json");
        PathBuf::from(raw)
    }

    async fn write_meta(&self, meta: &ObjectMeta) -> Result<()> {
        let meta_path = self.meta_path(&meta.path);
        if let Some(parent) = meta_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&meta_path, serde_json::to_vec_pretty(meta)?).await?;
        Ok(())
    }

    async fn read_meta(&self, path: &str) -> Result<ObjectMeta> {
        let content = fs::read(self.meta_path(path)).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Bound an I/O future by the configured timeout
    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.io_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!("blob store {}", op))),
        }
    }
}

fn invalid_path(path: &str) -> AppError {
    AppError::StoreUnavailable(format!("Invalid object path: {}", path))
}

/// SHA-256 of the data as lowercase hex
fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(
            temp_dir.path().join("uploads"),
            "http://localhost/storage/uploads".to_string(),
        );
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_upload_and_read() {
        let (store, _temp) = create_test_store().await;

        let data = b"png bytes";
        let meta = store
            .upload("shirts/100.png", data, "image/png")
            .await
            .unwrap();

        assert_eq!(meta.path, "shirts/100.png");
        assert_eq!(meta.name(), "100.png");
        assert_eq!(meta.size, data.len() as i64);
        assert_eq!(meta.content_type, "image/png");
        assert!(!meta.id.is_empty());
        assert_eq!(meta.checksum, checksum(data));

        let read_back = store.read("shirts/100.png").await.unwrap();
        assert_eq!(read_back, data);
    }

    #[tokio::test]
    async fn test_upload_conflict_keeps_original() {
        let (store, _temp) = create_test_store().await;

        store
            .upload("shirts/100.png", b"first", "image/png")
            .await
            .unwrap();

        let err = store
            .upload("shirts/100.png", b"second", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UploadConflict(ref p) if p == "shirts/100.png"));

        // Original bytes untouched
        let data = store.read("shirts/100.png").await.unwrap();
        assert_eq!(data, b"first");

        // Loser's temp file cleaned up, so the listing still has one entry
        let objects = store.list("shirts", 100).await.unwrap();
        assert_eq!(objects.len(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _temp) = create_test_store().await;

        store
            .upload("pants/1.png", b"data", "image/png")
            .await
            .unwrap();
        assert!(store.exists("pants/1.png").await.unwrap());

        store.remove("pants/1.png").await.unwrap();
        assert!(!store.exists("pants/1.png").await.unwrap());

        // Removing again is fine
        store.remove("pants/1.png").await.unwrap();

        // Metadata went with the object
        assert!(store.list("pants", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_object() {
        let (store, _temp) = create_test_store().await;

        let err = store.read("shoes/none.png").await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_list_sorted_and_limited() {
        let (store, _temp) = create_test_store().await;

        for name in ["3.png", "1.png", "2.png"] {
            store
                .upload(&format!("shoes/{}", name), b"x", "image/png")
                .await
                .unwrap();
        }

        let all = store.list("shoes", 100).await.unwrap();
        let names: Vec<&str> = all.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["1.png", "2.png", "3.png"]);

        let page = store.list("shoes", 2).await.unwrap();
        assert_eq!(page.len(), 2);

        let empty = store.list("shirts", 100).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_dot_entries() {
        let (store, temp) = create_test_store().await;

        store
            .upload("shirts/1.png", b"x", "image/png")
            .await
            .unwrap();

        let dir = temp.path().join("uploads").join("shirts");
        std::fs::write(dir.join(".emptyFolderPlaceholder"), b"").unwrap();

        let objects = store.list("shirts", 100).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name(), "1.png");
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let (store, _temp) = create_test_store().await;

        for bad in ["../evil.png", "shirts/../../evil.png", "", "shirts//x.png", ".meta/x.json"] {
            let result = store.upload(bad, b"x", "image/png").await;
            assert!(result.is_err(), "accepted bad path: {}", bad);
        }
    }

    #[tokio::test]
    async fn test_public_url() {
        let (store, _temp) = create_test_store().await;

        assert_eq!(
            store.public_url("shirts/1.png"),
            "http://localhost/storage/uploads/shirts/1.png"
        );
    }

    #[tokio::test]
    async fn test_io_timeout_surfaces() {
        let (store, _temp) = create_test_store().await;
        let store = store.with_io_timeout(Duration::from_secs(0));

        let err = store
            .upload("shirts/slow.png", b"x", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }
}
