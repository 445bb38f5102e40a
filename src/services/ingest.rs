//! Ingestion service
//!
//! Runs the item pipeline: capture, background removal, blob upload,
//! catalog insert. Also owns the delete path and the orphan queries
//! against the ingest ledger.
//! Integrates Repository and BlobStore.

use std::sync::Arc;

use crate::capture::{Capture, CaptureSource};
use crate::config::ITEM_CONTENT_TYPE;
use crate::database::{Category, IngestRecord, Item, Repository};
use crate::error::Result;
use crate::removal::BackgroundRemover;
use crate::storage::BlobStore;

/// Service running the item-ingestion pipeline
#[derive(Clone)]
pub struct IngestService {
    repo: Repository,
    blob_store: BlobStore,
    remover: Arc<dyn BackgroundRemover>,
}

impl IngestService {
    pub fn new(
        repo: Repository,
        blob_store: BlobStore,
        remover: Arc<dyn BackgroundRemover>,
    ) -> Self {
        Self {
            repo,
            blob_store,
            remover,
        }
    }

    /// Capture a photo from the source and ingest it
    pub async fn ingest_from(
        &self,
        source: &dyn CaptureSource,
        category: Category,
    ) -> Result<Item> {
        let capture = source.capture().await?;
        self.ingest(category, capture).await
    }

    /// Run a captured photo through removal, upload and catalog insert.
    ///
    /// A failure before the upload leaves no trace anywhere. A failure
    /// between upload and insert leaves the blob in place with a
    /// non-committed ledger entry; `unreconciled` surfaces those.
    pub async fn ingest(&self, category: Category, capture: Capture) -> Result<Item> {
        capture.validate()?;

        tracing::info!("Ingesting {} capture: {}", category, capture.file_name);

        // Raw photos never reach storage; only the cutout does
        let processed = self.remover.remove_background(capture.payload()).await?;

        let image_path = format!("{}/{}", category.prefix(), capture.file_name);
        let meta = self
            .blob_store
            .upload(&image_path, &processed, ITEM_CONTENT_TYPE)
            .await?;

        let ledger = self
            .repo
            .record_ingest(&meta.id, category, &image_path)
            .await?;

        let item = match self
            .repo
            .commit_item(&ledger.id, category, &meta.id, &capture.file_name, &image_path)
            .await
        {
            Ok(item) => item,
            Err(e) => {
                // The blob stays put; the ledger entry carries it to
                // reconciliation instead.
                tracing::error!(
                    "Catalog insert failed, orphaning upload {} ({}): {}",
                    ledger.id,
                    image_path,
                    e
                );
                if let Err(mark_err) = self
                    .repo
                    .mark_ingest_orphaned(&ledger.id, &e.to_string())
                    .await
                {
                    tracing::error!(
                        "Failed to orphan ledger entry {}: {}",
                        ledger.id,
                        mark_err
                    );
                }
                return Err(e);
            }
        };

        tracing::info!("Ingested {} item: {} at {}", category, item.id, image_path);
        Ok(item)
    }

    /// Delete an item's catalog row and stored image together.
    ///
    /// The row goes first so no reader ever resolves a row whose image
    /// is already gone. A blob removal failure after the row delete is
    /// recorded in the ledger as orphaned and the error surfaces.
    pub async fn delete_item(&self, category: Category, item_id: &str) -> Result<()> {
        tracing::info!("Deleting {} item: {}", category, item_id);

        let item = self.repo.delete_item(category, item_id).await?;

        if let Err(e) = self.blob_store.remove(&item.image_url).await {
            tracing::error!(
                "Blob removal failed after row delete: {} ({}): {}",
                item.image_url,
                item_id,
                e
            );
            match self
                .repo
                .record_ingest(&item.id, category, &item.image_url)
                .await
            {
                Ok(ledger) => {
                    if let Err(mark_err) = self
                        .repo
                        .mark_ingest_orphaned(&ledger.id, &format!("blob removal failed: {}", e))
                        .await
                    {
                        tracing::error!(
                            "Failed to orphan ledger entry {}: {}",
                            ledger.id,
                            mark_err
                        );
                    }
                }
                Err(ledger_err) => {
                    tracing::error!(
                        "Failed to record orphaned blob {}: {}",
                        item.image_url,
                        ledger_err
                    );
                }
            }
            return Err(e);
        }

        tracing::info!("Deleted {} item: {}", category, item_id);
        Ok(())
    }

    /// Ledger entries whose uploads never reached a committed row,
    /// oldest first
    pub async fn unreconciled(&self) -> Result<Vec<IngestRecord>> {
        self.repo.list_unreconciled().await
    }
}
