//! Application state and initialization
//!
//! This module builds the central application state. The pool, the
//! stores and all services are initialized here and handed to the
//! shell through AppState.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::database::{self, Repository};
use crate::error::Result;
use crate::removal::{BackgroundRemover, HttpRemover};
use crate::services::{AssignmentService, CatalogService, IngestService};
use crate::storage::BlobStore;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub assignments: AssignmentService,
    pub catalog: CatalogService,
}

impl AppState {
    /// Initialize the full application from configuration.
    ///
    /// Creates the database pool (running migrations), prepares the
    /// blob store directories and wires the HTTP cutout client.
    pub async fn initialize(config: &AppConfig) -> Result<Self> {
        tracing::info!("Initializing application");

        let pool = database::create_pool(&config.database.path).await?;
        let repo = Repository::new(pool);

        let blob_store = BlobStore::new(
            config.storage.root_dir.clone(),
            config.storage.public_base_url.clone(),
        )
        .with_io_timeout(Duration::from_secs(config.storage.io_timeout_secs));
        blob_store.initialize().await?;

        let remover: Arc<dyn BackgroundRemover> = Arc::new(HttpRemover::with_timeout(
            config.removal.endpoint.clone(),
            Duration::from_secs(config.removal.timeout_secs),
        )?);

        let state = Self::assemble(repo, blob_store, remover, config.catalog.list_limit);

        tracing::info!("Application initialized successfully");
        Ok(state)
    }

    /// Wire the services over explicit stores.
    ///
    /// Tests go through here to inject mock collaborators.
    pub fn assemble(
        repo: Repository,
        blob_store: BlobStore,
        remover: Arc<dyn BackgroundRemover>,
        list_limit: usize,
    ) -> Self {
        Self {
            ingest: IngestService::new(repo.clone(), blob_store.clone(), remover),
            assignments: AssignmentService::new(repo.clone()),
            catalog: CatalogService::new(repo, blob_store).with_list_limit(list_limit),
        }
    }
}
