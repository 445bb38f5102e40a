//! Catalog reader
//!
//! Read-side queries for the wardrobe screens. Store paths are
//! resolved to fully-qualified public URLs here, so callers never see
//! a bare path.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::database::{AlbumItemView, AlbumSummary, Category, OutfitView, Repository};
use crate::error::Result;
use crate::storage::BlobStore;

/// A wardrobe item as the closet grid renders it
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub image_url: String,
}

/// Service for read-side catalog queries
#[derive(Clone)]
pub struct CatalogService {
    repo: Repository,
    blob_store: BlobStore,
    list_limit: usize,
}

impl CatalogService {
    pub fn new(repo: Repository, blob_store: BlobStore) -> Self {
        Self {
            repo,
            blob_store,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }

    pub fn with_list_limit(mut self, list_limit: usize) -> Self {
        self.list_limit = list_limit.min(MAX_LIST_LIMIT);
        self
    }

    /// List a category's items from the blob store, name order,
    /// capped at the configured page limit
    pub async fn list_items(&self, category: Category) -> Result<Vec<ItemView>> {
        let objects = self
            .blob_store
            .list(category.prefix(), self.list_limit)
            .await?;

        Ok(objects
            .into_iter()
            .map(|meta| {
                let name = meta.name().to_string();
                let image_url = self.blob_store.public_url(&meta.path);
                ItemView {
                    id: meta.id,
                    name,
                    category,
                    image_url,
                }
            })
            .collect())
    }

    /// Outfit bound to the given calendar day, if any.
    ///
    /// Day boundaries are UTC and the range is half-open, so a
    /// midnight binding belongs to the day it opens. Image URLs carry
    /// a `?t=` suffix to defeat stale caches after a rebinding.
    pub async fn resolve_outfit_for_date(&self, day: NaiveDate) -> Result<Option<OutfitView>> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = match day.succ_opt() {
            Some(next) => next.and_time(NaiveTime::MIN).and_utc(),
            None => DateTime::<Utc>::MAX_UTC,
        };

        let Some(mut outfit) = self.repo.find_outfit_in_range(start, end).await? else {
            tracing::debug!("No outfit bound to {}", day);
            return Ok(None);
        };

        let buster = Utc::now().timestamp_millis();
        outfit.shirt_image_url = self.busted_url(&outfit.shirt_image_url, buster);
        outfit.pant_image_url = self.busted_url(&outfit.pant_image_url, buster);
        outfit.shoe_image_url = self.busted_url(&outfit.shoe_image_url, buster);

        Ok(Some(outfit))
    }

    /// Albums for the gallery, each with a cover image.
    ///
    /// The cover is the oldest member's image; an empty album gets
    /// `None` and the shell renders its placeholder.
    pub async fn list_albums_with_cover(&self) -> Result<Vec<AlbumSummary>> {
        let albums = self.repo.list_albums().await?;

        let mut summaries = Vec::with_capacity(albums.len());
        for album in albums {
            let cover_url = self
                .repo
                .album_cover(&album.id)
                .await?
                .map(|path| self.blob_store.public_url(&path));

            summaries.push(AlbumSummary {
                id: album.id,
                name: album.name,
                cover_url,
                created_at: album.created_at,
            });
        }

        Ok(summaries)
    }

    /// One album's members with resolved item names and image URLs
    pub async fn list_album_items(&self, album_id: &str) -> Result<Vec<AlbumItemView>> {
        let mut members = self.repo.list_album_items(album_id).await?;

        for member in &mut members {
            member.image_url = self.blob_store.public_url(&member.image_url);
        }

        Ok(members)
    }

    fn busted_url(&self, path: &str, buster: i64) -> String {
        format!("{}?t={}", self.blob_store.public_url(path), buster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, Item};
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    const BASE_URL: &str = "http://localhost/uploads";

    async fn create_test_service() -> (CatalogService, TempDir) {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);

        let temp_dir = TempDir::new().unwrap();
        let blob_store = BlobStore::new(temp_dir.path().join("uploads"), BASE_URL.to_string());
        blob_store.initialize().await.unwrap();

        (CatalogService::new(repo, blob_store), temp_dir)
    }

    /// Upload a blob and insert its catalog row, as ingestion would
    async fn seed_item(
        service: &CatalogService,
        category: Category,
        file_name: &str,
    ) -> Item {
        let path = format!("{}/{}", category.prefix(), file_name);
        let meta = service
            .blob_store
            .upload(&path, b"png", "image/png")
            .await
            .unwrap();
        service
            .repo
            .create_item(category, &meta.id, file_name, &path)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_items() {
        let (service, _temp) = create_test_service().await;

        let a = seed_item(&service, Category::Shirt, "a.png").await;
        let b = seed_item(&service, Category::Shirt, "b.png").await;
        seed_item(&service, Category::Pant, "c.png").await;

        let items = service.list_items(Category::Shirt).await.unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].id, a.id);
        assert_eq!(items[0].name, "a.png");
        assert_eq!(items[0].category, Category::Shirt);
        assert_eq!(
            items[0].image_url,
            format!("{}/shirts/a.png", BASE_URL)
        );
        assert_eq!(items[1].id, b.id);
    }

    #[tokio::test]
    async fn test_list_items_respects_limit() {
        let (service, _temp) = create_test_service().await;
        let service = service.with_list_limit(2);

        for name in ["1.png", "2.png", "3.png"] {
            seed_item(&service, Category::Shoe, name).await;
        }

        let items = service.list_items(Category::Shoe).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_outfit_for_date() {
        let (service, _temp) = create_test_service().await;

        let shirt = seed_item(&service, Category::Shirt, "s.png").await;
        let pant = seed_item(&service, Category::Pant, "p.png").await;
        let shoe = seed_item(&service, Category::Shoe, "f.png").await;

        let outfit = service
            .repo
            .create_outfit(&shirt.id, &pant.id, &shoe.id)
            .await
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let noon = day.and_hms_opt(12, 30, 0).unwrap().and_utc();
        service
            .repo
            .bind_outfit_to_date(&outfit.id, noon)
            .await
            .unwrap();

        let resolved = service
            .resolve_outfit_for_date(day)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, outfit.id);
        assert!(resolved
            .shirt_image_url
            .starts_with(&format!("{}/shirts/s.png?t=", BASE_URL)));
        assert!(resolved.pant_image_url.contains("/pants/p.png?t="));
        assert!(resolved.shoe_image_url.contains("/shoes/f.png?t="));

        // The next day has nothing bound
        let next_day = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(service
            .resolve_outfit_for_date(next_day)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_albums_with_cover() {
        let (service, _temp) = create_test_service().await;

        let shirt = seed_item(&service, Category::Shirt, "s.png").await;
        let pant = seed_item(&service, Category::Pant, "p.png").await;

        let album = service.repo.create_album("Summer").await.unwrap();

        let summaries = service.list_albums_with_cover().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].cover_url.is_none());

        service
            .repo
            .add_album_item(&album.id, Some(&shirt.id), None, None)
            .await
            .unwrap();
        service
            .repo
            .add_album_item(&album.id, None, Some(&pant.id), None)
            .await
            .unwrap();

        let summaries = service.list_albums_with_cover().await.unwrap();
        assert_eq!(
            summaries[0].cover_url.as_deref(),
            Some(format!("{}/shirts/s.png", BASE_URL).as_str())
        );
    }

    #[tokio::test]
    async fn test_list_album_items_resolves_urls() {
        let (service, _temp) = create_test_service().await;

        let shoe = seed_item(&service, Category::Shoe, "f.png").await;
        let album = service.repo.create_album("Kicks").await.unwrap();
        service
            .repo
            .add_album_item(&album.id, None, None, Some(&shoe.id))
            .await
            .unwrap();

        let members = service.list_album_items(&album.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].category, Category::Shoe);
        assert_eq!(members[0].name, "f.png");
        assert_eq!(
            members[0].image_url,
            format!("{}/shoes/f.png", BASE_URL)
        );

        // Unknown album simply has no members
        assert!(service.list_album_items("ghost").await.unwrap().is_empty());
    }
}
