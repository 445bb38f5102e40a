//! Repository layer for database operations
//!
//! This module provides catalog operations for all entities.
//! Multi-statement writes use transactions for safety.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a catalog item directly (for testing/seed data).
    ///
    /// The ingestion pipeline goes through [`Repository::commit_item`]
    /// instead so the ledger entry flips in the same transaction.
    pub async fn create_item(
        &self,
        category: Category,
        id: &str,
        name: &str,
        image_url: &str,
    ) -> Result<Item> {
        let now = Utc::now();

        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO {} (id, name, image_url, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
            category.table()
        ))
        .bind(id)
        .bind(name)
        .bind(image_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created {} item: {}", category, id);
        Ok(item)
    }

    /// Get an item by ID
    pub async fn get_item(&self, category: Category, id: &str) -> Result<Item> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT * FROM {} WHERE id = ?
            "#,
            category.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ItemNotFound(id.to_string()))?;

        Ok(item)
    }

    /// Delete an item and return its record.
    ///
    /// Fails with a constraint violation while any outfit or album
    /// still references the item. The caller deletes the stored image
    /// only after the row is gone, never before.
    pub async fn delete_item(&self, category: Category, id: &str) -> Result<Item> {
        let item = self.get_item(category, id).await?;

        sqlx::query(&format!("DELETE FROM {} WHERE id = ?", category.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted {} item: {}", category, id);
        Ok(item)
    }

    /// Record an upload in the ingest ledger before its catalog insert.
    ///
    /// Entries start out pending. A pending entry whose blob exists but
    /// whose catalog row never lands is what reconciliation looks for.
    pub async fn record_ingest(
        &self,
        item_id: &str,
        category: Category,
        image_path: &str,
    ) -> Result<IngestRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let record = sqlx::query_as::<_, IngestRecord>(
            r#"
            INSERT INTO ingest_log (id, item_id, category, image_path, state, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(item_id)
        .bind(category)
        .bind(image_path)
        .bind(IngestState::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Recorded pending ingest: {} at {}", id, image_path);
        Ok(record)
    }

    /// Insert the catalog row and commit its ledger entry atomically
    pub async fn commit_item(
        &self,
        ingest_id: &str,
        category: Category,
        id: &str,
        name: &str,
        image_url: &str,
    ) -> Result<Item> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO {} (id, name, image_url, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
            category.table()
        ))
        .bind(id)
        .bind(name)
        .bind(image_url)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE ingest_log SET state = ?, resolved_at = ? WHERE id = ?")
            .bind(IngestState::Committed)
            .bind(now)
            .bind(ingest_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Committed {} item: {}", category, id);
        Ok(item)
    }

    /// Mark a ledger entry orphaned, recording why the insert failed
    pub async fn mark_ingest_orphaned(&self, ingest_id: &str, detail: &str) -> Result<()> {
        let now = Utc::now();

        let rows = sqlx::query(
            "UPDATE ingest_log SET state = ?, detail = ?, resolved_at = ? WHERE id = ?",
        )
        .bind(IngestState::Orphaned)
        .bind(detail)
        .bind(now)
        .bind(ingest_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::ItemNotFound(ingest_id.to_string()));
        }

        tracing::warn!("Marked ingest orphaned: {} ({})", ingest_id, detail);
        Ok(())
    }

    /// List ledger entries that never reached a committed catalog row
    pub async fn list_unreconciled(&self) -> Result<Vec<IngestRecord>> {
        let records = sqlx::query_as::<_, IngestRecord>(
            r#"
            SELECT * FROM ingest_log
            WHERE state != ?
            ORDER BY datetime(created_at) ASC, rowid ASC
            "#,
        )
        .bind(IngestState::Committed)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Create an outfit from one item of each category
    pub async fn create_outfit(
        &self,
        shirt_id: &str,
        pant_id: &str,
        shoe_id: &str,
    ) -> Result<Outfit> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let outfit = sqlx::query_as::<_, Outfit>(
            r#"
            INSERT INTO calendar_events (id, shirt_id, pant_id, shoe_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(shirt_id)
        .bind(pant_id)
        .bind(shoe_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created outfit: {}", id);
        Ok(outfit)
    }

    /// Bind an outfit to a calendar day
    pub async fn bind_outfit_to_date(
        &self,
        calendar_event_id: &str,
        event_date: DateTime<Utc>,
    ) -> Result<EventDate> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let binding = sqlx::query_as::<_, EventDate>(
            r#"
            INSERT INTO event_dates (id, calendar_event_id, event_date, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(calendar_event_id)
        .bind(event_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Bound outfit {} to date: {}", calendar_event_id, event_date);
        Ok(binding)
    }

    /// Find the outfit bound inside a half-open time range.
    ///
    /// When several bindings land in the range, the newest one wins;
    /// insertion order breaks ties between same-instant bindings.
    pub async fn find_outfit_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<OutfitView>> {
        let outfit = sqlx::query_as::<_, OutfitView>(
            r#"
            SELECT
                ce.id,
                ce.shirt_id,
                ce.pant_id,
                ce.shoe_id,
                sh.image_url AS shirt_image_url,
                pa.image_url AS pant_image_url,
                so.image_url AS shoe_image_url,
                ce.created_at
            FROM event_dates ed
            JOIN calendar_events ce ON ce.id = ed.calendar_event_id
            JOIN shirts sh ON sh.id = ce.shirt_id
            JOIN pants pa ON pa.id = ce.pant_id
            JOIN shoes so ON so.id = ce.shoe_id
            WHERE datetime(ed.event_date) >= datetime(?)
              AND datetime(ed.event_date) < datetime(?)
            ORDER BY datetime(ed.created_at) DESC, ed.rowid DESC
            LIMIT 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await?;

        Ok(outfit)
    }

    /// Create an album
    pub async fn create_album(&self, name: &str) -> Result<Album> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let album = sqlx::query_as::<_, Album>(
            r#"
            INSERT INTO albums (id, name, created_at)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created album: {} ({})", id, name);
        Ok(album)
    }

    /// List all albums, newest first
    pub async fn list_albums(&self) -> Result<Vec<Album>> {
        let albums = sqlx::query_as::<_, Album>(
            r#"
            SELECT * FROM albums
            ORDER BY datetime(created_at) DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(albums)
    }

    /// Insert an album membership row.
    ///
    /// Callers set exactly one of the three item references; the
    /// schema CHECK rejects anything else.
    pub async fn add_album_item(
        &self,
        album_id: &str,
        shirt_id: Option<&str>,
        pant_id: Option<&str>,
        shoe_id: Option<&str>,
    ) -> Result<AlbumItem> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let row = sqlx::query_as::<_, AlbumItem>(
            r#"
            INSERT INTO album_items (id, album_id, shirt_id, pant_id, shoe_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(album_id)
        .bind(shirt_id)
        .bind(pant_id)
        .bind(shoe_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Added membership {} to album {}", id, album_id);
        Ok(row)
    }

    /// Image of an album's oldest member, used as the gallery cover
    pub async fn album_cover(&self, album_id: &str) -> Result<Option<String>> {
        let cover = sqlx::query_scalar::<_, String>(
            r#"
            SELECT COALESCE(sh.image_url, pa.image_url, so.image_url)
            FROM album_items ai
            LEFT JOIN shirts sh ON sh.id = ai.shirt_id
            LEFT JOIN pants pa ON pa.id = ai.pant_id
            LEFT JOIN shoes so ON so.id = ai.shoe_id
            WHERE ai.album_id = ?
            ORDER BY datetime(ai.created_at) ASC, ai.rowid ASC
            LIMIT 1
            "#,
        )
        .bind(album_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cover)
    }

    /// List an album's members joined against their item records
    pub async fn list_album_items(&self, album_id: &str) -> Result<Vec<AlbumItemView>> {
        let items = sqlx::query_as::<_, AlbumItemView>(
            r#"
            SELECT
                ai.id,
                ai.album_id,
                COALESCE(ai.shirt_id, ai.pant_id, ai.shoe_id) AS item_id,
                CASE
                    WHEN ai.shirt_id IS NOT NULL THEN 'shirt'
                    WHEN ai.pant_id IS NOT NULL THEN 'pant'
                    ELSE 'shoe'
                END AS category,
                COALESCE(sh.name, pa.name, so.name) AS name,
                COALESCE(sh.image_url, pa.image_url, so.image_url) AS image_url,
                ai.created_at
            FROM album_items ai
            LEFT JOIN shirts sh ON sh.id = ai.shirt_id
            LEFT JOIN pants pa ON pa.id = ai.pant_id
            LEFT JOIN shoes so ON so.id = ai.shoe_id
            WHERE ai.album_id = ?
            ORDER BY datetime(ai.created_at) ASC, ai.rowid ASC
            "#,
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
