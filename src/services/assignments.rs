//! Assignment service
//!
//! Outfit and album writes. Selections are validated before any row
//! is inserted, so partial outfits and dangling references never land
//! in the catalog.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::database::{Album, AlbumItem, Category, EventDate, Outfit, Repository};
use crate::error::{AppError, Result};

/// Item ids picked for an outfit, one per category.
/// Mirrors the builder screen, where slots fill one at a time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutfitSelection {
    pub shirt_id: Option<String>,
    pub pant_id: Option<String>,
    pub shoe_id: Option<String>,
}

/// Reference to one catalog item
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRef {
    pub category: Category,
    pub item_id: String,
}

impl ItemRef {
    pub fn new(category: Category, item_id: impl Into<String>) -> Self {
        Self {
            category,
            item_id: item_id.into(),
        }
    }

    /// String boundary for shell calls; unknown tags fail here
    pub fn from_tag(tag: &str, item_id: &str) -> Result<Self> {
        Ok(Self {
            category: Category::from_tag(tag)?,
            item_id: item_id.to_string(),
        })
    }
}

/// Service for outfit and album writes
#[derive(Clone)]
pub struct AssignmentService {
    repo: Repository,
}

impl AssignmentService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create an outfit from a full selection.
    ///
    /// All three slots must be filled; each id must resolve to an item
    /// of the matching category or the insert is rejected whole.
    pub async fn create_outfit(&self, selection: OutfitSelection) -> Result<Outfit> {
        let (Some(shirt_id), Some(pant_id), Some(shoe_id)) =
            (selection.shirt_id, selection.pant_id, selection.shoe_id)
        else {
            return Err(AppError::IncompleteSelection);
        };

        let outfit = self.repo.create_outfit(&shirt_id, &pant_id, &shoe_id).await?;

        tracing::info!("Created outfit: {}", outfit.id);
        Ok(outfit)
    }

    /// Attach an outfit to a calendar day.
    ///
    /// The same day may receive any number of bindings; readers pick
    /// the newest one.
    pub async fn bind_outfit_to_date(
        &self,
        outfit_id: &str,
        at: DateTime<Utc>,
    ) -> Result<EventDate> {
        let binding = self.repo.bind_outfit_to_date(outfit_id, at).await?;

        tracing::info!("Bound outfit {} to {}", outfit_id, at);
        Ok(binding)
    }

    /// Create a named album
    pub async fn create_album(&self, name: &str) -> Result<Album> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::EmptyName);
        }

        self.repo.create_album(name).await
    }

    /// Add one item to an album. Duplicates are allowed.
    ///
    /// The category picks which reference column is filled; the other
    /// two stay NULL and the schema CHECK holds the one-of-three shape.
    pub async fn add_item_to_album(&self, album_id: &str, item: ItemRef) -> Result<AlbumItem> {
        let item_id = item.item_id.as_str();
        let (shirt_id, pant_id, shoe_id) = match item.category {
            Category::Shirt => (Some(item_id), None, None),
            Category::Pant => (None, Some(item_id), None),
            Category::Shoe => (None, None, Some(item_id)),
        };

        self.repo
            .add_album_item(album_id, shirt_id, pant_id, shoe_id)
            .await
    }
}
