//! Database models
//!
//! Rust structs representing catalog entities.
//! All models use serde for serialization to the frontend shell.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// Closed set of wardrobe item categories.
///
/// Every category maps to its own catalog table and storage prefix, so
/// adding a category means adding a migration, not touching call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Shirt,
    Pant,
    Shoe,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Shirt, Category::Pant, Category::Shoe];

    /// Singular tag used in APIs and the ingest ledger
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Shirt => "shirt",
            Category::Pant => "pant",
            Category::Shoe => "shoe",
        }
    }

    /// Catalog table holding items of this category
    pub fn table(&self) -> &'static str {
        match self {
            Category::Shirt => "shirts",
            Category::Pant => "pants",
            Category::Shoe => "shoes",
        }
    }

    /// Blob store prefix under which item images are uploaded
    pub fn prefix(&self) -> &'static str {
        self.table()
    }

    /// Parse a singular category tag ("shirt", "pant", "shoe")
    pub fn from_tag(tag: &str) -> Result<Category, AppError> {
        match tag {
            "shirt" => Ok(Category::Shirt),
            "pant" => Ok(Category::Pant),
            "shoe" => Ok(Category::Shoe),
            other => Err(AppError::UnknownCategory(other.to_string())),
        }
    }

    /// Parse a storage prefix ("shirts", "pants", "shoes")
    pub fn from_prefix(prefix: &str) -> Result<Category, AppError> {
        match prefix {
            "shirts" => Ok(Category::Shirt),
            "pants" => Ok(Category::Pant),
            "shoes" => Ok(Category::Shoe),
            other => Err(AppError::UnknownCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A catalogued wardrobe item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// Store path of the cutout image, e.g. "shirts/1724572800000.png"
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// An outfit: one shirt, one pant, one shoe
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Outfit {
    pub id: String,
    pub shirt_id: String,
    pub pant_id: String,
    pub shoe_id: String,
    pub created_at: DateTime<Utc>,
}

/// A binding of an outfit to a calendar day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventDate {
    pub id: String,
    pub calendar_event_id: String,
    pub event_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// An outfit joined against its item images, ready to render
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OutfitView {
    pub id: String,
    pub shirt_id: String,
    pub pant_id: String,
    pub shoe_id: String,
    pub shirt_image_url: String,
    pub pant_image_url: String,
    pub shoe_image_url: String,
    pub created_at: DateTime<Utc>,
}

/// A named collection of items
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Album membership row. Exactly one of the three item columns is set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlbumItem {
    pub id: String,
    pub album_id: String,
    pub shirt_id: Option<String>,
    pub pant_id: Option<String>,
    pub shoe_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Album membership joined against the referenced item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlbumItemView {
    pub id: String,
    pub album_id: String,
    pub item_id: String,
    pub category: Category,
    pub name: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Album summary for gallery listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    /// Image of the album's oldest member, if it has any
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an ingestion ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IngestState {
    /// Upload finished, catalog insert not yet confirmed
    Pending,
    /// Upload and catalog insert both succeeded
    Committed,
    /// Catalog insert failed; the uploaded blob needs cleanup
    Orphaned,
}

/// Ingestion ledger entry tracking an upload through to its catalog row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IngestRecord {
    pub id: String,
    /// Object id the blob store assigned, also the catalog row id
    pub item_id: String,
    pub category: Category,
    pub image_path: String,
    pub state: IngestState,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
