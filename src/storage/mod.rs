//! Storage module
//!
//! Provides path-addressed blob storage for item images.

pub mod blob_store;

pub use blob_store::{BlobStore, ObjectMeta};
