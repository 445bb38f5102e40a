//! Fitted core library
//!
//! Item ingestion and association for the Fitted wardrobe app: photos
//! come in from the shell's camera, backgrounds come off via the
//! cutout service, the processed images land in the blob store and the
//! catalog links them into outfits and albums.

pub mod app;
pub mod capture;
pub mod config;
pub mod database;
pub mod error;
pub mod removal;
pub mod services;
pub mod storage;
