//! Services module
//!
//! Business logic services that coordinate between the shell-facing
//! API and the stores.

pub mod assignments;
pub mod catalog;
pub mod ingest;

pub use assignments::AssignmentService;
pub use catalog::CatalogService;
pub use ingest::IngestService;
