//! Capture boundary
//!
//! The camera lives in the UI shell; the core only sees its output. A
//! capture source hands over the photo as base64 together with the
//! file name the shell assigned (unix millis plus ".png" in practice).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::MAX_CAPTURE_BYTES;
use crate::error::{AppError, Result};

/// A captured photo, ready for the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    /// File name the shell assigned, e.g. "1724572800000.png"
    pub file_name: String,
    /// Base64-encoded photo, with or without a data-URI prefix
    pub image_base64: String,
}

impl Capture {
    pub fn new(file_name: impl Into<String>, image_base64: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            image_base64: image_base64.into(),
        }
    }

    /// Base64 payload with any data-URI prefix stripped
    pub fn payload(&self) -> &str {
        match self.image_base64.split_once("base64,") {
            Some((_, payload)) => payload,
            None => &self.image_base64,
        }
    }

    /// Reject captures the pipeline cannot ingest.
    ///
    /// The decoded size is estimated from the base64 length, so an
    /// oversized photo is turned away without decoding it.
    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(AppError::EmptyName);
        }
        if self.file_name.contains('/') || self.file_name.contains('\\') {
            return Err(AppError::ServiceError(format!(
                "Capture file name must be bare: {}",
                self.file_name
            )));
        }

        let payload = self.payload();
        if payload.is_empty() {
            return Err(AppError::ServiceError("Empty capture payload".to_string()));
        }
        if payload.len() / 4 * 3 > MAX_CAPTURE_BYTES {
            return Err(AppError::ServiceError(format!(
                "Capture exceeds {} bytes",
                MAX_CAPTURE_BYTES
            )));
        }

        Ok(())
    }
}

/// Source of captured photos.
///
/// The real implementation wraps the shell's camera module and fails
/// with `PermissionDenied` when camera access is refused or
/// `Cancelled` when the user backs out of the capture screen.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn capture(&self) -> Result<Capture>;
}

enum MockOutcome {
    Produce(Capture),
    PermissionDenied,
    Cancelled,
}

/// Deterministic capture source for tests and headless tooling
pub struct MockCapture {
    outcome: MockOutcome,
}

impl MockCapture {
    /// Always produces the given capture
    pub fn returning(capture: Capture) -> Self {
        Self {
            outcome: MockOutcome::Produce(capture),
        }
    }

    /// Simulates the shell refusing camera access
    pub fn permission_denied() -> Self {
        Self {
            outcome: MockOutcome::PermissionDenied,
        }
    }

    /// Simulates the user backing out of the capture screen
    pub fn cancelled() -> Self {
        Self {
            outcome: MockOutcome::Cancelled,
        }
    }
}

#[async_trait]
impl CaptureSource for MockCapture {
    async fn capture(&self) -> Result<Capture> {
        match &self.outcome {
            MockOutcome::Produce(capture) => Ok(capture.clone()),
            MockOutcome::PermissionDenied => Err(AppError::PermissionDenied),
            MockOutcome::Cancelled => Err(AppError::Cancelled),
        }
    }
}
