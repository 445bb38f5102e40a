//! Background-removal service client
//!
//! The cutout service takes a multipart form with the photo under the
//! "image" field, base64-encoded, and answers with JSON
//! `{"status": "...", "image": "<base64 PNG>", "message": "..."}`.
//! A status other than "success" is a failure no matter what HTTP
//! status code came with it.

use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;

use crate::config::{DEFAULT_REMOVAL_TIMEOUT_SECS, REMOVAL_IMAGE_FIELD};
use crate::error::{AppError, Result};

/// Strips a photo's background, returning a transparent PNG
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Submit a base64-encoded photo; get the processed PNG bytes back
    async fn remove_background(&self, image_base64: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct RemovalResponse {
    status: String,
    image: Option<String>,
    message: Option<String>,
}

/// HTTP client for the cutout service
pub struct HttpRemover {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemover {
    pub fn new(endpoint: String) -> Result<Self> {
        Self::with_timeout(endpoint, Duration::from_secs(DEFAULT_REMOVAL_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ServiceError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl BackgroundRemover for HttpRemover {
    async fn remove_background(&self, image_base64: &str) -> Result<Vec<u8>> {
        let part = multipart::Part::text(image_base64.to_string())
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| AppError::ServiceError(format!("Invalid multipart part: {}", e)))?;
        let form = multipart::Form::new().part(REMOVAL_IMAGE_FIELD, part);

        tracing::debug!("Sending photo to cutout service: {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let http_status = response.status();
        let body: RemovalResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Err(AppError::Timeout(format!("background removal: {}", e)))
            }
            Err(e) => {
                return Err(AppError::ServiceError(format!(
                    "Unreadable response (HTTP {}): {}",
                    http_status, e
                )))
            }
        };

        let bytes = extract_image(body)?;
        tracing::debug!("Cutout service returned {} bytes", bytes.len());
        Ok(bytes)
    }
}

fn classify_transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(format!("background removal: {}", e))
    } else {
        AppError::ServiceError(format!("Request failed: {}", e))
    }
}

/// Turn the service's JSON body into processed image bytes.
///
/// The status field alone decides success; the service reports its
/// own failures through it even when the HTTP layer says 200.
fn extract_image(body: RemovalResponse) -> Result<Vec<u8>> {
    if body.status != "success" {
        let message = body
            .message
            .unwrap_or_else(|| format!("status {}", body.status));
        return Err(AppError::ServiceError(message));
    }

    let image = body
        .image
        .ok_or_else(|| AppError::ServiceError("Response missing image".to_string()))?;

    base64::engine::general_purpose::STANDARD
        .decode(image.as_bytes())
        .map_err(|e| AppError::ServiceError(format!("Undecodable image payload: {}", e)))
}

enum MockRemovalOutcome {
    Succeed(Vec<u8>),
    Fail(String),
    TimeOut,
}

/// Canned cutout results for tests. No network involved.
pub struct MockRemover {
    outcome: MockRemovalOutcome,
}

impl MockRemover {
    /// Always succeeds with the given processed bytes
    pub fn returning(bytes: Vec<u8>) -> Self {
        Self {
            outcome: MockRemovalOutcome::Succeed(bytes),
        }
    }

    /// Simulates the service reporting a failure
    pub fn failing(message: &str) -> Self {
        Self {
            outcome: MockRemovalOutcome::Fail(message.to_string()),
        }
    }

    /// Simulates the request timing out
    pub fn timing_out() -> Self {
        Self {
            outcome: MockRemovalOutcome::TimeOut,
        }
    }
}

#[async_trait]
impl BackgroundRemover for MockRemover {
    async fn remove_background(&self, _image_base64: &str) -> Result<Vec<u8>> {
        match &self.outcome {
            MockRemovalOutcome::Succeed(bytes) => Ok(bytes.clone()),
            MockRemovalOutcome::Fail(message) => {
                Err(AppError::ServiceError(message.clone()))
            }
            MockRemovalOutcome::TimeOut => {
                Err(AppError::Timeout("background removal".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_extract_image_success() {
        let body = RemovalResponse {
            status: "success".to_string(),
            image: Some(encode(b"cutout png")),
            message: None,
        };

        let bytes = extract_image(body).unwrap();
        assert_eq!(bytes, b"cutout png");
    }

    #[test]
    fn test_extract_image_error_status_wins() {
        let body = RemovalResponse {
            status: "error".to_string(),
            image: Some(encode(b"ignored")),
            message: Some("No image provided".to_string()),
        };

        let err = extract_image(body).unwrap_err();
        assert!(matches!(err, AppError::ServiceError(ref m) if m == "No image provided"));
    }

    #[test]
    fn test_extract_image_error_without_message() {
        let body = RemovalResponse {
            status: "busy".to_string(),
            image: None,
            message: None,
        };

        let err = extract_image(body).unwrap_err();
        assert!(matches!(err, AppError::ServiceError(ref m) if m == "status busy"));
    }

    #[test]
    fn test_extract_image_missing_payload() {
        let body = RemovalResponse {
            status: "success".to_string(),
            image: None,
            message: None,
        };

        assert!(extract_image(body).is_err());
    }

    #[test]
    fn test_extract_image_bad_base64() {
        let body = RemovalResponse {
            status: "success".to_string(),
            image: Some("not base64!!!".to_string()),
            message: None,
        };

        assert!(extract_image(body).is_err());
    }

    #[test]
    fn test_response_shape_parses() {
        let body: RemovalResponse =
            serde_json::from_str(r#"{"status": "success", "image": "aGVsbG8="}"#).unwrap();
        assert_eq!(body.status, "success");
        assert!(body.message.is_none());

        let failure: RemovalResponse =
            serde_json::from_str(r#"{"status": "error", "message": "boom"}"#).unwrap();
        assert_eq!(failure.message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_mock_outcomes() {
        let ok = MockRemover::returning(b"png".to_vec())
            .remove_background("aGVsbG8=")
            .await
            .unwrap();
        assert_eq!(ok, b"png");

        let failed = MockRemover::failing("model crashed")
            .remove_background("aGVsbG8=")
            .await
            .unwrap_err();
        assert!(matches!(failed, AppError::ServiceError(_)));

        let timed_out = MockRemover::timing_out()
            .remove_background("aGVsbG8=")
            .await
            .unwrap_err();
        assert!(matches!(timed_out, AppError::Timeout(_)));
    }

    #[test]
    fn test_http_remover_builds() {
        assert!(HttpRemover::new("http://127.0.0.1:5000/remove-background".to_string()).is_ok());
    }
}
