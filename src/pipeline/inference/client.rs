//! Remote vision model client: object detection + OCR in one round trip.
//!
//! The request is `POST {endpoint}` with `{"image": <base64>}` and a bearer
//! API key. The call is blocking and bounded by a hard timeout; on expiry
//! reqwest abandons the in-flight request and `InferenceError::Timeout` is
//! returned. No retries happen here.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

use super::types::RawModelOutput;
use super::InferenceError;
use crate::config;

/// Inference abstraction (allows mocking for tests).
pub trait InferenceClient: Send + Sync {
    fn infer(&self, image_bytes: &[u8], api_key: &str) -> Result<RawModelOutput, InferenceError>;
}

#[derive(Serialize)]
struct InferRequest {
    image: String,
}

/// Production client backed by an HTTPS inference endpoint.
pub struct HttpInferenceClient {
    endpoint: String,
    timeout: Duration,
}

impl HttpInferenceClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim().to_string(),
            timeout: Duration::from_secs(config::INFERENCE_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_transport_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_timeout() {
            InferenceError::Timeout(self.timeout)
        } else if e.is_connect() {
            InferenceError::Failed(format!("cannot reach {}: {e}", self.endpoint))
        } else {
            InferenceError::Failed(e.to_string())
        }
    }
}

impl InferenceClient for HttpInferenceClient {
    fn infer(&self, image_bytes: &[u8], api_key: &str) -> Result<RawModelOutput, InferenceError> {
        let _span = tracing::info_span!(
            "vision_inference",
            endpoint = %self.endpoint,
            image_size = image_bytes.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        // Built per call: a blocking client must not be created or dropped
        // on an async runtime thread, and callers reach us from both sides.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| InferenceError::Failed(format!("HTTP client setup: {e}")))?;

        let body = InferRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image_bytes),
        };

        let response = client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Failed(format!(
                "model endpoint returned HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let parsed: Value = response.json().map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout(self.timeout)
            } else {
                InferenceError::Failed(format!("malformed response body: {e}"))
            }
        })?;

        let output = RawModelOutput::from_value(&parsed)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            detections = output.detections.len(),
            texts = output.texts.len(),
            has_extracted_distance = output.extracted_distance.is_some(),
            "Vision inference complete"
        );

        Ok(output)
    }
}

/// Mock inference client for testing.
///
/// Returns a configured output or error and counts invocations.
pub struct MockInferenceClient {
    response: Result<RawModelOutput, InferenceError>,
    calls: AtomicUsize,
}

impl MockInferenceClient {
    pub fn new(output: RawModelOutput) -> Self {
        Self {
            response: Ok(output),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: InferenceError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceClient for MockInferenceClient {
    fn infer(&self, _image_bytes: &[u8], _api_key: &str) -> Result<RawModelOutput, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}
