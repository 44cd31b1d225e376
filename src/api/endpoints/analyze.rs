//! Analysis endpoint: captured frame → observation field suggestion.
//!
//! `POST /api/analyze` receives one base64 image (raw or data URL),
//! runs the extraction pipeline on a blocking thread, and returns the
//! suggestion together with the fields the entry form may auto-populate.

use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{AnalysisSuggestion, AutoPopulateFields};

/// Maximum decoded image size (10 MB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 data URL (e.g., `data:image/jpeg;base64,/9j/...`) or bare base64.
    pub image: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub suggestion: AnalysisSuggestion,
    pub auto_populate: AutoPopulateFields,
}

/// `POST /api/analyze`: analyze one captured frame.
///
/// Request problems are 4xx. Analysis problems (AI disabled, timeout,
/// model failure) are a 200 with `suggestion.success == false`.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let bytes = decode_data_url(&payload.image).map_err(ApiError::BadRequest)?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Empty image".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "Image is {} bytes, maximum is {} bytes",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    let format = detect_image_format(&bytes)
        .ok_or_else(|| ApiError::BadRequest("Unsupported image format".into()))?;
    tracing::debug!(format, size = bytes.len(), "Analyze request");

    let orchestrator = ctx.orchestrator.clone();
    let settings = ctx.settings.clone();
    let suggestion =
        tokio::task::spawn_blocking(move || orchestrator.analyze(&bytes, &settings)).await?;

    let auto_populate = suggestion.auto_populate(&ctx.settings);
    Ok(Json(AnalyzeResponse {
        suggestion,
        auto_populate,
    }))
}

/// Decode a base64 data URL (or bare base64 string) to bytes.
fn decode_data_url(data_url: &str) -> Result<Vec<u8>, String> {
    let base64_data = match data_url.find(',') {
        Some(idx) => &data_url[idx + 1..],
        None => data_url,
    };

    base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))
}

/// Detect a supported raster format from magic bytes.
fn detect_image_format(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 3 && bytes[0..3] == [0xFF, 0xD8, 0xFF] {
        Some("jpeg")
    } else if bytes.len() >= 8 && bytes[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
    {
        Some("png")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else if bytes.len() >= 4 && (&bytes[0..4] == b"II*\0" || &bytes[0..4] == b"MM\0*") {
        Some("tiff")
    } else if bytes.len() >= 2 && &bytes[0..2] == b"BM" {
        Some("bmp")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_data_url_jpeg() {
        let data = "data:image/jpeg;base64,/9j/4AAQ";
        let bytes = decode_data_url(data).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(bytes[0], 0xFF); // JPEG magic byte
    }

    #[test]
    fn decode_data_url_raw_base64() {
        let raw = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let bytes = decode_data_url(&raw).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn decode_data_url_invalid_base64() {
        let result = decode_data_url("not-valid-base64!!!");
        assert!(result.is_err());
    }

    #[test]
    fn detect_supported_formats() {
        assert_eq!(detect_image_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("jpeg"));
        assert_eq!(
            detect_image_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("png")
        );
        assert_eq!(detect_image_format(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
        assert_eq!(detect_image_format(b"II*\0\x08\0\0\0"), Some("tiff"));
        assert_eq!(detect_image_format(b"MM\0*\0\0\0\x08"), Some("tiff"));
        assert_eq!(detect_image_format(b"BM\x36\0\0\0"), Some("bmp"));
    }

    #[test]
    fn detect_rejects_non_raster() {
        assert_eq!(detect_image_format(b"%PDF-1.4"), None);
        assert_eq!(detect_image_format(b"hello world"), None);
        assert_eq!(detect_image_format(&[]), None);
    }
}
