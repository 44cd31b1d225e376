use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use super::selection::{candidate_from_model_distance, filter_noise, merge_candidates, select_best};
use super::AnalysisError;
use crate::models::{AiSettings, AnalysisSuggestion, Predictions};
use crate::pipeline::distance::extract_distances;
use crate::pipeline::inference::{DetectedObject, InferenceClient, OcrFragment, RawModelOutput};
use crate::pipeline::object_code::ObjectCodeResolver;

/// Public entry point of the extraction pipeline.
///
/// Stateless between calls; concurrent `analyze` calls share nothing but
/// the client and the read-only mapping store.
pub struct AnalysisOrchestrator {
    client: Arc<dyn InferenceClient>,
    resolver: ObjectCodeResolver,
}

impl AnalysisOrchestrator {
    pub fn new(client: Arc<dyn InferenceClient>, resolver: ObjectCodeResolver) -> Self {
        Self { client, resolver }
    }

    /// Analyze one image. Never fails: every error becomes a
    /// `success: false` suggestion.
    pub fn analyze(&self, image: &[u8], settings: &AiSettings) -> AnalysisSuggestion {
        let _span = tracing::info_span!("analyze", image_bytes = image.len()).entered();
        let start = Instant::now();

        match self.run(image, settings) {
            Ok(suggestion) => {
                tracing::info!(
                    distance = ?suggestion.distance,
                    observation_code = ?suggestion.observation_code,
                    confidence = suggestion.confidence,
                    candidates = suggestion.predictions.as_ref().map_or(0, |p| p.distances.len()),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Analysis complete"
                );
                suggestion
            }
            Err(e) => {
                tracing::warn!(
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Analysis failed"
                );
                AnalysisSuggestion::failed(&e)
            }
        }
    }

    fn run(
        &self,
        image: &[u8],
        settings: &AiSettings,
    ) -> Result<AnalysisSuggestion, AnalysisError> {
        if !settings.enabled {
            return Err(AnalysisError::Configuration("AI analysis is disabled".into()));
        }
        let api_key = settings
            .api_key()
            .ok_or_else(|| AnalysisError::Configuration("no API key configured".into()))?;

        let output = self.client.infer(image, api_key)?;
        let frame_height = resolve_frame_height(&output, image);

        let model_candidate = output
            .extracted_distance
            .as_deref()
            .and_then(candidate_from_model_distance);
        let extracted = extract_distances(&output.texts, frame_height);
        let distances = filter_noise(merge_candidates(model_candidate, extracted));
        let distance = select_best(&distances).map(|c| c.value);

        let observation_code =
            best_object(&output.detections).and_then(|obj| self.resolver.resolve(&obj.class_name));

        Ok(AnalysisSuggestion {
            success: true,
            distance,
            observation_code,
            confidence: overall_confidence(&output.detections, &output.texts),
            error: None,
            error_kind: None,
            predictions: Some(Predictions {
                objects: output.detections,
                text: output.texts,
                distances,
            }),
        })
    }
}

/// Highest-confidence detection; ties keep the first.
fn best_object(detections: &[DetectedObject]) -> Option<&DetectedObject> {
    detections
        .iter()
        .reduce(|best, next| if next.confidence > best.confidence { next } else { best })
}

/// Mean of every object and text confidence; 0 when nothing was seen.
pub fn overall_confidence(objects: &[DetectedObject], texts: &[OcrFragment]) -> f32 {
    let count = objects.len() + texts.len();
    if count == 0 {
        return 0.0;
    }
    let sum: f32 = objects.iter().map(|o| o.confidence).sum::<f32>()
        + texts.iter().map(|t| t.confidence).sum::<f32>();
    sum / count as f32
}

/// Frame height for positional scoring: the model's echo first, else the
/// decoded image. Only decodes when some box is in pixel coordinates.
fn resolve_frame_height(output: &RawModelOutput, image: &[u8]) -> Option<f64> {
    if let Some(frame) = output.frame.filter(|f| f.height > 0.0) {
        return Some(frame.height);
    }
    let needs_pixels = output
        .texts
        .iter()
        .filter_map(|t| t.bounding_box.as_ref())
        .any(|b| !b.is_normalized());
    if !needs_pixels {
        return None;
    }
    // Header only; the pixel data is never decoded.
    let dimensions = image::io::Reader::new(Cursor::new(image))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.into_dimensions());
    match dimensions {
        Ok((_, height)) => Some(f64::from(height)),
        Err(e) => {
            tracing::debug!(error = %e, "Cannot read frame size, boxes get no position");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::pipeline::inference::{BoundingBox, FrameSize, InferenceError, MockInferenceClient};
    use crate::pipeline::object_code::InMemoryMappingStore;

    fn settings() -> AiSettings {
        AiSettings {
            enabled: true,
            api_key: Some("test-key".into()),
            ..AiSettings::default()
        }
    }

    fn orchestrator(client: Arc<MockInferenceClient>) -> AnalysisOrchestrator {
        let store = InMemoryMappingStore::new().with("root", "R");
        AnalysisOrchestrator::new(client, ObjectCodeResolver::new(Box::new(store)))
    }

    fn analyze_output(output: RawModelOutput) -> AnalysisSuggestion {
        orchestrator(Arc::new(MockInferenceClient::new(output))).analyze(b"img", &settings())
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut bytes, image::ImageOutputFormat::Png).unwrap();
        bytes
    }

    fn top_box() -> BoundingBox {
        BoundingBox::Flat([0.05, 0.0, 0.3, 0.04])
    }

    #[test]
    fn inspection_overlay_suggests_distance() {
        let output = RawModelOutput {
            texts: vec![OcrFragment::new("002.34m", 0.95).with_bbox(top_box())],
            ..RawModelOutput::default()
        };
        let client = Arc::new(MockInferenceClient::new(output));
        let s = orchestrator(client.clone()).analyze(b"img", &settings());

        assert!(s.success);
        assert_eq!(s.distance, Some(2.34));
        assert!((s.confidence - 0.95).abs() < 1e-6);
        let predictions = s.predictions.unwrap();
        assert_eq!(predictions.distances.len(), 1);
        assert_eq!(predictions.distances[0].details.pattern_name, "inspection_format_decimal");
        assert!(predictions.distances[0].confidence > 0.9);
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn timestamp_only_yields_no_distance() {
        let output = RawModelOutput {
            texts: vec![OcrFragment::new("00:12", 0.9)],
            ..RawModelOutput::default()
        };
        let s = analyze_output(output);
        assert!(s.success);
        assert_eq!(s.distance, None);
        assert!(s.predictions.unwrap().distances.is_empty());
    }

    #[test]
    fn disabled_makes_no_call() {
        let client = Arc::new(MockInferenceClient::new(RawModelOutput::default()));
        let mut cfg = settings();
        cfg.enabled = false;
        let s = orchestrator(client.clone()).analyze(b"img", &cfg);
        assert!(!s.success);
        assert_eq!(s.error_kind.as_deref(), Some("configuration"));
        assert!(s.error.unwrap().contains("disabled"));
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn missing_key_makes_no_call() {
        let client = Arc::new(MockInferenceClient::new(RawModelOutput::default()));
        let mut cfg = settings();
        cfg.api_key = Some("   ".into());
        let s = orchestrator(client.clone()).analyze(b"img", &cfg);
        assert_eq!(s.error_kind.as_deref(), Some("configuration"));
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn timeout_is_distinct() {
        let timeout_error = InferenceError::Timeout(Duration::from_secs(10));
        let timeout = orchestrator(Arc::new(MockInferenceClient::failing(timeout_error)))
            .analyze(b"img", &settings());
        let failed = orchestrator(Arc::new(MockInferenceClient::failing(InferenceError::Failed(
            "HTTP 401".into(),
        ))))
        .analyze(b"img", &settings());

        assert!(!timeout.success);
        assert_eq!(timeout.error_kind.as_deref(), Some("timeout"));
        assert_eq!(failed.error_kind.as_deref(), Some("inference_failed"));
        assert_ne!(timeout.error, failed.error);
        assert_eq!(timeout.distance, None);
        assert_eq!(timeout.confidence, 0.0);
    }

    #[test]
    fn best_object_resolved_case_insensitively() {
        let output = RawModelOutput {
            detections: vec![
                DetectedObject {
                    class_name: "crack".into(),
                    confidence: 0.4,
                    bounding_box: None,
                },
                DetectedObject {
                    class_name: "ROOT".into(),
                    confidence: 0.8,
                    bounding_box: None,
                },
            ],
            ..RawModelOutput::default()
        };
        let s = analyze_output(output);
        assert_eq!(s.observation_code.as_deref(), Some("R"));
        assert!((s.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn unmapped_object_yields_no_code() {
        let output = RawModelOutput {
            detections: vec![DetectedObject {
                class_name: "deformation".into(),
                confidence: 0.9,
                bounding_box: None,
            }],
            ..RawModelOutput::default()
        };
        let s = analyze_output(output);
        assert!(s.success);
        assert_eq!(s.observation_code, None);
    }

    #[test]
    fn model_distance_is_one_more_candidate() {
        let output = RawModelOutput {
            texts: vec![OcrFragment::new("12.50M", 0.9).with_bbox(top_box())],
            extracted_distance: Some("7".into()),
            ..RawModelOutput::default()
        };
        let s = analyze_output(output);
        assert_eq!(s.distance, Some(12.5));
        assert_eq!(s.predictions.unwrap().distances.len(), 1);
    }

    #[test]
    fn model_distance_used_without_ocr() {
        let output = RawModelOutput {
            extracted_distance: Some("3.20".into()),
            ..RawModelOutput::default()
        };
        let s = analyze_output(output);
        assert_eq!(s.distance, Some(3.2));
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn mid_frame_noise_dropped() {
        let output = RawModelOutput {
            texts: vec![
                OcrFragment::new("002.34m", 0.95).with_bbox(top_box()),
                OcrFragment::new("150", 0.6).with_bbox(BoundingBox::Flat([0.4, 0.45, 0.5, 0.55])),
            ],
            ..RawModelOutput::default()
        };
        let s = analyze_output(output);
        let distances = s.predictions.unwrap().distances;
        assert_eq!(distances.len(), 1);
        assert_eq!(distances[0].value, 2.34);
    }

    #[test]
    fn pixel_boxes_use_image_header_height() {
        let pixel_box = BoundingBox::Flat([10.0, 2.0, 100.0, 20.0]);
        let output = RawModelOutput {
            texts: vec![OcrFragment::new("002.34m", 0.9).with_bbox(pixel_box)],
            ..RawModelOutput::default()
        };
        let orch = orchestrator(Arc::new(MockInferenceClient::new(output)));

        let with_image = orch.analyze(&png(200, 200), &settings());
        let scored = &with_image.predictions.unwrap().distances[0];
        assert!(scored.details.position_score > 0.75);

        let undecodable = orch.analyze(b"not an image", &settings());
        let unscored = &undecodable.predictions.unwrap().distances[0];
        assert!((unscored.details.position_score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn response_frame_size_takes_priority() {
        let output = RawModelOutput {
            texts: vec![OcrFragment::new("002.34m", 0.9)
                .with_bbox(BoundingBox::Flat([10.0, 990.0, 100.0, 1000.0]))],
            frame: Some(FrameSize { width: 1000.0, height: 1000.0 }),
            ..RawModelOutput::default()
        };
        let s = orchestrator(Arc::new(MockInferenceClient::new(output)))
            .analyze(&png(10, 10), &settings());
        let c = &s.predictions.unwrap().distances[0];
        assert!(c.details.position_score > 0.8);
    }

    #[test]
    fn unscored_text_stays_out_of_the_mean() {
        let body = json!({
            "detections": [{"class": "root", "confidence": 0.8}],
            "ocr": {"texts": [{"text": "002.34m", "bbox": [0.05, 0.0, 0.3, 0.04]}]}
        });
        let output = RawModelOutput::from_value(&body).unwrap();
        let s = analyze_output(output);
        assert!(s.success);
        assert_eq!(s.observation_code.as_deref(), Some("R"));
        assert!((s.confidence - 0.8).abs() < 1e-6);
        assert_eq!(s.distance, None);
    }

    #[test]
    fn overall_confidence_of_nothing_is_zero() {
        assert_eq!(overall_confidence(&[], &[]), 0.0);
    }
}
