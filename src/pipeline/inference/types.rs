use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InferenceError;

/// Bounding box as reported by the vision model.
///
/// The model emits three shapes: a flat `[x1, y1, x2, y2]`, a list of
/// `[x, y]` corners, or `{ "points": [[x, y], ...] }`. The last two are
/// normalized to `Points` at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundingBox {
    Flat([f64; 4]),
    Points(Vec<[f64; 2]>),
}

impl BoundingBox {
    /// Parse any of the supported shapes. Returns `None` for anything else.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_number) => {
                let n: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
                match n.len() {
                    4 => Some(Self::Flat([n[0], n[1], n[2], n[3]])),
                    // Flattened quad or polygon: x1, y1, x2, y2, ...
                    len if len > 4 && len % 2 == 0 => Some(Self::Points(
                        n.chunks_exact(2).map(|c| [c[0], c[1]]).collect(),
                    )),
                    _ => None,
                }
            }
            Value::Array(items) => parse_points(items).map(Self::Points),
            Value::Object(map) => map
                .get("points")
                .and_then(Value::as_array)
                .and_then(|items| parse_points(items))
                .map(Self::Points),
            _ => None,
        }
    }

    /// Average (x, y) of the box. `None` when there are no points.
    pub fn to_centroid(&self) -> Option<(f64, f64)> {
        match self {
            Self::Flat([x1, y1, x2, y2]) => Some(((x1 + x2) / 2.0, (y1 + y2) / 2.0)),
            Self::Points(points) if points.is_empty() => None,
            Self::Points(points) => {
                let n = points.len() as f64;
                let (sx, sy) = points
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
                Some((sx / n, sy / n))
            }
        }
    }

    /// True when every coordinate lies in [0, 1], i.e. the model already
    /// reported frame-relative coordinates.
    pub fn is_normalized(&self) -> bool {
        let in_unit = |v: &f64| (0.0..=1.0).contains(v);
        match self {
            Self::Flat(coords) => coords.iter().all(in_unit),
            Self::Points(points) => points.iter().flatten().all(in_unit),
        }
    }
}

fn parse_points(items: &[Value]) -> Option<Vec<[f64; 2]>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|p| {
            let pair = p.as_array()?;
            match (pair.first()?.as_f64(), pair.get(1)?.as_f64()) {
                (Some(x), Some(y)) => Some([x, y]),
                _ => None,
            }
        })
        .collect()
}

/// One recognized text region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrFragment {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

impl OcrFragment {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            bounding_box: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }
}

/// One classified object detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub class_name: String,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

/// Pixel dimensions of the analyzed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

/// Everything usable from one inference response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawModelOutput {
    pub detections: Vec<DetectedObject>,
    pub texts: Vec<OcrFragment>,
    /// Distance string the model extracted itself; treated as one more
    /// candidate, never as authoritative.
    pub extracted_distance: Option<String>,
    /// Frame size echoed by the model, when present.
    pub frame: Option<FrameSize>,
}

impl RawModelOutput {
    /// Parse a response body.
    ///
    /// Only a non-object top level is an error. Missing or malformed
    /// sections degrade to empty predictions; malformed entries are skipped.
    pub fn from_value(body: &Value) -> Result<Self, InferenceError> {
        let root = body.as_object().ok_or_else(|| {
            InferenceError::Failed(format!(
                "Unusable response: expected a JSON object, got {}",
                json_kind(body)
            ))
        })?;

        let detections = root
            .get("detections")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_detection).collect())
            .unwrap_or_default();

        let ocr = root.get("ocr");
        let texts = ocr
            .and_then(|o| o.get("texts"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_text).collect())
            .unwrap_or_default();

        let extracted_distance = ocr
            .and_then(|o| o.get("extracted_data"))
            .and_then(|d| d.get("distance"))
            .and_then(|d| match d {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        let frame = root.get("image").and_then(|img| {
            let width = img.get("width")?.as_f64()?;
            let height = img.get("height")?.as_f64()?;
            (width > 0.0 && height > 0.0).then_some(FrameSize { width, height })
        });

        Ok(Self {
            detections,
            texts,
            extracted_distance,
            frame,
        })
    }
}

fn parse_detection(item: &Value) -> Option<DetectedObject> {
    let class_name = item.get("class").and_then(Value::as_str);
    let confidence = item.get("confidence").and_then(Value::as_f64);
    match (class_name, confidence) {
        (Some(class_name), Some(confidence)) if !class_name.trim().is_empty() => {
            Some(DetectedObject {
                class_name: class_name.trim().to_string(),
                confidence: clamp_unit(confidence),
                bounding_box: item.get("bbox").and_then(BoundingBox::from_value),
            })
        }
        _ => {
            tracing::debug!(entry = %item, "Skipping malformed detection");
            None
        }
    }
}

fn parse_text(item: &Value) -> Option<OcrFragment> {
    let text = item.get("text").and_then(Value::as_str);
    let confidence = item.get("confidence").and_then(Value::as_f64);
    match (text, confidence) {
        (Some(text), Some(confidence)) => Some(OcrFragment {
            text: text.to_string(),
            confidence: clamp_unit(confidence),
            bounding_box: item.get("bbox").and_then(BoundingBox::from_value),
        }),
        _ => {
            tracing::debug!(entry = %item, "Skipping malformed OCR text entry");
            None
        }
    }
}

fn clamp_unit(v: f64) -> f32 {
    (v as f32).clamp(0.0, 1.0)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
