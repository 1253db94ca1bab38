//! Detection stage: locate interactable objects in an image.

use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use serde::Deserialize;

use ripple_core::{
    decoder,
    traits::VisionModel,
    types::{BoundingBox, DetectedObject},
    Error, Result,
};

use crate::prompts::DETECTION_PROMPT;

/// Objects kept from one detection response.
pub const MAX_OBJECTS: usize = 10;

/// Scale of the normalized coordinates the model emits.
const COORDINATE_SCALE: f64 = 1000.0;

/// One entry as emitted by the model, before validation.
#[derive(Debug, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub box_2d: Vec<f64>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Turns an image into a list of detected objects.
pub struct SceneAnalyzer {
    model: Arc<dyn VisionModel>,
}

impl SceneAnalyzer {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// Detect objects in `image`.
    ///
    /// Never fails. Model errors and malformed output are logged and
    /// produce an empty list.
    pub async fn analyze(&self, image: &RgbImage) -> Vec<DetectedObject> {
        let start = Instant::now();
        match self.try_analyze(image).await {
            Ok(objects) => {
                tracing::info!(
                    model = self.model.model_name(),
                    objects = objects.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Scene analysis completed"
                );
                metrics::counter!("ripple_stage_total", "stage" => "analyze", "outcome" => "ok")
                    .increment(1);
                objects
            }
            Err(e) => {
                tracing::warn!(
                    model = self.model.model_name(),
                    error = %e,
                    "Scene analysis failed, returning no objects"
                );
                metrics::counter!("ripple_stage_total", "stage" => "analyze", "outcome" => "degraded")
                    .increment(1);
                metrics::counter!("ripple_degraded_total", "stage" => "analyze").increment(1);
                Vec::new()
            }
        }
    }

    async fn try_analyze(&self, image: &RgbImage) -> Result<Vec<DetectedObject>> {
        let raw = self.model.generate(DETECTION_PROMPT, image).await?;
        let entries: Vec<RawDetection> = decoder::decode_json(&raw)?;
        let (width, height) = image.dimensions();

        if entries.len() > MAX_OBJECTS {
            tracing::debug!(emitted = entries.len(), "Dropping detections beyond limit");
        }

        entries
            .into_iter()
            .take(MAX_OBJECTS)
            .enumerate()
            .map(|(id, entry)| to_object(id, entry, width, height))
            .collect()
    }
}

/// Validate one raw detection and rescale it to pixel space.
pub fn to_object(id: usize, raw: RawDetection, width: u32, height: u32) -> Result<DetectedObject> {
    let label = raw.label.trim();
    if label.is_empty() {
        return Err(Error::decode(format!("detection {} has an empty label", id)));
    }
    let [y0, x0, y1, x1] = <[f64; 4]>::try_from(raw.box_2d.as_slice()).map_err(|_| {
        Error::decode(format!(
            "detection {} box_2d has {} coordinates, expected 4",
            id,
            raw.box_2d.len()
        ))
    })?;
    if [y0, x0, y1, x1].iter().any(|c| !c.is_finite()) {
        return Err(Error::decode(format!("detection {} box_2d is not finite", id)));
    }

    let scaled = BoundingBox::new(
        rescale(y0, height),
        rescale(x0, width),
        rescale(y1, height),
        rescale(x1, width),
    )
    .clamped(width, height);

    let confidence = raw.confidence.map(|c| c.clamp(0.0, 1.0)).unwrap_or(1.0);
    Ok(DetectedObject::new(id, label, scaled, confidence))
}

fn rescale(coord: f64, dim: u32) -> i64 {
    (coord / COORDINATE_SCALE * f64::from(dim)) as i64
}
