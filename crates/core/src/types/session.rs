use image::RgbImage;

use crate::types::DetectedObject;

// =============================================================================
// Session & State Types
// =============================================================================

/// Session used when a request does not name one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Per-interaction state shared across the pipeline stages.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session ID.
    pub id: String,

    /// Current image, owned exclusively by this session.
    pub image: RgbImage,

    /// Objects detected in the most recently uploaded image.
    pub objects: Vec<DetectedObject>,

    /// Creation timestamp.
    pub created_at: i64,

    /// Last updated timestamp.
    pub updated_at: i64,
}

impl Session {
    /// Start a session for a freshly analyzed image.
    pub fn new(id: impl Into<String>, image: RgbImage, objects: Vec<DetectedObject>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: id.into(),
            image,
            objects,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the owned image with an edited one.
    pub fn replace_image(&mut self, image: RgbImage) {
        self.image = image;
        self.updated_at = chrono::Utc::now().timestamp();
    }

    /// Labels of the first `limit` detected objects.
    pub fn nearby_labels(&self, limit: usize) -> Vec<String> {
        self.objects
            .iter()
            .take(limit)
            .map(|o| o.label.clone())
            .collect()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
