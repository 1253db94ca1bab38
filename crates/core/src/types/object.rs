use serde::{Deserialize, Serialize};

// =============================================================================
// Detection Types
// =============================================================================

/// Pixel-space rectangle, serialized as `[top, left, bottom, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub top: i64,
    pub left: i64,
    pub bottom: i64,
    pub right: i64,
}

impl BoundingBox {
    pub fn new(top: i64, left: i64, bottom: i64, right: i64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Integer midpoint as `(x, y)`.
    pub fn center(&self) -> (i64, i64) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// Rectangle relative to the image, each coordinate in 0..=1 for
    /// in-bounds boxes.
    pub fn normalized(&self, width: u32, height: u32) -> NormalizedRect {
        let w = f64::from(width.max(1));
        let h = f64::from(height.max(1));
        NormalizedRect {
            x0: self.left as f64 / w,
            y0: self.top as f64 / h,
            x1: self.right as f64 / w,
            y1: self.bottom as f64 / h,
        }
    }

    /// Clip to `[0, width] x [0, height]` and repair reversed or empty
    /// extents so that `top < bottom` and `left < right` hold.
    pub fn clamped(self, width: u32, height: u32) -> Self {
        let (top, bottom) = repair_span(self.top, self.bottom, i64::from(height));
        let (left, right) = repair_span(self.left, self.right, i64::from(width));
        Self {
            top,
            left,
            bottom,
            right,
        }
    }
}

fn repair_span(a: i64, b: i64, limit: i64) -> (i64, i64) {
    let limit = limit.max(1);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let lo = lo.clamp(0, limit);
    let hi = hi.clamp(0, limit);
    if lo < hi {
        (lo, hi)
    } else if hi < limit {
        (lo, hi + 1)
    } else {
        (lo - 1, hi)
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from(v: [i64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.top, b.left, b.bottom, b.right]
    }
}

/// Box coordinates relative to image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// An entity localized in an image by the detection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Positional index within the detection result.
    pub id: usize,
    /// Free-text label.
    pub label: String,
    /// Pixel-space bounding box.
    pub box_2d: BoundingBox,
    /// Box midpoint as `(x, y)`.
    pub center: (i64, i64),
    /// Detector confidence; 1.0 when the model does not report one.
    pub confidence: f32,
}

impl DetectedObject {
    pub fn new(id: usize, label: impl Into<String>, box_2d: BoundingBox, confidence: f32) -> Self {
        Self {
            id,
            label: label.into(),
            center: box_2d.center(),
            box_2d,
            confidence,
        }
    }
}
