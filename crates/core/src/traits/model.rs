//! Generative model traits.

use async_trait::async_trait;
use image::RgbImage;
use serde_json::Value;

use crate::error::Result;

/// Vision-capable text generation: text + image in, free-form text out.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Generate a text response for `prompt` grounded on `image`.
    async fn generate(&self, prompt: &str, image: &RgbImage) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Image editing: text + image in, provider response carrying an image out.
///
/// The response is returned raw because providers disagree on where the
/// image bytes live; extraction is the caller's concern.
#[async_trait]
pub trait ImageEditModel: Send + Sync {
    /// Request an edited version of `image` following `prompt`.
    async fn edit(&self, prompt: &str, image: &RgbImage) -> Result<Value>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}
