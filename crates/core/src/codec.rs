//! Image ⇄ base64 wire conversion.
//!
//! Every image leaving the service is RGB8 PNG, standard base64. Inputs are
//! accepted in several representations and normalized to [`RgbImage`].

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use std::io::Read;

use crate::{Error, Result};

/// An image as handed over by a provider SDK or HTTP payload.
#[derive(Debug, Clone, Default)]
pub struct ProviderImage {
    pub mime_type: Option<String>,
    /// Base64 text, optionally a `data:` URI.
    pub base64: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

/// Source representations accepted by [`encode`] and [`to_rgb`].
pub enum ImageSource {
    Decoded(DynamicImage),
    Rgb(RgbImage),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
    Provider(ProviderImage),
}

impl From<DynamicImage> for ImageSource {
    fn from(img: DynamicImage) -> Self {
        Self::Decoded(img)
    }
}

impl From<RgbImage> for ImageSource {
    fn from(img: RgbImage) -> Self {
        Self::Rgb(img)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<ProviderImage> for ImageSource {
    fn from(img: ProviderImage) -> Self {
        Self::Provider(img)
    }
}

/// Normalize any source to a 3-channel image.
pub fn to_rgb(source: ImageSource) -> Result<RgbImage> {
    match source {
        ImageSource::Rgb(img) => Ok(img),
        ImageSource::Decoded(img) => Ok(img.into_rgb8()),
        ImageSource::Bytes(bytes) => load(&bytes),
        ImageSource::Reader(mut reader) => {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(|e| Error::image(format!("Cannot read image stream: {}", e)))?;
            load(&buf)
        }
        ImageSource::Provider(img) => {
            if let Some(bytes) = img.bytes.filter(|b| !b.is_empty()) {
                load(&bytes)
            } else if let Some(text) = img.base64.filter(|t| !t.trim().is_empty()) {
                decode(&text)
            } else {
                Err(Error::image(format!(
                    "Provider image carries no data (mime type {:?})",
                    img.mime_type
                )))
            }
        }
    }
}

/// Encode as base64 PNG after RGB normalization.
pub fn encode(source: impl Into<ImageSource>) -> Result<String> {
    let rgb = to_rgb(source.into())?;
    encode_rgb(&rgb)
}

/// Encode an already-normalized image without copying it.
pub fn encode_rgb(image: &RgbImage) -> Result<String> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::image(format!("PNG encoding failed: {}", e)))?;
    Ok(STANDARD.encode(png))
}

/// Decode base64 text (bare or `data:...;base64,` URI) into an RGB image.
pub fn decode(text: &str) -> Result<RgbImage> {
    let bytes = decode_base64(text)?;
    load(&bytes)
}

/// Decode raw encoded image bytes (PNG, JPEG, ...) into an RGB image.
pub fn load(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(Error::image("Empty image payload"));
    }
    image::load_from_memory(bytes)
        .map(DynamicImage::into_rgb8)
        .map_err(|e| Error::image(format!("Invalid image: {}", e)))
}

/// Base64 payload bytes, tolerating a data URI prefix, whitespace and the
/// URL-safe alphabet.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let payload = strip_data_uri(text);
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .or_else(|_| URL_SAFE.decode(compact.as_bytes()))
        .map_err(|e| Error::image(format!("Invalid base64 image data: {}", e)))
}

/// Strip an optional `data:<mime>;base64,` prefix.
pub fn strip_data_uri(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.find("base64,") {
        Some(idx) if trimmed.starts_with("data:") => &trimmed[idx + "base64,".len()..],
        _ => trimmed,
    }
}
